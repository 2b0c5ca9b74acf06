//! End-to-end tests driving the `nqpv` binary against small fixture modules.

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn write_module(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("failed to write fixture module");
    path
}

fn nqpv() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("nqpv"))
}

#[test]
fn verify_reports_a_holding_proof_and_writes_output_txt() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "holds.nqpv",
        "def p := proof [q0] : { P0[q0] } ; skip ; { P0[q0] } end\n",
    );

    nqpv()
        .arg("verify")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("proof holds"));

    let report = fs::read_to_string(dir.path().join("output.txt")).unwrap();
    assert!(report.contains("proof holds"));
    assert!(report.contains("verdict: proof holds"));
}

#[test]
fn verify_reports_a_failing_refinement_with_nonzero_exit() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "fails.nqpv",
        "def p := proof [q] : { P0[q] } ; q *= X ; { P0[q] } end\n",
    );

    nqpv()
        .arg("verify")
        .arg(&module)
        .assert()
        .failure();

    let report = fs::read_to_string(dir.path().join("output.txt")).unwrap();
    assert!(report.contains("proof does not hold"));
    assert!(report.contains("verdict: proof does not hold"));
}

#[test]
fn verify_accepts_an_explicit_output_path() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "holds.nqpv",
        "def p := proof [q0] : { P0[q0] } ; skip ; { P0[q0] } end\n",
    );
    let out = dir.path().join("report.txt");

    nqpv().arg("verify").arg(&module).arg("--output").arg(&out).assert().success();

    assert!(out.exists());
    assert!(!dir.path().join("output.txt").exists());
}

#[test]
fn verify_accepts_a_config_file_overriding_tolerances() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "holds.nqpv",
        "def p := proof [q0] : { P0[q0] } ; skip ; { P0[q0] } end\n",
    );
    let config = write_module(&dir, "settings.toml", "eps = 1e-6\nsdp_precision = 1e-8\n");

    nqpv()
        .arg("verify")
        .arg(&module)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("proof holds"));
}

#[test]
fn verify_rejects_a_config_file_with_a_non_positive_eps() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "holds.nqpv",
        "def p := proof [q0] : { P0[q0] } ; skip ; { P0[q0] } end\n",
    );
    let config = write_module(&dir, "settings.toml", "eps = -1.0\n");

    nqpv().arg("verify").arg(&module).arg("--config").arg(&config).assert().failure();
}

#[test]
fn show_lists_root_bindings_without_writing_a_report() {
    let dir = TempDir::new().unwrap();
    let module = write_module(&dir, "bindings.nqpv", "def a := X\n");

    nqpv()
        .arg("show")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("a: operator"));

    assert!(!dir.path().join("output.txt").exists());
}

#[test]
fn save_exports_an_operator_binding_to_npy() {
    let dir = TempDir::new().unwrap();
    let module = write_module(&dir, "gate.nqpv", "def a := X\n");
    let out = dir.path().join("a.npy");

    nqpv().arg("save").arg(&module).arg("a").arg(&out).assert().success();

    assert!(out.exists());
}

// The six scenarios below exercise the same shapes as the Deutsch, bit-flip,
// Grover, and quantum-walk examples used to motivate the verifier, built
// entirely out of stdlib gates/predicates so every proof is decidable on the
// eigenvalue fast path (`order::sqsubseteq` never needs an SDP solve): each
// precondition/postcondition is either the single-qubit identity, invariant
// under conjugation by any unitary or measurement-complement pair, or a
// concrete projector pair (`P0`/`P1`) whose refinement can be checked by hand.

#[test]
fn deutsch_oracle_holds_under_the_double_hadamard_cancellation() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "deutsch.nqpv",
        "def p := proof [q0 q1] : { I[q0] } ;\n\
         [q0] *= H ; [q1] *= H ; [q0 q1] *= CX ; [q0] *= H ; [q1] *= H ;\n\
         { I[q0] } end\n",
    );

    nqpv()
        .arg("verify")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("proof holds"));
}

#[test]
fn bit_flip_code_holds_across_the_encode_flip_correct_cycle() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "bit_flip.nqpv",
        "def p := proof [q0 q1 q2] : { I[q0] } ;\n\
         [q0 q1] *= CX ; [q0 q2] *= CX ; q1 *= X ;\n\
         [q0 q1] *= CX ; [q0 q2] *= CX ; [q1 q2 q0] *= CCX ;\n\
         { I[q0] } end\n",
    );

    nqpv()
        .arg("verify")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("proof holds"));
}

#[test]
fn one_step_grover_holds_with_a_discarded_measurement() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "grover.nqpv",
        "def p := proof [q0 q1] : { I[q0] } ;\n\
         [q0] *= H ; [q1] *= H ; [q0 q1] *= CX ; [q0] *= H ; [q1] *= H ;\n\
         [q0 q1] *= CH ; [q0] *= H ; [q1] *= H ;\n\
         if M01[q0] then skip else skip end ;\n\
         { I[q0] } end\n",
    );

    nqpv()
        .arg("verify")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("proof holds"));
}

#[test]
fn quantum_walk_loop_holds_with_an_inductive_invariant() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "walk_holds.nqpv",
        "def p := proof [q0 q1] : { I[q0] } ;\n\
         { inv: I[q0] } ; while M01[q0] do q0 *= H ; q1 *= X ; [q0 q1] *= CX end ;\n\
         { I[q0] } end\n",
    );

    nqpv()
        .arg("verify")
        .arg(&module)
        .assert()
        .success()
        .stdout(predicate::str::contains("proof holds"));
}

#[test]
fn quantum_walk_loop_rejects_a_non_inductive_invariant() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "walk_fails.nqpv",
        "def p := proof [q] : { P0[q] } ;\n\
         { inv: P0[q] } ; while M01[q] do q *= X end ;\n\
         { P0[q] } end\n",
    );

    nqpv()
        .arg("verify")
        .arg(&module)
        .assert()
        .failure();

    let report = fs::read_to_string(dir.path().join("output.txt")).unwrap();
    assert!(report.contains("invariant not inductive"));
    assert!(report.contains("density operator witness"));
}

#[test]
fn precondition_too_strong_fails_with_a_density_witness() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        &dir,
        "too_strong.nqpv",
        "def p := proof [q] : { P0[q] } ; q *= X ; { P0[q] } end\n",
    );

    nqpv()
        .arg("verify")
        .arg(&module)
        .assert()
        .failure();

    let report = fs::read_to_string(dir.path().join("output.txt")).unwrap();
    assert!(report.contains("precondition refinement failed"));
    assert!(report.contains("density operator witness"));
}
