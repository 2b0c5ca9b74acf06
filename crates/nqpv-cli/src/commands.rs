//! Subcommand handlers: each reads a module, hands it to `nqpv_dsl`, and
//! renders the result. Kept free of `clap` so they stay testable on their
//! own arguments.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nqpv_core::error::Pos;
use nqpv_dsl::{npy, CmdOutcome, CmdReport, EvalReport, Value};
use tracing::{info, warn};

use crate::config;

/// Reads and evaluates a module, returning its report alongside the
/// directory relative `load`/`import`/`save` paths are resolved against.
/// `config_path`, if given, seeds the root environment's tolerances from a
/// persisted TOML settings file before the module's own `setting` commands
/// run.
fn evaluate_module(input: &Path, config_path: Option<&Path>) -> Result<EvalReport> {
    let source = fs::read_to_string(input).with_context(|| format!("failed to read module '{}'", input.display()))?;
    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let settings = config::resolve_settings(config_path)?;
    nqpv_dsl::evaluate_source_with_settings(&source, base_dir, settings).map_err(|e| anyhow::anyhow!("{e}"))
}

fn outcome_line(report: &CmdReport) -> String {
    match &report.outcome {
        CmdOutcome::Bound { detail } => format!("{}: bound ({detail})", report.description),
        CmdOutcome::Shown { detail } => format!("{}: {detail}", report.description),
        CmdOutcome::ProofHolds => format!("{}: proof holds", report.description),
        CmdOutcome::ProofFails { message } => format!("{}: proof does not hold — {message}", report.description),
        CmdOutcome::Saved { path } => format!("{}: saved to '{path}'", report.description),
        CmdOutcome::SettingApplied => format!("{}: setting applied", report.description),
        CmdOutcome::Failed { message } => format!("{}: failed — {message}", report.description),
    }
}

/// Renders the full report: the per-command outcomes in source order
/// followed by the aggregate verdict across every `proof` expression the
/// module defined.
fn render_report(input: &Path, report: &EvalReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("module: {}\n\n", input.display()));

    let mut holds = 0usize;
    let mut fails = 0usize;
    for cmd in &report.reports {
        out.push_str(&outcome_line(cmd));
        out.push('\n');
        match &cmd.outcome {
            CmdOutcome::ProofHolds => holds += 1,
            CmdOutcome::ProofFails { .. } => fails += 1,
            _ => {}
        }
    }

    out.push('\n');
    if holds + fails == 0 {
        out.push_str("verdict: no proof obligations in this module\n");
    } else if fails == 0 {
        out.push_str(&format!("verdict: proof holds ({holds}/{holds} signatures verified)\n"));
    } else {
        out.push_str(&format!(
            "verdict: proof does not hold ({fails}/{} signatures failed; see counterexamples above)\n",
            holds + fails
        ));
    }
    out
}

pub fn handle_verify(input: &Path, output: Option<&Path>, config_path: Option<&Path>, quiet: bool) -> Result<()> {
    info!(module = %input.display(), "verifying module");
    let report = evaluate_module(input, config_path)?;
    let rendered = render_report(input, &report);

    let out_path = output.map(PathBuf::from).unwrap_or_else(|| {
        input.parent().unwrap_or_else(|| Path::new(".")).join("output.txt")
    });
    fs::write(&out_path, &rendered).with_context(|| format!("failed to write report '{}'", out_path.display()))?;

    if !quiet {
        print!("{rendered}");
        println!("report written to: {}", out_path.display());
    }

    let any_failed = report.reports.iter().any(|r| matches!(r.outcome, CmdOutcome::ProofFails { .. } | CmdOutcome::Failed { .. }));
    if any_failed {
        warn!(module = %input.display(), "module has failing commands");
        anyhow::bail!("verification did not hold for every command in '{}'; see {}", input.display(), out_path.display());
    }
    Ok(())
}

pub fn handle_show(input: &Path, path: Option<&str>, config_path: Option<&Path>, quiet: bool) -> Result<()> {
    let report = evaluate_module(input, config_path)?;
    let segments: Vec<String> = path.map(|p| p.split('.').map(str::to_string).collect()).unwrap_or_default();

    let (label, bindings) = if segments.is_empty() {
        (report.root.label().to_string(), report.root.describe_local_bindings())
    } else {
        let value = report
            .root
            .resolve(&segments, Pos::synthetic())
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        match value {
            Value::Module(env) => (env.label().to_string(), env.describe_local_bindings()),
            other => anyhow::bail!("'{}' is not a module; it is a {}", path.unwrap_or(""), describe_kind(&other)),
        }
    };

    if !quiet {
        println!("scope '{label}' ({} binding(s)):", bindings.len());
        for (name, detail) in &bindings {
            println!("  {name}: {detail}");
        }
    }
    Ok(())
}

fn describe_kind(value: &Value) -> &'static str {
    match value {
        Value::Operator(_) => "operator",
        Value::Program(_) => "program",
        Value::Proof(_) => "proof",
        Value::Signature { .. } => "assumed signature",
        Value::Module(_) => "module",
    }
}

pub fn handle_save(input: &Path, var: &str, destination: &Path, config_path: Option<&Path>, quiet: bool) -> Result<()> {
    let report = evaluate_module(input, config_path)?;
    let segments: Vec<String> = var.split('.').map(str::to_string).collect();
    let value = report.root.resolve(&segments, Pos::synthetic()).map_err(|e| anyhow::anyhow!("{e}"))?;
    let op = value.as_operator().ok_or_else(|| anyhow::anyhow!("'{var}' is a {}, not an operator", describe_kind(&value)))?;

    npy::save(destination, op.tensor(), Pos::synthetic()).map_err(|e| anyhow::anyhow!("{e}"))?;
    if !quiet {
        println!("saved '{var}' to {}", destination.display());
    }
    Ok(())
}
