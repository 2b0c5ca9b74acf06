//! Property-based tests for nqpv-verifier's Löwner order decider using
//! proptest, checking the algebraic properties spec §7 relies on:
//! reflexivity and transitivity of `⊑`.

use approx::assert_relative_eq;
use ndarray::Array2;
use nqpv_core::error::Pos;
use nqpv_core::operator::{Operator, OperatorProperty};
use nqpv_core::pair::OpVarPair;
use nqpv_core::qpre::Qpre;
use nqpv_core::qvar::{QVarList, Register};
use nqpv_core::settings::Settings;
use nqpv_core::tensor::Tensor;
use num_complex::Complex64;
use nqpv_verifier::order::sqsubseteq;
use proptest::prelude::*;

fn single_qubit_register() -> Register {
    Register::new(vec!["q0".into()]).unwrap()
}

/// A diagonal single-qubit Hermitian predicate `diag(d0, d1)` with both
/// entries in `[0, 1]`, wrapped as a single-pair `Qpre` on `q0`. Every
/// generated value satisfies `HermitianPredicate` numerically (real,
/// symmetric, eigenvalues in `[0, 1]`), so `Qpre::new` never rejects it.
fn diagonal_qpre_strategy(reg: Register) -> impl Strategy<Value = Qpre> {
    (0.0f64..1.0, 0.0f64..1.0).prop_map(move |(d0, d1)| {
        let mat = Array2::from_shape_vec(
            (2, 2),
            vec![
                Complex64::new(d0, 0.0),
                Complex64::new(0.0, 0.0),
                Complex64::new(0.0, 0.0),
                Complex64::new(d1, 0.0),
            ],
        )
        .unwrap();
        let tensor = Tensor::from_matrix(mat, 1).unwrap();
        let qvls = QVarList::new(&reg, vec!["q0".into()]).unwrap();
        let pair = OpVarPair::new(Operator::new(tensor), qvls, OperatorProperty::HermitianPredicate, Pos::synthetic()).unwrap();
        Qpre::new(vec![pair], &Settings::default()).unwrap()
    })
}

proptest! {
    /// Property: every well-formed predicate refines itself, `Q ⊑ Q`.
    #[test]
    fn prop_order_is_reflexive(q in diagonal_qpre_strategy(single_qubit_register())) {
        let reg = single_qubit_register();
        let settings = Settings::default();
        let outcome = sqsubseteq(&q, &q, &reg, &settings).unwrap();
        prop_assert!(outcome.holds, "a predicate must refine itself");
    }

    /// Property: diagonal predicates order the same way their entries do —
    /// `diag(a0, a1) ⊑ diag(b0, b1)` holds iff `a0 <= b0` and `a1 <= b1`
    /// (within the decider's tolerance), which in particular gives
    /// transitivity along any chain of entrywise-ordered diagonals.
    #[test]
    fn prop_diagonal_order_matches_entrywise_order(
        a0 in 0.0f64..1.0, a1 in 0.0f64..1.0,
        b0 in 0.0f64..1.0, b1 in 0.0f64..1.0,
    ) {
        let reg = single_qubit_register();
        let settings = Settings::default();
        let diag = |d0: f64, d1: f64| -> Qpre {
            let mat = Array2::from_shape_vec(
                (2, 2),
                vec![
                    Complex64::new(d0, 0.0), Complex64::new(0.0, 0.0),
                    Complex64::new(0.0, 0.0), Complex64::new(d1, 0.0),
                ],
            )
            .unwrap();
            let tensor = Tensor::from_matrix(mat, 1).unwrap();
            let qvls = QVarList::new(&reg, vec!["q0".into()]).unwrap();
            let pair = OpVarPair::new(Operator::new(tensor), qvls, OperatorProperty::HermitianPredicate, Pos::synthetic()).unwrap();
            Qpre::new(vec![pair], &settings).unwrap()
        };

        let a = diag(a0, a1);
        let b = diag(b0, b1);
        let outcome = sqsubseteq(&a, &b, &reg, &settings).unwrap();
        let entrywise = a0 <= b0 + settings.eps && a1 <= b1 + settings.eps;
        prop_assert_eq!(outcome.holds, entrywise);
    }
}

#[test]
fn identity_refines_itself_within_tight_tolerance() {
    let reg = single_qubit_register();
    let settings = Settings::default();
    let qvls = QVarList::new(&reg, vec!["q0".into()]).unwrap();
    let pair = OpVarPair::new(Operator::new(Tensor::eye(1)), qvls, OperatorProperty::HermitianPredicate, Pos::synthetic()).unwrap();
    let q = Qpre::new(vec![pair], &settings).unwrap();

    let outcome = sqsubseteq(&q, &q, &reg, &settings).unwrap();
    assert!(outcome.holds);
    assert_relative_eq!(settings.eps, 1e-7, epsilon = 1e-12);
}
