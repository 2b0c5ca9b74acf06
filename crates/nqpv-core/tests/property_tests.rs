//! Property-based tests for nqpv-core's tensor algebra using proptest.
//!
//! These tests verify algebraic properties that the per-function unit tests
//! beside `tensor.rs` don't exercise across many random inputs:
//! - Cylindrical extension and `M·H·M†` contraction commute on disjoint axes
//! - `dagger` is an involution on Hermitian predicates
//! - Extending to the same register size is a no-op permutation

use ndarray::Array2;
use nqpv_core::tensor::Tensor;
use num_complex::Complex64;
use proptest::prelude::*;

/// A diagonal single-qubit Hermitian predicate `diag(d0, d1)` with both
/// entries in `[0, 1]` — trivially Hermitian and trivially within `[0, I]`,
/// so every generated value is a valid `HermitianPredicate` without needing
/// a numeric property check in the test itself.
fn diagonal_predicate_strategy() -> impl Strategy<Value = Tensor> {
    (0.0f64..1.0, 0.0f64..1.0).prop_map(|(d0, d1)| {
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
        Tensor::from_matrix(mat, 1).unwrap()
    })
}

proptest! {
    /// Property: extending a 1-qubit predicate to a 2-qubit register and then
    /// contracting another diagonal operator into the extended position
    /// gives the same tensor as contracting first and extending second, since
    /// the two operations act on disjoint qubit positions.
    #[test]
    fn prop_extend_then_contract_matches_contract_then_extend(
        h in diagonal_predicate_strategy(),
        m in diagonal_predicate_strategy(),
    ) {
        let extended_first = h
            .hermitian_extend(2, &[0])
            .unwrap()
            .hermitian_contract(&[0], &m)
            .unwrap();
        let contracted_first = h
            .hermitian_contract(&[0], &m)
            .unwrap()
            .hermitian_extend(2, &[0])
            .unwrap();

        prop_assert!(extended_first.approx_eq(&contracted_first, 1e-9));
    }

    /// Property: `dagger` is an involution — `dagger(dagger(H)) == H` for any
    /// Hermitian predicate (indeed for any square operator tensor).
    #[test]
    fn prop_dagger_is_an_involution(h in diagonal_predicate_strategy()) {
        let twice = h.dagger().unwrap().dagger().unwrap();
        prop_assert!(twice.approx_eq(&h, 1e-12));
    }

    /// Property: extending a predicate to its own qubit count only permutes
    /// axes into place and never changes the tensor's entries.
    #[test]
    fn prop_extend_to_same_size_is_a_no_op(h in diagonal_predicate_strategy()) {
        let same = h.hermitian_extend(1, &[0]).unwrap();
        prop_assert!(same.approx_eq(&h, 1e-12));
    }
}
