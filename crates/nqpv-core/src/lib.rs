//! nqpv-core: the algebraic kernel and symbolic data model for the NQPV
//! verifier — a static checker for a small nondeterministic quantum
//! while-language.
//!
//! This crate has no I/O. It defines:
//!
//! - [`tensor`]: dense complex tensors shaped `(2,)*k` and the operations on
//!   them (dagger, contraction, cylindrical extension, initialization).
//! - [`qvar`]: qubit registers and qubit-variable lists (QVLs).
//! - [`operator`]: the property-checked [`operator::Operator`] wrapper and
//!   the content-addressed [`operator::OperatorStore`].
//! - [`pair`]: operator/variable pairs (OVPs) and their combinators.
//! - [`qpre`]: quantum predicates (`Qpre`), finite sets of Hermitian-predicate
//!   OVPs under automatic cylindrical extension.
//! - [`scope`]: the inductive, tree-structured symbol table used during
//!   evaluation and WLP computation.
//! - [`program`] / [`proof`]: the program and proof-hint ASTs and the
//!   annotated proof-statement output.
//! - [`settings`]: the verifier's tunable tolerances and flags.
//! - [`error`]: the shared error type for structural/property failures.

pub mod error;
pub mod operator;
pub mod pair;
pub mod proof;
pub mod program;
pub mod qpre;
pub mod qvar;
pub mod scope;
pub mod settings;
pub mod tensor;

pub use error::CoreError;
pub use operator::{Operator, OperatorId, OperatorProperty, OperatorStore};
pub use pair::OpVarPair;
pub use program::Program;
pub use proof::{ProofHint, ProofStatement};
pub use qpre::Qpre;
pub use qvar::{QVarList, Register};
pub use scope::Scope;
pub use settings::Settings;
pub use tensor::Tensor;
