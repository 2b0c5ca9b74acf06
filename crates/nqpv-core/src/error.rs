//! Shared error type and source-position bookkeeping.

use std::fmt;

use thiserror::Error;

/// A line/column position in a parsed `.nqpv` module, threaded through the
/// lexer, parser and AST so that downstream errors can point back at source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The synthetic position used for operators built in memory rather
    /// than parsed from source (e.g. WLP temporaries, injected library gates).
    pub const fn synthetic() -> Self {
        Self { line: 0, column: 0 }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::synthetic() {
            write!(f, "<generated>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// The verifier's shared error type, covering the structural, property,
/// proof and I/O failure kinds the verifier can raise. Numeric ("cannot
/// conclude") outcomes are not represented here: they are a value the order
/// decider returns, not a Rust error, since a negative SDP result is an
/// inconclusive answer rather than a defect.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Shape/arity mismatch: non-dyadic dimension, wrong rank, or a pair
    /// whose qubit count disagrees with its operator's rank.
    #[error("{pos}: shape mismatch: {message}")]
    ShapeMismatch { message: String, pos: Pos },

    /// A qubit-variable list names a qubit outside the register, or repeats
    /// a name.
    #[error("{pos}: invalid qubit-variable list: {message}")]
    InvalidQvl { message: String, pos: Pos },

    /// An identifier was looked up but is not bound in any enclosing scope.
    #[error("{pos}: undeclared identifier '{name}'")]
    UndeclaredIdentifier { name: String, pos: Pos },

    /// An operator was required to have a property (unitary, Hermitian
    /// predicate, measurement) it does not have.
    #[error("{pos}: '{name}' does not satisfy the required property '{property}'")]
    PropertyViolation {
        name: String,
        property: &'static str,
        pos: Pos,
    },

    /// A loop invariant failed the inductiveness check.
    #[error("{pos}: invariant not inductive: {message}")]
    InvariantNotInductive { message: String, pos: Pos },

    /// A claimed precondition is not refined by the computed weakest
    /// liberal precondition.
    #[error("{pos}: precondition refinement failed: {message}")]
    RefinementFailed { message: String, pos: Pos },

    /// (Union) subproofs disagree on the program they purport to prove, or
    /// their combined postcondition does not entail the target.
    #[error("{pos}: union proof mismatch: {message}")]
    UnionMismatch { message: String, pos: Pos },

    /// An `assert` hint's Qpre is not entailed by the downstream postcondition.
    #[error("{pos}: assertion not entailed by postcondition: {message}")]
    AssertionFailed { message: String, pos: Pos },
}

impl CoreError {
    pub fn pos(&self) -> Pos {
        match self {
            CoreError::ShapeMismatch { pos, .. }
            | CoreError::InvalidQvl { pos, .. }
            | CoreError::UndeclaredIdentifier { pos, .. }
            | CoreError::PropertyViolation { pos, .. }
            | CoreError::InvariantNotInductive { pos, .. }
            | CoreError::RefinementFailed { pos, .. }
            | CoreError::UnionMismatch { pos, .. }
            | CoreError::AssertionFailed { pos, .. } => *pos,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
