//! nqpv-dsl: the surface `.nqpv` language — lexer, parser, standard
//! operator library, `.npy` operator persistence, and the module evaluator
//! that lowers a parsed module into `nqpv-core` values and drives
//! verification.

use nqpv_core::error::{CoreError, Pos};
use thiserror::Error;

mod ast;
mod eval;
mod lexer;
pub mod npy;
mod parser;
mod stdlib;

pub use ast::*;
pub use eval::{evaluate_source, evaluate_source_with_settings, CmdOutcome, CmdReport, Environment, EvalReport, Value};
pub use lexer::{tokenize, LexError, Token, TokenKind};
pub use parser::{parse_module, ParseError};

/// The union of everything that can go wrong evaluating a `.nqpv` module:
/// lexing, parsing, the algebraic kernel, operator file I/O, and module
/// evaluation proper (unresolved calls, arity mismatches, non-module dotted
/// access).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DslError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{pos}: '{path}': {message}")]
    Io { path: String, message: String, pos: Pos },

    #[error("{pos}: {message}")]
    Eval { message: String, pos: Pos },
}

pub type DslResult<T> = Result<T, DslError>;
