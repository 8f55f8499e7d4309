//! Error taxonomy for the specification language.
//!
//! Every failure carries a [`Diagnostic`]: the innermost message plus the
//! position of the nearest enclosing form that had one. Any error rejects
//! the whole program.

use loom_core::{CoreError, Diagnostic, Position};
use loom_graph::InvariantError;
use thiserror::Error;

/// Evaluation result type
pub type EvalResult<T> = Result<T, EvalError>;

/// Lexical or grammatical error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub Diagnostic);

impl ParseError {
    /// Create a parse error at a position
    #[must_use]
    pub fn at(message: impl Into<String>, pos: &Position) -> Self {
        Self(Diagnostic::new(message).at(pos))
    }
}

/// Runtime error raised while evaluating a form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EvalError(pub Diagnostic);

impl EvalError {
    /// Create an unpositioned error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(Diagnostic::new(message))
    }

    /// Attach a position unless a nearer form already did
    #[must_use]
    pub fn at(self, pos: &Position) -> Self {
        Self(self.0.at(pos))
    }

    /// The innermost message, without position
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0.message
    }
}

impl From<CoreError> for EvalError {
    fn from(err: CoreError) -> Self {
        Self::new(err.to_string())
    }
}

/// Import expansion error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// A module failed to parse
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A module imports itself, directly or not
    #[error("{0}")]
    Cycle(Diagnostic),

    /// Module source could not be obtained
    #[error("{0}")]
    Unreadable(Diagnostic),

    /// `import` after the first non-import form
    #[error("{0}")]
    Misplaced(Diagnostic),

    /// `import` without a single module-name string
    #[error("{0}")]
    Malformed(Diagnostic),
}

/// Any error that rejects a specification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoomError {
    /// Parse failure
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Import failure
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Evaluation failure
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// An invariant did not hold
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}
