//! Core error types for LOOM.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while constructing compiled records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Port range outside `0..=65535` or with `min > max`
    InvalidPortRange {
        /// Lower bound as written
        min: i64,
        /// Upper bound as written
        max: i64,
    },

    /// Invariant form keyword not recognised
    UnknownInvariantForm {
        /// Keyword as written
        form: String,
    },

    /// Invariant line or form with the wrong shape
    MalformedInvariant {
        /// Offending text
        text: String,
        /// What was wrong with it
        reason: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPortRange { min, max } => {
                write!(f, "invalid port range: [{min}, {max}]")
            }
            Self::UnknownInvariantForm { form } => {
                write!(f, "unknown invariant form: {form}")
            }
            Self::MalformedInvariant { text, reason } => {
                write!(f, "malformed invariant {text}: {reason}")
            }
        }
    }
}

impl std::error::Error for CoreError {}
