//! Source positions and positioned diagnostics.
//!
//! Every compound form remembers the line it opened on (and, for module
//! bodies, the file it came from). Errors travel outward as a
//! [`Diagnostic`]; the first enclosing form with a real position stamps
//! it, and outer forms leave it alone.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location of a form in specification source
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Source file, when the text came from one
    pub file: Option<String>,
    /// One-based line; zero means "no position" (generated forms)
    pub line: usize,
}

impl Position {
    /// Create a position on a line with no file
    #[must_use]
    pub const fn line(line: usize) -> Self {
        Self { file: None, line }
    }

    /// Attach a file name
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Whether this position points at real source
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) if !file.is_empty() => write!(f, "{file}:{}", self.line),
            _ => write!(f, "{}", self.line),
        }
    }
}

/// An error message with an optional source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where it happened, if known
    pub pos: Option<Position>,
    /// Innermost message, verbatim
    pub message: String,
}

impl Diagnostic {
    /// Create an unpositioned diagnostic
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            pos: None,
            message: message.into(),
        }
    }

    /// Stamp a position unless one is already attached.
    ///
    /// Unknown (zero-line) positions are ignored so that generated forms
    /// defer to their nearest positioned ancestor.
    #[must_use]
    pub fn at(mut self, pos: &Position) -> Self {
        if self.pos.is_none() && pos.is_known() {
            self.pos = Some(pos.clone());
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "{pos}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}
