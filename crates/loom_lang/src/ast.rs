//! Parsed syntax tree.
//!
//! The parser does not know about special forms; every compound is an
//! S-expression until evaluation decides what its head means. `Module` is
//! introduced by import expansion, never by the parser.

use loom_core::{Position, format_float, quote};
use std::fmt;

/// A parsed form
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// String literal
    Str(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
    /// Identifier
    Ident(String),
    /// `( ... )`
    Sexp {
        /// Head followed by operands
        items: Vec<Expr>,
        /// Line of the opening parenthesis
        pos: Position,
    },
    /// An imported module's resolved body
    Module {
        /// Module name (last path segment of the import)
        name: String,
        /// Import-expanded body
        body: Vec<Expr>,
        /// Position of the `import` form
        pos: Position,
    },
}

impl Expr {
    /// Build an S-expression without a source position
    #[must_use]
    pub fn sexp(items: Vec<Expr>) -> Self {
        Self::Sexp {
            items,
            pos: Position::default(),
        }
    }

    /// Position of a compound form
    #[must_use]
    pub fn pos(&self) -> Option<&Position> {
        match self {
            Self::Sexp { pos, .. } | Self::Module { pos, .. } => Some(pos),
            _ => None,
        }
    }

    /// Identifier name, if this is one
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Ident(name) => Some(name),
            _ => None,
        }
    }
}

pub(crate) fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(&quote(s)),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Ident(name) => f.write_str(name),
            Self::Sexp { items, .. } => {
                f.write_str("(")?;
                write_joined(f, items)?;
                f.write_str(")")
            }
            Self::Module { name, body, .. } => {
                write!(f, "(module {}", quote(name))?;
                for expr in body {
                    write!(f, " {expr}")?;
                }
                f.write_str(")")
            }
        }
    }
}
