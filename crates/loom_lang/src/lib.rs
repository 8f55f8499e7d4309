//! LOOM Lang
//!
//! The specification language: a small Lisp with closures and modules
//! whose side effects describe infrastructure. This crate parses source,
//! expands imports, evaluates programs into a session of containers,
//! machines, labels, connections, placement rules and invariants, and
//! compiles the result into a packed communication graph.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod imports;
pub mod keys;
pub mod lexer;
pub mod parser;
pub mod session;
pub mod stitch;
pub mod value;

#[cfg(test)]
mod testing;

pub use ast::Expr;
pub use config::{CompileConfig, PATH_ENV};
pub use error::{EvalError, EvalResult, ImportError, LoomError, ParseError};
pub use eval::Interpreter;
pub use imports::{FsModuleResolver, MemoryModuleResolver, ModuleResolver, ModuleSource, resolve_imports};
pub use keys::{DirKeyResolver, KeyError, KeyResolver, NoKeys, StaticKeyResolver, resolve_keys};
pub use parser::parse;
pub use session::{Atom, Session};
pub use stitch::{Records, Stitch};
pub use value::Value;
