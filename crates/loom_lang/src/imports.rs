//! Import expansion.
//!
//! `(import "name")` forms must come before anything else in a file. Each
//! one is replaced by a [`Expr::Module`] holding the imported file's own
//! import-expanded body, named after the last segment of the import path.

use crate::ast::Expr;
use crate::error::ImportError;
use crate::parser::parse;
use indexmap::IndexMap;
use loom_core::{Diagnostic, Position};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Extension of specification files
pub const SPEC_EXTENSION: &str = "spec";

/// Text of a module and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    /// Path used in diagnostics
    pub path: String,
    /// Source text
    pub text: String,
}

/// Maps an import path to module source
pub trait ModuleResolver {
    /// Load the module named by an import path such as `github.com/org/repo/lib`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the module cannot be found or read.
    fn resolve(&self, name: &str) -> io::Result<ModuleSource>;
}

/// Resolves imports against directories on disk
#[derive(Debug, Clone, Default)]
pub struct FsModuleResolver {
    search_paths: Vec<PathBuf>,
    allow_remote: bool,
}

impl FsModuleResolver {
    /// Create a resolver over the given search paths, tried in order
    #[must_use]
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            allow_remote: false,
        }
    }

    /// Allow cloning missing modules with `git`
    #[must_use]
    pub fn with_remote(mut self, allow_remote: bool) -> Self {
        self.allow_remote = allow_remote;
        self
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(format!("{name}.{SPEC_EXTENSION}")))
            .find(|path| path.is_file())
    }

    /// Clone the repository holding `name` into the first search path.
    ///
    /// The repository is the first three segments of the import path.
    fn fetch(&self, name: &str) -> io::Result<()> {
        let segments: Vec<&str> = name.split('/').collect();
        if segments.len() < 3 {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{name} does not name a remote repository"),
            ));
        }
        let repo = segments[..3].join("/");
        let root = self
            .search_paths
            .first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no search path"))?;
        let dest = root.join(&repo);
        if dest.exists() {
            return Ok(());
        }

        tracing::info!(repo = %repo, dest = %dest.display(), "cloning module repository");
        let status = Command::new("git")
            .arg("clone")
            .arg(format!("https://{repo}"))
            .arg(&dest)
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("git clone {repo} failed: {status}")))
        }
    }
}

fn read(path: &Path) -> io::Result<ModuleSource> {
    Ok(ModuleSource {
        path: path.display().to_string(),
        text: std::fs::read_to_string(path)?,
    })
}

impl ModuleResolver for FsModuleResolver {
    fn resolve(&self, name: &str) -> io::Result<ModuleSource> {
        if let Some(path) = self.find(name) {
            return read(&path);
        }
        if self.allow_remote {
            if let Err(err) = self.fetch(name) {
                tracing::warn!(module = name, error = %err, "failed to fetch module");
            }
            if let Some(path) = self.find(name) {
                return read(&path);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{name}.{SPEC_EXTENSION} not found"),
        ))
    }
}

/// In-memory modules, keyed by import path
#[derive(Debug, Clone, Default)]
pub struct MemoryModuleResolver {
    modules: IndexMap<String, String>,
}

impl MemoryModuleResolver {
    /// Create an empty resolver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module
    #[must_use]
    pub fn with_module(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.modules.insert(name.into(), text.into());
        self
    }
}

impl ModuleResolver for MemoryModuleResolver {
    fn resolve(&self, name: &str) -> io::Result<ModuleSource> {
        self.modules
            .get(name)
            .map(|text| ModuleSource {
                path: format!("{name}.{SPEC_EXTENSION}"),
                text: text.clone(),
            })
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }
}

enum Import<'a> {
    Path(&'a str, &'a Position),
    Malformed(&'a Expr),
    Not,
}

fn as_import(expr: &Expr) -> Import<'_> {
    let Expr::Sexp { items, pos } = expr else {
        return Import::Not;
    };
    match items.as_slice() {
        [Expr::Ident(head), Expr::Str(path)] if head == "import" => Import::Path(path, pos),
        [Expr::Ident(head), ..] if head == "import" => Import::Malformed(expr),
        _ => Import::Not,
    }
}

/// Replace leading import forms with the modules they name.
///
/// # Errors
///
/// Fails on an import after the first ordinary form, an import cycle, an
/// unreadable module, or a module that does not parse.
pub fn resolve_imports(
    forms: Vec<Expr>,
    resolver: &dyn ModuleResolver,
) -> Result<Vec<Expr>, ImportError> {
    let mut stack = Vec::new();
    expand(forms, resolver, &mut stack)
}

fn expand(
    forms: Vec<Expr>,
    resolver: &dyn ModuleResolver,
    stack: &mut Vec<String>,
) -> Result<Vec<Expr>, ImportError> {
    let mut out = Vec::with_capacity(forms.len());
    let mut leading = true;

    for form in forms {
        let (path, pos) = match as_import(&form) {
            Import::Not => {
                leading = false;
                out.push(form);
                continue;
            }
            Import::Malformed(expr) => {
                let diag = Diagnostic::new(format!("import requires a module name: {expr}"));
                return Err(ImportError::Malformed(at(diag, expr.pos())));
            }
            Import::Path(path, pos) => (path.to_string(), pos.clone()),
        };

        if !leading {
            let diag = Diagnostic::new("import must be begin the module").at(&pos);
            return Err(ImportError::Misplaced(diag));
        }
        if stack.contains(&path) {
            stack.push(path);
            let diag = Diagnostic::new(format!("import cycle: [{}]", stack.join(" "))).at(&pos);
            return Err(ImportError::Cycle(diag));
        }

        let source = resolver.resolve(&path).map_err(|err| {
            tracing::debug!(module = %path, error = %err, "import failed");
            ImportError::Unreadable(
                Diagnostic::new(format!("unable to open import {path}")).at(&pos),
            )
        })?;
        let parsed = parse(&source.text, Some(&source.path))?;

        stack.push(path.clone());
        let body = expand(parsed, resolver, stack)?;
        stack.pop();

        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        tracing::debug!(module = %name, path = %source.path, "imported module");
        out.push(Expr::Module { name, body, pos });
    }
    Ok(out)
}

fn at(diag: Diagnostic, pos: Option<&Position>) -> Diagnostic {
    match pos {
        Some(pos) => diag.at(pos),
        None => diag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoomError;

    fn expand_src(src: &str, resolver: &dyn ModuleResolver) -> Result<Vec<Expr>, ImportError> {
        resolve_imports(parse(src, None).map_err(ImportError::from)?, resolver)
    }

    #[test]
    fn test_import_becomes_module() {
        let resolver = MemoryModuleResolver::new()
            .with_module("github.com/org/repo/math", "(define Square (lambda (x) (* x x)))");
        let forms = expand_src("(import \"github.com/org/repo/math\")\n(math.Square 2)", &resolver)
            .unwrap();
        assert_eq!(forms.len(), 2);
        match &forms[0] {
            Expr::Module { name, body, pos } => {
                assert_eq!(name, "math");
                assert_eq!(body.len(), 1);
                assert_eq!(pos.line, 1);
            }
            other => panic!("expected module, got {other}"),
        }
    }

    #[test]
    fn test_nested_imports() {
        let resolver = MemoryModuleResolver::new()
            .with_module("a", "(import \"b\")\n(define A b.B)")
            .with_module("b", "(define B 1)");
        let forms = expand_src("(import \"a\")", &resolver).unwrap();
        let Expr::Module { body, .. } = &forms[0] else {
            panic!("expected module");
        };
        assert!(matches!(&body[0], Expr::Module { name, .. } if name == "b"));
    }

    #[test]
    fn test_import_cycle() {
        let resolver = MemoryModuleResolver::new()
            .with_module("a", "(import \"b\")")
            .with_module("b", "(import \"a\")");
        let err = expand_src("(import \"a\")", &resolver).unwrap_err();
        assert_eq!(err.to_string(), "b.spec:1: import cycle: [a b a]");
    }

    #[test]
    fn test_missing_import() {
        let err = expand_src("(import \"nope\")", &MemoryModuleResolver::new()).unwrap_err();
        assert_eq!(err.to_string(), "1: unable to open import nope");
    }

    #[test]
    fn test_import_must_lead() {
        let resolver = MemoryModuleResolver::new().with_module("a", "");
        let err = expand_src("(docker \"x\")\n(import \"a\")", &resolver).unwrap_err();
        assert_eq!(err.to_string(), "2: import must be begin the module");
        assert!(matches!(err, ImportError::Misplaced(_)));
    }

    #[test]
    fn test_malformed_import() {
        let err = expand_src("(import 1)", &MemoryModuleResolver::new()).unwrap_err();
        assert_eq!(err.to_string(), "1: import requires a module name: (import 1)");
    }

    #[test]
    fn test_parse_error_names_module_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.spec"), "(define x").unwrap();
        let resolver = FsModuleResolver::new(vec![dir.path().to_path_buf()]);
        let err = expand_src("(import \"bad\")", &resolver).unwrap_err();
        let expected = format!(
            "{}:1: unbalanced Parenthesis",
            dir.path().join("bad.spec").display()
        );
        assert_eq!(LoomError::from(err).to_string(), expected);
    }

    #[test]
    fn test_fs_resolver_search_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("lib.spec"), "(define X 2)").unwrap();
        let resolver = FsModuleResolver::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let source = resolver.resolve("lib").unwrap();
        assert_eq!(source.text, "(define X 2)");

        std::fs::write(first.path().join("lib.spec"), "(define X 1)").unwrap();
        assert_eq!(resolver.resolve("lib").unwrap().text, "(define X 1)");
        assert!(resolver.resolve("missing").is_err());
    }
}
