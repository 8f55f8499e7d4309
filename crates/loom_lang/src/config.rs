//! Compiler configuration.

use crate::imports::FsModuleResolver;
use crate::keys::{DirKeyResolver, KeyResolver, NoKeys};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding colon-separated module search paths
pub const PATH_ENV: &str = "LOOM_PATH";

/// Search path used when neither the config nor the environment names one
#[must_use]
pub fn default_search_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".loom"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// How to compile a specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Directories searched for imported modules, in order
    pub search_paths: Vec<PathBuf>,
    /// Clone missing modules with `git`
    pub allow_remote: bool,
    /// Directory of `<user>.keys` files for `githubKey`
    pub keys_dir: Option<PathBuf>,
    /// File name used in diagnostics for the root source
    pub filename: Option<String>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            search_paths: vec![default_search_path()],
            allow_remote: false,
            keys_dir: None,
            filename: None,
        }
    }
}

impl CompileConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with `LOOM_PATH` applied
    #[must_use]
    pub fn from_env() -> Self {
        Self::new().with_env()
    }

    /// Replace the search paths with `LOOM_PATH`, when it is set
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if let Some(paths) = std::env::var_os(PATH_ENV) {
            let paths: Vec<PathBuf> = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !paths.is_empty() {
                tracing::debug!(?paths, "using {PATH_ENV}");
                self.search_paths = paths;
            }
        }
        self
    }

    /// Parse a JSON config; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the text is not a valid config.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Set the search paths
    #[must_use]
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Allow or forbid remote module fetches
    #[must_use]
    pub fn with_remote(mut self, allow_remote: bool) -> Self {
        self.allow_remote = allow_remote;
        self
    }

    /// Set the keys directory
    #[must_use]
    pub fn with_keys_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.keys_dir = Some(dir.into());
        self
    }

    /// Set the diagnostic file name
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Module resolver this config describes
    #[must_use]
    pub fn module_resolver(&self) -> FsModuleResolver {
        FsModuleResolver::new(self.search_paths.clone()).with_remote(self.allow_remote)
    }

    /// Key resolver this config describes
    #[must_use]
    pub fn key_resolver(&self) -> Box<dyn KeyResolver> {
        match &self.keys_dir {
            Some(dir) => Box::new(DirKeyResolver::new(dir.clone())),
            None => Box::new(NoKeys),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_partial() {
        let config = CompileConfig::from_json(r#"{"allow_remote": true, "keys_dir": "/k"}"#)
            .unwrap();
        assert!(config.allow_remote);
        assert_eq!(config.keys_dir, Some(PathBuf::from("/k")));
        assert_eq!(config.search_paths, vec![default_search_path()]);
        assert!(CompileConfig::from_json("{\"allow_remote\": 3}").is_err());
    }

    #[test]
    fn test_builders() {
        let config = CompileConfig::new()
            .with_search_paths(vec!["a".into(), "b".into()])
            .with_remote(true)
            .with_filename("main.spec");
        assert_eq!(config.search_paths.len(), 2);
        assert!(config.allow_remote);
        assert_eq!(config.filename.as_deref(), Some("main.spec"));
        assert!(config.key_resolver().keys("anyone").is_err());
    }
}
