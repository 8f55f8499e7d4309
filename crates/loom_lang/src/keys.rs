//! SSH key lookup for `githubKey` machine keys.
//!
//! Lookups are memoized per username for the life of the process.
//! A failed lookup is logged and contributes no keys.

use loom_core::{Machine, MachineKey};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// Key lookup error
#[derive(Debug, Error)]
pub enum KeyError {
    /// No keys are published for the user
    #[error("no keys found for {user}")]
    NotFound {
        /// Username
        user: String,
    },

    /// The key source could not be read
    #[error("failed to read keys for {user}: {source}")]
    Io {
        /// Username
        user: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Maps a username to its public keys
pub trait KeyResolver {
    /// Public keys for `user`
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the keys cannot be obtained.
    fn keys(&self, user: &str) -> Result<Vec<String>, KeyError>;
}

/// Resolver that knows no users
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeys;

impl KeyResolver for NoKeys {
    fn keys(&self, user: &str) -> Result<Vec<String>, KeyError> {
        Err(KeyError::NotFound {
            user: user.to_string(),
        })
    }
}

/// Fixed username-to-keys table
#[derive(Debug, Clone, Default)]
pub struct StaticKeyResolver {
    keys: HashMap<String, Vec<String>>,
}

impl StaticKeyResolver {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user's keys
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>, keys: Vec<String>) -> Self {
        self.keys.insert(user.into(), keys);
        self
    }
}

impl KeyResolver for StaticKeyResolver {
    fn keys(&self, user: &str) -> Result<Vec<String>, KeyError> {
        self.keys.get(user).cloned().ok_or_else(|| KeyError::NotFound {
            user: user.to_string(),
        })
    }
}

/// Reads `<dir>/<user>.keys`, one key per line
#[derive(Debug, Clone)]
pub struct DirKeyResolver {
    dir: PathBuf,
}

impl DirKeyResolver {
    /// Create a resolver over a directory
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl KeyResolver for DirKeyResolver {
    fn keys(&self, user: &str) -> Result<Vec<String>, KeyError> {
        let path = self.dir.join(format!("{user}.keys"));
        let text = std::fs::read_to_string(&path).map_err(|source| KeyError::Io {
            user: user.to_string(),
            source,
        })?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }
}

static CACHE: Lazy<Mutex<HashMap<String, Vec<String>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn github_keys(user: &str, resolver: &dyn KeyResolver) -> Vec<String> {
    if let Ok(cache) = CACHE.lock() {
        if let Some(keys) = cache.get(user) {
            return keys.clone();
        }
    }
    match resolver.keys(user) {
        Ok(keys) => {
            if let Ok(mut cache) = CACHE.lock() {
                cache.insert(user.to_string(), keys.clone());
            }
            keys
        }
        Err(err) => {
            tracing::warn!(user, error = %err, "failed to get github keys");
            Vec::new()
        }
    }
}

/// Expand a machine's key sources into public keys, in declaration order
#[must_use]
pub fn resolve_keys(machine: &Machine, resolver: &dyn KeyResolver) -> Vec<String> {
    machine
        .keys
        .iter()
        .flat_map(|key| match key {
            MachineKey::Plain(key) => vec![key.clone()],
            MachineKey::Github(user) => github_keys(user, resolver),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(keys: Vec<MachineKey>) -> Machine {
        Machine {
            keys,
            ..Machine::default()
        }
    }

    #[test]
    fn test_plain_and_github_keys() {
        let resolver = StaticKeyResolver::new()
            .with_user("keys-test-alice", vec!["ssh-ed25519 A".into(), "ssh-rsa B".into()]);
        let m = machine(vec![
            MachineKey::Plain("literal".into()),
            MachineKey::Github("keys-test-alice".into()),
        ]);
        assert_eq!(
            resolve_keys(&m, &resolver),
            vec!["literal", "ssh-ed25519 A", "ssh-rsa B"]
        );
    }

    #[test]
    fn test_lookup_is_memoized() {
        let resolver = StaticKeyResolver::new().with_user("keys-test-bob", vec!["k1".into()]);
        let m = machine(vec![MachineKey::Github("keys-test-bob".into())]);
        assert_eq!(resolve_keys(&m, &resolver), vec!["k1"]);
        assert_eq!(resolve_keys(&m, &NoKeys), vec!["k1"]);
    }

    #[test]
    fn test_failure_contributes_nothing() {
        let m = machine(vec![
            MachineKey::Github("keys-test-nobody".into()),
            MachineKey::Plain("p".into()),
        ]);
        assert_eq!(resolve_keys(&m, &NoKeys), vec!["p"]);
    }

    #[test]
    fn test_dir_resolver() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("carol.keys"), "# comment\nssh-rsa X\n\nssh-rsa Y\n")
            .unwrap();
        let resolver = DirKeyResolver::new(dir.path());
        assert_eq!(resolver.keys("carol").unwrap(), vec!["ssh-rsa X", "ssh-rsa Y"]);
        assert!(matches!(resolver.keys("dave"), Err(KeyError::Io { .. })));
    }
}
