//! Stable handles into the per-pass arenas.
//!
//! Containers and machines are owned by the evaluation session; every
//! binding, label, and accumulator refers to them through these handles,
//! so a mutation through one handle is observed through all of them.

use serde::{Deserialize, Serialize};

/// Container identifier, assigned in allocation order starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(u32);

impl ContainerId {
    /// The first id handed out in a pass
    pub const FIRST: Self = Self(1);

    /// Create from a raw id
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw numeric id
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Id following this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Zero-based arena slot
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Machine handle (arena slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MachineId(usize);

impl MachineId {
    /// Create from an arena slot
    #[must_use]
    pub const fn new(slot: usize) -> Self {
        Self(slot)
    }

    /// Arena slot
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}
