//! Errors surfaced by invariant checking and failure queries.

use loom_core::Invariant;
use thiserror::Error;

/// The first invariant that did not hold
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant failed: {invariant}")]
pub struct InvariantError {
    /// The failing invariant
    pub invariant: Invariant,
}

/// Failure query errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Line is not `<removeOne|removeSet> <target>`
    #[error("could not parse query: {line}")]
    Malformed {
        /// Offending line
        line: String,
    },

    /// Target names neither a node nor a label
    #[error("malformed query (unknown label): {target}")]
    UnknownTarget {
        /// Target as written
        target: String,
    },

    /// The mutation breaks an invariant
    #[error("mutation {query} failed invariant {invariant}")]
    Failed {
        /// Query text
        query: String,
        /// Invariant that no longer holds
        invariant: Invariant,
    },
}
