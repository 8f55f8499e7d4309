//! LOOM Graph
//!
//! Everything that happens after a specification has been evaluated:
//! the communication graph derived from label-level connections, the
//! greedy availability-set packer, the invariant checker, the
//! counterfactual failure queries, and a Graphviz rendering.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dot;
pub mod error;
pub mod graph;
pub mod invariant;
pub mod placement;
pub mod query;

pub use dot::to_dot;
pub use error::{InvariantError, QueryError};
pub use graph::{AvailabilitySet, Graph, Node, Topology, PUBLIC_NODE};
pub use invariant::{check_invariants, holds};
pub use placement::{avoid_map, pack};
pub use query::{Query, QueryKind, check_queries, run_query};
