//! LOOM Core
//!
//! Shared vocabulary for the loom toolchain: source positions and
//! diagnostics, stable handles for containers and machines, and the
//! compiled infrastructure records (containers, machines, connections,
//! placement rules, invariants) that every later stage consumes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod invariant;
pub mod model;
pub mod position;

pub use error::{CoreError, CoreResult};
pub use id::{ContainerId, MachineId};
pub use invariant::{Invariant, InvariantKind};
pub use model::{
    Connection, Container, MAX_PORT, Machine, MachineKey, PUBLIC_LABEL, PlacementConstraint,
    PlacementRule, Range, check_port_range, format_float, quote,
};
pub use position::{Diagnostic, Position};
