//! Compiled infrastructure records.
//!
//! These are the values a specification program leaves behind in its
//! session: the containers it ran `docker` for, the machines it declared,
//! the label-level connections it allowed, and the placement rules it
//! asked for. Each record carries its canonical textual form.

use crate::error::{CoreError, CoreResult};
use crate::id::ContainerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved label naming the public internet
pub const PUBLIC_LABEL: &str = "public";

/// Highest valid port number
pub const MAX_PORT: i64 = 65535;

/// Quote a string the way the canonical form prints it
#[must_use]
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Shortest float text; integral floats print without a fraction and
/// negative zero prints as `0`
#[must_use]
pub fn format_float(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}

/// A `docker` invocation registered during evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Allocation-order id
    pub id: ContainerId,
    /// Image name
    pub image: String,
    /// Command arguments
    pub command: Vec<String>,
    /// Environment variables
    pub env: BTreeMap<String, String>,
    /// Labels applied to this container, oldest first
    pub labels: Vec<String>,
}

impl Container {
    /// Create a container with no labels
    #[must_use]
    pub fn new(id: ContainerId, image: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            id,
            image: image.into(),
            command,
            env: BTreeMap::new(),
            labels: Vec::new(),
        }
    }

    /// Set environment variables
    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Stamp a label unless it is already the most recent one
    pub fn stamp_label(&mut self, label: &str) {
        if self.labels.last().map(String::as_str) != Some(label) {
            self.labels.push(label.to_string());
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(docker {}", quote(&self.image))?;
        for arg in &self.command {
            write!(f, " {}", quote(arg))?;
        }
        if !self.env.is_empty() {
            f.write_str(" (hmap")?;
            for (key, value) in &self.env {
                write!(f, " ({} {})", quote(key), quote(value))?;
            }
            f.write_str(")")?;
        }
        f.write_str(")")
    }
}

/// Inclusive resource range; a zero `max` means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    /// Lower bound
    pub min: f64,
    /// Upper bound, zero when unbounded
    pub max: f64,
}

impl Range {
    /// Create a range
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether this is the all-zero default
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min == 0.0 && self.max == 0.0
    }

    /// Canonical form under an attribute name, e.g. `(ram 0.5 2)`
    #[must_use]
    pub fn render(&self, name: &str) -> String {
        if self.max == 0.0 {
            format!("({name} {})", format_float(self.min))
        } else {
            format!(
                "({name} {} {})",
                format_float(self.min),
                format_float(self.max)
            )
        }
    }
}

/// Source of authorised SSH keys for a machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineKey {
    /// Literal public key
    Plain(String),
    /// Keys published for a GitHub username
    Github(String),
}

impl fmt::Display for MachineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(key) => write!(f, "(sshkey {})", quote(key)),
            Self::Github(user) => write!(f, "(githubKey {})", quote(user)),
        }
    }
}

/// A declared machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Cloud provider
    pub provider: String,
    /// Master or worker role
    pub role: String,
    /// Instance size
    pub size: String,
    /// Provider region
    pub region: String,
    /// Disk size in GB
    pub disk_size: i64,
    /// CPU count range
    pub cpu: Range,
    /// RAM range in GB
    pub ram: Range,
    /// Key sources in declaration order
    pub keys: Vec<MachineKey>,
    /// Resolved public keys, filled in when the machine is queried
    pub ssh_keys: Vec<String>,
    /// Labels applied to this machine
    pub labels: Vec<String>,
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.provider.is_empty() {
            parts.push(format!("(provider {})", quote(&self.provider)));
        }
        if !self.region.is_empty() {
            parts.push(format!("(region {})", quote(&self.region)));
        }
        if !self.size.is_empty() {
            parts.push(format!("(size {})", quote(&self.size)));
        }
        if self.disk_size != 0 {
            parts.push(format!("(diskSize {})", self.disk_size));
        }
        if !self.ram.is_empty() {
            parts.push(self.ram.render("ram"));
        }
        if !self.cpu.is_empty() {
            parts.push(self.cpu.render("cpu"));
        }
        if !self.role.is_empty() {
            parts.push(format!("(role {})", quote(&self.role)));
        }
        parts.extend(self.keys.iter().map(ToString::to_string));

        if parts.is_empty() {
            f.write_str("(machine)")
        } else {
            write!(f, "(machine {})", parts.join(" "))
        }
    }
}

/// Validate a port range and narrow it to `u16`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPortRange`] when either bound is outside
/// `0..=65535` or `min > max`.
pub fn check_port_range(min: i64, max: i64) -> CoreResult<(u16, u16)> {
    match (u16::try_from(min), u16::try_from(max)) {
        (Ok(lo), Ok(hi)) if lo <= hi => Ok((lo, hi)),
        _ => Err(CoreError::InvalidPortRange { min, max }),
    }
}

/// Permission for one label's containers to reach another's
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    /// Source label
    pub from: String,
    /// Destination label
    pub to: String,
    /// Lowest allowed port
    pub min_port: u16,
    /// Highest allowed port
    pub max_port: u16,
}

impl Connection {
    /// Create a connection, validating the port range
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPortRange`] when either bound is outside
    /// `0..=65535` or `min > max`.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        min_port: i64,
        max_port: i64,
    ) -> CoreResult<Self> {
        let (min_port, max_port) = check_port_range(min_port, max_port)?;
        Ok(Self {
            from: from.into(),
            to: to.into(),
            min_port,
            max_port,
        })
    }

    /// Whether this connection names a port range rather than one port
    #[must_use]
    pub const fn is_range(&self) -> bool {
        self.min_port != self.max_port
    }
}

/// What a placement rule constrains its target against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementConstraint {
    /// Another label's containers
    Label(String),
    /// Machine attributes; empty strings are unconstrained
    Machine {
        /// Provider
        provider: String,
        /// Region
        region: String,
        /// Size
        size: String,
    },
}

/// A placement constraint on one target label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRule {
    /// Label being placed
    pub target_label: String,
    /// `true` keeps the target away from the constraint, `false` puts it on
    pub exclusive: bool,
    /// The constraint
    pub constraint: PlacementConstraint,
}

impl PlacementRule {
    /// Label-vs-label rule
    #[must_use]
    pub fn label(target: impl Into<String>, exclusive: bool, other: impl Into<String>) -> Self {
        Self {
            target_label: target.into(),
            exclusive,
            constraint: PlacementConstraint::Label(other.into()),
        }
    }

    /// The other label of a label rule
    #[must_use]
    pub fn other_label(&self) -> Option<&str> {
        match &self.constraint {
            PlacementConstraint::Label(other) => Some(other),
            PlacementConstraint::Machine { .. } => None,
        }
    }
}
