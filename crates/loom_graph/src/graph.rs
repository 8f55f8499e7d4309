//! Directed communication graph.
//!
//! One node per container (named by its id) plus a sentinel node for the
//! public internet. Edges are permissions: `a -> b` means container `a`
//! may open connections to `b`. Label-level connections are expanded to
//! every concrete container pair carrying the two labels.

use loom_core::{Connection, Container, PUBLIC_LABEL, PlacementRule};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Name of the public-internet sentinel node
pub const PUBLIC_NODE: &str = "public";

/// Everything the graph is derived from
#[derive(Debug, Clone, Copy)]
pub struct Topology<'a> {
    /// Registered containers in allocation order
    pub containers: &'a [Container],
    /// Label-level connections
    pub connections: &'a [Connection],
    /// Placement rules in declaration order
    pub placements: &'a [PlacementRule],
    /// Number of declared machines
    pub machine_count: usize,
}

/// A graph node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Container id as text, or `public`
    pub name: String,
    /// Labels carried by the node
    pub labels: IndexSet<String>,
    /// Image, for container nodes
    pub image: Option<String>,
    /// Outgoing edges
    pub edges: IndexSet<String>,
}

impl Node {
    /// Create an unconnected node
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: IndexSet::new(),
            image: None,
            edges: IndexSet::new(),
        }
    }

    /// Add a label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    /// Set the image
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Whether the node carries `label`
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// Nodes allowed to share one machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySet {
    /// Member node names
    pub nodes: IndexSet<String>,
}

impl AvailabilitySet {
    /// Whether `node` is a member
    #[must_use]
    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<String> for AvailabilitySet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// The communication graph with its availability sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    /// Nodes in insertion order
    pub nodes: IndexMap<String, Node>,
    /// Availability sets in creation order
    pub avail_sets: Vec<AvailabilitySet>,
    /// Mutual must-not-coexist constraints recorded by the packer
    pub avoid: IndexMap<String, IndexSet<String>>,
    /// Declared machine count
    pub machine_count: usize,
}

impl Graph {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the graph of an evaluated specification and pack it.
    #[must_use]
    pub fn build(topology: &Topology<'_>) -> Self {
        let mut graph = Self::new();
        graph.machine_count = topology.machine_count;

        for container in topology.containers {
            let mut node = Node::new(container.id.to_string()).with_image(&container.image);
            node.labels.extend(container.labels.iter().cloned());
            graph.add_node(node);
        }
        graph.add_node(Node::new(PUBLIC_NODE).with_label(PUBLIC_LABEL));

        for conn in topology.connections {
            graph.connect_labels(&conn.from, &conn.to);
        }

        crate::placement::pack(&mut graph, topology.placements);
        tracing::debug!(
            nodes = graph.nodes.len(),
            avail_sets = graph.avail_sets.len(),
            "built communication graph"
        );
        graph
    }

    /// Add a node and put it in the first availability set.
    ///
    /// Re-adding an existing name merges its labels.
    pub fn add_node(&mut self, node: Node) {
        if let Some(existing) = self.nodes.get_mut(&node.name) {
            existing.labels.extend(node.labels);
            return;
        }
        match self.avail_sets.first_mut() {
            Some(set) => {
                set.nodes.insert(node.name.clone());
            }
            None => self.avail_sets.push([node.name.clone()].into_iter().collect()),
        }
        self.nodes.insert(node.name.clone(), node);
    }

    /// Add a directed edge; self edges and unknown endpoints are ignored
    pub fn add_edge(&mut self, from: &str, to: &str) {
        if from == to || !self.nodes.contains_key(to) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(from) {
            node.edges.insert(to.to_string());
        }
    }

    /// Expand a label-level connection over every concrete node pair
    pub fn connect_labels(&mut self, from: &str, to: &str) {
        let sources = self.nodes_with_label(from);
        let targets = self.nodes_with_label(to);
        for src in &sources {
            for dst in &targets {
                self.add_edge(src, dst);
            }
        }
    }

    /// Names of nodes carrying `label`, in node order
    #[must_use]
    pub fn nodes_with_label(&self, label: &str) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.has_label(label))
            .map(|n| n.name.clone())
            .collect()
    }

    /// Whether the public-internet node is present
    #[must_use]
    pub fn has_public(&self) -> bool {
        self.nodes.contains_key(PUBLIC_NODE)
    }

    /// Index of the availability set holding `node`
    #[must_use]
    pub fn avail_set_of(&self, node: &str) -> Option<usize> {
        self.avail_sets.iter().position(|set| set.contains(node))
    }

    /// Delete a node, its incoming edges and its set membership.
    ///
    /// Sets left empty are dropped.
    pub fn remove_node(&mut self, name: &str) {
        if self.nodes.shift_remove(name).is_none() {
            return;
        }
        for node in self.nodes.values_mut() {
            node.edges.shift_remove(name);
        }
        for set in &mut self.avail_sets {
            set.nodes.shift_remove(name);
        }
        self.avail_sets.retain(|set| !set.is_empty());
        self.avoid.shift_remove(name);
        for others in self.avoid.values_mut() {
            others.shift_remove(name);
        }
    }

    /// Every node reachable from `start` through at least one edge
    #[must_use]
    pub fn reachable(&self, start: &str) -> IndexSet<String> {
        let mut seen = IndexSet::new();
        let mut stack: Vec<&str> = self
            .nodes
            .get(start)
            .map(|n| n.edges.iter().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(current) = stack.pop() {
            if !seen.insert(current.to_string()) {
                continue;
            }
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.edges.iter().map(String::as_str));
            }
        }
        seen
    }

    /// All simple directed paths from `start` to `end`, endpoints included
    #[must_use]
    pub fn simple_paths(&self, start: &str, end: &str) -> Vec<Vec<String>> {
        let mut paths = Vec::new();
        if !self.nodes.contains_key(start) || !self.nodes.contains_key(end) {
            return paths;
        }
        let mut path = vec![start.to_string()];
        self.walk_paths(start, end, &mut path, &mut paths);
        paths
    }

    fn walk_paths(
        &self,
        current: &str,
        end: &str,
        path: &mut Vec<String>,
        paths: &mut Vec<Vec<String>>,
    ) {
        if current == end {
            paths.push(path.clone());
            return;
        }
        let Some(node) = self.nodes.get(current) else {
            return;
        };
        for next in &node.edges {
            if path.contains(next) {
                continue;
            }
            path.push(next.clone());
            self.walk_paths(next, end, path, paths);
            path.pop();
        }
    }
}
