//! Accumulated side effects of one evaluation pass.
//!
//! Containers and machines are stored in arenas and referred to by
//! handle everywhere else, so `machineAttribute` through any binding is
//! seen by every other binding, label and accumulator entry.

use indexmap::IndexMap;
use loom_core::{
    Connection, Container, ContainerId, Invariant, Machine, MachineId, PlacementRule,
};
use std::collections::{BTreeMap, BTreeSet};

/// Something a label can be applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Atom {
    /// A container handle
    Container(ContainerId),
    /// A machine handle
    Machine(MachineId),
}

/// Shared accumulators for one pass
#[derive(Debug, Clone)]
pub struct Session {
    labels: IndexMap<String, Vec<Atom>>,
    containers: Vec<Container>,
    machines: Vec<Machine>,
    connections: BTreeSet<Connection>,
    placements: Vec<PlacementRule>,
    invariants: Vec<Invariant>,
    next_container: ContainerId,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self {
            labels: IndexMap::new(),
            containers: Vec::new(),
            machines: Vec::new(),
            connections: BTreeSet::new(),
            placements: Vec::new(),
            invariants: Vec::new(),
            next_container: ContainerId::FIRST,
        }
    }

    /// Register a container and return its handle
    pub fn add_container(
        &mut self,
        image: String,
        command: Vec<String>,
        env: BTreeMap<String, String>,
    ) -> ContainerId {
        let id = self.next_container;
        self.next_container = id.next();
        self.containers.push(Container::new(id, image, command).with_env(env));
        id
    }

    /// Container by handle
    #[must_use]
    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(id.index())
    }

    pub(crate) fn container_mut(&mut self, id: ContainerId) -> Option<&mut Container> {
        self.containers.get_mut(id.index())
    }

    /// Register a machine and return its handle
    pub fn add_machine(&mut self, machine: Machine) -> MachineId {
        self.machines.push(machine);
        MachineId::new(self.machines.len() - 1)
    }

    /// Machine by handle
    #[must_use]
    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machines.get(id.index())
    }

    pub(crate) fn machine_mut(&mut self, id: MachineId) -> Option<&mut Machine> {
        self.machines.get_mut(id.index())
    }

    /// Whether a label name is taken
    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    /// Atoms of a label
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&[Atom]> {
        self.labels.get(name).map(Vec::as_slice)
    }

    /// Bind a label and stamp it onto each atom.
    ///
    /// The caller has already rejected redefinition.
    pub(crate) fn define_label(&mut self, name: &str, atoms: Vec<Atom>) {
        for atom in &atoms {
            match *atom {
                Atom::Container(id) => {
                    if let Some(c) = self.container_mut(id) {
                        c.stamp_label(name);
                    }
                }
                Atom::Machine(id) => {
                    if let Some(m) = self.machine_mut(id) {
                        if m.labels.last().map(String::as_str) != Some(name) {
                            m.labels.push(name.to_string());
                        }
                    }
                }
            }
        }
        self.labels.insert(name.to_string(), atoms);
    }

    pub(crate) fn connect(&mut self, conn: Connection) {
        self.connections.insert(conn);
    }

    pub(crate) fn place(&mut self, rule: PlacementRule) {
        if !self.placements.contains(&rule) {
            self.placements.push(rule);
        }
    }

    pub(crate) fn add_invariant(&mut self, invariant: Invariant) {
        self.invariants.push(invariant);
    }

    /// Registered containers in id order
    #[must_use]
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Declared machines in declaration order
    #[must_use]
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub(crate) fn machines_mut(&mut self) -> &mut [Machine] {
        &mut self.machines
    }

    /// Connection set, sorted
    #[must_use]
    pub fn connections(&self) -> Vec<Connection> {
        self.connections.iter().cloned().collect()
    }

    /// Placement rules in declaration order
    #[must_use]
    pub fn placements(&self) -> &[PlacementRule] {
        &self.placements
    }

    /// Invariants in declaration order
    #[must_use]
    pub fn invariants(&self) -> &[Invariant] {
        &self.invariants
    }

    /// Label name to the ids of the containers it covers
    #[must_use]
    pub fn label_containers(&self) -> IndexMap<String, Vec<ContainerId>> {
        self.labels
            .iter()
            .map(|(name, atoms)| {
                let ids = atoms
                    .iter()
                    .filter_map(|atom| match atom {
                        Atom::Container(id) => Some(*id),
                        Atom::Machine(_) => None,
                    })
                    .collect();
                (name.clone(), ids)
            })
            .collect()
    }
}
