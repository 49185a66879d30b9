//! Structural data of mounted coupled models.

use std::collections::HashSet;

use crate::coupling::{Coupling, CouplingKind};
use crate::ports::PortId;
use crate::simulation::ModelId;

/// The engine-side slot of a mounted coupled model: its children and its
/// three coupling sets.
///
/// Every coupling stored here references ports whose owners are children of
/// this model or this model itself; the mutating operations preserve that
/// invariant by purging couplings whenever a referenced port or child goes
/// away. Each coupling is always removed from the set it actually belongs
/// to.
pub(crate) struct CoupledSlot {
    children: Vec<ModelId>,
    internal: HashSet<Coupling>,
    external_input: HashSet<Coupling>,
    external_output: HashSet<Coupling>,
}

impl CoupledSlot {
    pub(crate) fn new() -> Self {
        Self {
            children: Vec::new(),
            internal: HashSet::new(),
            external_input: HashSet::new(),
            external_output: HashSet::new(),
        }
    }

    pub(crate) fn children(&self) -> &[ModelId] {
        &self.children
    }

    pub(crate) fn add_child(&mut self, child: ModelId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: ModelId) {
        self.children.retain(|&c| c != child);
    }

    /// Inserts a coupling into the set matching its kind.
    ///
    /// Couplings are value objects: re-inserting an existing pair is a
    /// no-op.
    pub(crate) fn insert(&mut self, coupling: Coupling) {
        match coupling.kind() {
            CouplingKind::Internal => self.internal.insert(coupling),
            CouplingKind::ExternalInput => self.external_input.insert(coupling),
            CouplingKind::ExternalOutput => self.external_output.insert(coupling),
        };
    }

    pub(crate) fn internal_from(&self, port: PortId) -> impl Iterator<Item = &Coupling> {
        self.internal.iter().filter(move |c| c.from_port() == port)
    }

    pub(crate) fn external_input_from(&self, port: PortId) -> impl Iterator<Item = &Coupling> {
        self.external_input
            .iter()
            .filter(move |c| c.from_port() == port)
    }

    pub(crate) fn external_output_from(&self, port: PortId) -> impl Iterator<Item = &Coupling> {
        self.external_output
            .iter()
            .filter(move |c| c.from_port() == port)
    }

    pub(crate) fn internal(&self) -> &HashSet<Coupling> {
        &self.internal
    }

    pub(crate) fn external_input(&self) -> &HashSet<Coupling> {
        &self.external_input
    }

    pub(crate) fn external_output(&self) -> &HashSet<Coupling> {
        &self.external_output
    }

    /// Removes every coupling referencing the given port.
    pub(crate) fn purge_port(&mut self, port: PortId) {
        self.internal.retain(|c| !c.touches(port));
        self.external_input.retain(|c| !c.touches(port));
        self.external_output.retain(|c| !c.touches(port));
    }

    /// Removes every coupling referencing any of the given ports.
    pub(crate) fn purge_ports(&mut self, ports: &HashSet<PortId>) {
        self.internal
            .retain(|c| !ports.contains(&c.from_port()) && !ports.contains(&c.to_port()));
        self.external_input
            .retain(|c| !ports.contains(&c.from_port()) && !ports.contains(&c.to_port()));
        self.external_output
            .retain(|c| !ports.contains(&c.from_port()) && !ports.contains(&c.to_port()));
    }
}
