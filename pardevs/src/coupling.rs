//! Coupling relations between ports.
//!
//! A coupling is an immutable directed edge between two ports, owned by the
//! enclosing coupled model. Three kinds exist:
//!
//! * [`CouplingKind::Internal`] (IC): from a child's output port to a sibling
//!   child's input port,
//! * [`CouplingKind::ExternalInput`] (EIC): from a coupled model's own input
//!   port down to a child's input port,
//! * [`CouplingKind::ExternalOutput`] (EOC): from a child's output port up to
//!   the coupled model's own output port.
//!
//! Couplings are value objects: they carry no identity beyond their
//! `(from, to)` port pair and are stored in per-kind unordered sets. A
//! coupling between two ports of the same model is rejected at construction
//! time and never silently accepted.

use std::error::Error;
use std::fmt;

use crate::ports::{Port, PortId, PortKind};

/// The kind of a coupling.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CouplingKind {
    /// Child output to sibling child input.
    Internal,
    /// Coupled-model input to child input.
    ExternalInput,
    /// Child output to coupled-model output.
    ExternalOutput,
}

impl CouplingKind {
    /// Returns the port directions required at each endpoint.
    pub(crate) fn endpoint_kinds(self) -> (PortKind, PortKind) {
        match self {
            CouplingKind::Internal => (PortKind::Output, PortKind::Input),
            CouplingKind::ExternalInput => (PortKind::Input, PortKind::Input),
            CouplingKind::ExternalOutput => (PortKind::Output, PortKind::Output),
        }
    }
}

impl fmt::Display for CouplingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouplingKind::Internal => f.write_str("internal coupling"),
            CouplingKind::ExternalInput => f.write_str("external input coupling"),
            CouplingKind::ExternalOutput => f.write_str("external output coupling"),
        }
    }
}

/// A directed edge between two ports.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Coupling {
    from: PortId,
    to: PortId,
    kind: CouplingKind,
}

impl Coupling {
    /// Validates the value-object invariants and creates the coupling.
    ///
    /// The graph-level invariants (sibling/parent-child relations) are the
    /// responsibility of the enclosing coupled model.
    pub(crate) fn new(
        kind: CouplingKind,
        from_id: PortId,
        from: &Port,
        to_id: PortId,
        to: &Port,
    ) -> Result<Self, CouplingError> {
        if from.owner() == to.owner() {
            return Err(CouplingError::SelfCoupling);
        }
        let (from_kind, to_kind) = kind.endpoint_kinds();
        if from.kind() != from_kind || to.kind() != to_kind {
            return Err(CouplingError::DirectionMismatch);
        }
        if from.value_type() != to.value_type() {
            return Err(CouplingError::TypeMismatch);
        }

        Ok(Self {
            from: from_id,
            to: to_id,
            kind,
        })
    }

    /// Returns the source port.
    pub fn from_port(&self) -> PortId {
        self.from
    }

    /// Returns the destination port.
    pub fn to_port(&self) -> PortId {
        self.to
    }

    /// Returns the kind of the coupling.
    pub fn kind(&self) -> CouplingKind {
        self.kind
    }

    /// Returns `true` if either endpoint is the given port.
    pub(crate) fn touches(&self, port: PortId) -> bool {
        self.from == port || self.to == port
    }
}

/// Error returned when a coupling cannot be constructed.
///
/// A failed construction leaves the coupling sets of the enclosing coupled
/// model unchanged.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CouplingError {
    /// One of the two ports does not exist.
    PortNotFound,
    /// Both ports belong to the same model.
    SelfCoupling,
    /// The port directions do not match the coupling kind.
    DirectionMismatch,
    /// The two ports carry different payload types.
    TypeMismatch,
    /// An internal coupling was requested between ports whose owners are not
    /// children of the same coupled model.
    NotSiblings,
    /// An external coupling was requested between ports that are not in a
    /// parent-child relation.
    NotParentChild,
}

impl fmt::Display for CouplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PortNotFound => f.write_str("one of the coupled ports does not exist"),
            Self::SelfCoupling => {
                f.write_str("a model cannot be coupled to itself")
            }
            Self::DirectionMismatch => {
                f.write_str("the port directions do not match the coupling kind")
            }
            Self::TypeMismatch => {
                f.write_str("the coupled ports carry different payload types")
            }
            Self::NotSiblings => {
                f.write_str("the coupled ports do not belong to children of the same coupled model")
            }
            Self::NotParentChild => {
                f.write_str("the coupled ports are not in a parent-child relation")
            }
        }
    }
}

impl Error for CouplingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::ModelId;

    fn port<T: crate::ports::Message>(owner: usize, kind: PortKind) -> Port {
        Port::new::<T>("p", ModelId(owner), kind)
    }

    #[test]
    fn self_coupling_is_rejected() {
        let from = port::<u64>(1, PortKind::Output);
        let to = port::<u64>(1, PortKind::Input);

        let result = Coupling::new(CouplingKind::Internal, PortId(0), &from, PortId(1), &to);
        assert_eq!(result, Err(CouplingError::SelfCoupling));
    }

    #[test]
    fn direction_must_match_kind() {
        let from = port::<u64>(1, PortKind::Input);
        let to = port::<u64>(2, PortKind::Input);

        let result = Coupling::new(CouplingKind::Internal, PortId(0), &from, PortId(1), &to);
        assert_eq!(result, Err(CouplingError::DirectionMismatch));

        let result = Coupling::new(CouplingKind::ExternalInput, PortId(0), &from, PortId(1), &to);
        assert!(result.is_ok());
    }

    #[test]
    fn payload_types_must_match() {
        let from = port::<u64>(1, PortKind::Output);
        let to = port::<u32>(2, PortKind::Input);

        let result = Coupling::new(CouplingKind::Internal, PortId(0), &from, PortId(1), &to);
        assert_eq!(result, Err(CouplingError::TypeMismatch));
    }
}
