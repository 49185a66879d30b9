//! Model ports and event payloads.
//!
//! A port is a named, unidirectional endpoint bound to exactly one owning
//! model for its entire lifetime. Ports are typed: the payload type is
//! captured when the port is created and checked both when a coupling is
//! constructed and when a concrete value crosses the port at run time.
//!
//! Ports are owned by the simulation and addressed through [`PortId`]
//! handles; the [`Port`] descriptor can be retrieved from the handle for
//! introspection.
//!
//! # Payloads
//!
//! Values exchanged between models implement the [`Message`] trait, which is
//! automatically implemented for any `Clone + Send + Debug + 'static` type.
//! Since a value broadcast along several couplings is observed by all
//! destinations, receivers get a `&dyn Message` and clone the payload only
//! if they keep it:
//!
//! ```
//! use pardevs::ports::Message;
//!
//! fn inspect(value: &dyn Message) -> Option<u64> {
//!     value.downcast_ref::<u64>().copied()
//! }
//!
//! assert_eq!(inspect(&42u64), Some(42));
//! assert_eq!(inspect(&"not a number"), None);
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use dyn_clone::DynClone;

use crate::simulation::ModelId;

/// A type-erased event payload.
///
/// This trait is automatically implemented for any type that is `Clone`,
/// `Send`, `Debug` and `'static`; it is the dynamic counterpart of the
/// payload bound on typed ports. Boxed payloads are clonable through
/// [`dyn_clone`].
pub trait Message: DynClone + Send + fmt::Debug + 'static {
    /// Upcasts the payload for downcasting purposes.
    #[doc(hidden)]
    fn as_any(&self) -> &dyn Any;
}

dyn_clone::clone_trait_object!(Message);

impl<T> Message for T
where
    T: Clone + Send + fmt::Debug + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn Message {
    /// Returns a reference to the concrete payload if it is of type `T`.
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Returns `true` if the concrete payload is of type `T`.
    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Unique identifier of a port within a simulation.
///
/// Port identifiers are stable for the lifetime of the port: they are never
/// re-used while the port exists and become invalid when the port or its
/// owning model is removed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PortId(pub(crate) usize);

/// The direction of a port.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PortKind {
    /// A port receiving values from the outside of its owning model.
    Input,
    /// A port emitting values produced by its owning model.
    Output,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Input => f.write_str("input"),
            PortKind::Output => f.write_str("output"),
        }
    }
}

/// Descriptor of a port.
///
/// A port belongs to exactly one model, set at construction and immutable
/// thereafter. The payload type is recorded as a [`TypeId`] together with its
/// type name for diagnostics.
#[derive(Debug)]
pub struct Port {
    name: String,
    owner: ModelId,
    kind: PortKind,
    value_type: TypeId,
    value_type_name: &'static str,
}

impl Port {
    pub(crate) fn new<T: Message>(name: &str, owner: ModelId, kind: PortKind) -> Self {
        Self {
            name: name.to_owned(),
            owner,
            kind,
            value_type: TypeId::of::<T>(),
            value_type_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the local name of the port.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the model owning the port.
    pub fn owner(&self) -> ModelId {
        self.owner
    }

    /// Returns the direction of the port.
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Returns the name of the payload type carried by the port.
    pub fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    pub(crate) fn value_type(&self) -> TypeId {
        self.value_type
    }

    /// Returns `true` if the port carries payloads of the given value's
    /// concrete type.
    pub(crate) fn accepts(&self, value: &dyn Message) -> bool {
        self.value_type == value.as_any().type_id()
    }
}
