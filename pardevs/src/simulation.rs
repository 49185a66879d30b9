//! Hierarchy management, event routing and transition execution.
//!
//! This module contains the [`Simulation`] environment, which owns the model
//! tree and drives every DEVS transition. Models and ports live in arenas
//! and are addressed through the stable [`ModelId`] and
//! [`PortId`](crate::ports::PortId) handles returned at creation time.
//!
//! # Building a hierarchy
//!
//! A hierarchy is assembled from the top down:
//!
//! 1. coupled models are added with [`Simulation::add_coupled`] and atomic
//!    models with [`Simulation::add_atomic`], each mounted under an optional
//!    parent coupled model,
//! 2. ports are declared on each model with [`Simulation::add_input_port`]
//!    and [`Simulation::add_output_port`],
//! 3. ports are wired together with [`Simulation::add_internal_coupling`],
//!    [`Simulation::add_external_input_coupling`] and
//!    [`Simulation::add_external_output_coupling`].
//!
//! A model's full name is computed once, when it is mounted, by dot-joining
//! its local name to its parent's full name; it uniquely identifies the
//! model for its entire lifetime. Structure changes replace models, they
//! never relocate them.
//!
//! # Routing
//!
//! [`Simulation::receive`] delivers a value to an input port at a given
//! simulated time. On an atomic model this applies the external or
//! confluent transition under the model's busy marker; on a coupled model
//! the value is forwarded along every matching external input coupling.
//!
//! [`Simulation::send`] emits a value from an output port. The owning
//! model's parent forwards it along matching internal couplings to sibling
//! inputs, and along matching external output couplings up to its own
//! output ports, recursively. A value emitted from a root-level output port
//! is deliberately dropped: there is nowhere to forward it to and this is
//! not an error.
//!
//! [`Simulation::process_internal`] is the entry point for the scheduling
//! collaborator: it applies the internal transition, emits and routes the
//! output values and reschedules the model at its new internal-transition
//! horizon.
//!
//! # Concurrency and quiescence
//!
//! Delivery entry points take `&self` and may be invoked concurrently from
//! independent execution contexts; mutual exclusion is per atomic model, so
//! transitions of distinct models proceed in parallel while transitions of
//! a single model are serialized in lock-acquisition order. Structural
//! operations take `&mut self`: restructuring therefore requires exclusive
//! access, which rules out restructuring a hierarchy with deliveries in
//! flight.

mod atomic;
mod coupled;

use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use slab::Slab;
use tracing::{error, warn};

use crate::coupling::{Coupling, CouplingError, CouplingKind};
use crate::model::{Atomic, OutputBag, StateField};
use crate::observer::{StateObserver, StateUpdate, SubscriptionId};
use crate::ports::{Message, Port, PortId, PortKind};
use crate::schedule::Scheduler;
use crate::time::MonotonicTime;

use atomic::{AtomicSlot, CancelGuard};
use coupled::CoupledSlot;

const BROKEN_HIERARCHY: &str =
    "internal simulation error: the parent of a mounted model is not a coupled model";

/// Unique identifier of a model within a simulation.
///
/// Model identifiers are stable for the lifetime of the model and become
/// invalid when the model is removed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ModelId(pub(crate) usize);

/// A mounted model: identity, ports, subscriptions and kind-specific state.
struct ModelSlot {
    name: String,
    full_name: Arc<str>,
    parent: Option<ModelId>,
    ports: HashMap<String, PortId>,
    observers: Mutex<Vec<ObserverEntry>>,
    kind: ModelKind,
}

#[derive(Clone)]
struct ObserverEntry {
    id: SubscriptionId,
    observer: Arc<dyn StateObserver>,
}

enum ModelKind {
    Atomic(AtomicSlot),
    Coupled(CoupledSlot),
}

impl ModelKind {
    fn as_atomic(&self) -> Option<&AtomicSlot> {
        match self {
            ModelKind::Atomic(slot) => Some(slot),
            ModelKind::Coupled(_) => None,
        }
    }

    fn as_coupled(&self) -> Option<&CoupledSlot> {
        match self {
            ModelKind::Coupled(slot) => Some(slot),
            ModelKind::Atomic(_) => None,
        }
    }

    fn as_coupled_mut(&mut self) -> Option<&mut CoupledSlot> {
        match self {
            ModelKind::Coupled(slot) => Some(slot),
            ModelKind::Atomic(_) => None,
        }
    }
}

/// Simulation environment.
///
/// A `Simulation` owns the model hierarchy and executes DEVS transitions on
/// behalf of the scheduling collaborator it was created with. See the
/// [module documentation](self) for an overview of hierarchy construction
/// and event routing.
pub struct Simulation {
    models: Slab<ModelSlot>,
    ports: Slab<Port>,
    scheduler: Arc<dyn Scheduler>,
    next_subscription: u64,
}

impl Simulation {
    /// Creates a new simulation bound to the given scheduling collaborator.
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            models: Slab::new(),
            ports: Slab::new(),
            scheduler,
            next_subscription: 0,
        }
    }

    /// Mounts a new coupled model, optionally under a parent coupled model.
    pub fn add_coupled(
        &mut self,
        name: &str,
        parent: Option<ModelId>,
    ) -> Result<ModelId, StructureError> {
        let (full_name, observers) = self.prepare_mount(name, parent)?;

        let id = ModelId(self.models.insert(ModelSlot {
            name: name.to_owned(),
            full_name,
            parent,
            ports: HashMap::new(),
            observers: Mutex::new(observers),
            kind: ModelKind::Coupled(CoupledSlot::new()),
        }));
        if let Some(parent) = parent {
            self.models[parent.0]
                .kind
                .as_coupled_mut()
                .expect(BROKEN_HIERARCHY)
                .add_child(id);
        }

        Ok(id)
    }

    /// Mounts a new atomic model, optionally under a parent coupled model.
    ///
    /// The model's time of last event is initialized to the current
    /// simulated time, and its first internal transition is scheduled at
    /// `now + time_advance()` unless the initial state is passive.
    pub fn add_atomic(
        &mut self,
        behavior: impl Atomic,
        name: &str,
        parent: Option<ModelId>,
    ) -> Result<ModelId, StructureError> {
        let (full_name, observers) = self.prepare_mount(name, parent)?;

        let now = self.scheduler.now();
        let id = ModelId(self.models.vacant_key());
        let pending = behavior
            .time_advance()
            .as_duration()
            .map(|advance| self.scheduler.schedule_internal(id, now + advance));

        let inserted = self.models.insert(ModelSlot {
            name: name.to_owned(),
            full_name,
            parent,
            ports: HashMap::new(),
            observers: Mutex::new(observers),
            kind: ModelKind::Atomic(AtomicSlot::new(Box::new(behavior), now, pending)),
        });
        debug_assert_eq!(inserted, id.0);

        if let Some(parent) = parent {
            self.models[parent.0]
                .kind
                .as_coupled_mut()
                .expect(BROKEN_HIERARCHY)
                .add_child(id);
        }

        Ok(id)
    }

    /// Removes a model and, for a coupled model, its entire subtree.
    ///
    /// Every coupling referencing a port of a removed model is purged from
    /// the coupling set it belongs to, and pending internal-transition
    /// events of removed atomic models are cancelled with the scheduling
    /// collaborator.
    pub fn remove_model(&mut self, model: ModelId) -> Result<(), StructureError> {
        if !self.models.contains(model.0) {
            return Err(StructureError::ModelNotFound);
        }

        let subtree = self.collect_subtree(model);
        let removed_ports: HashSet<PortId> = subtree
            .iter()
            .flat_map(|id| self.models[id.0].ports.values().copied())
            .collect();

        if let Some(parent) = self.models[model.0].parent {
            let coupled = self.models[parent.0]
                .kind
                .as_coupled_mut()
                .expect(BROKEN_HIERARCHY);
            coupled.remove_child(model);
            coupled.purge_ports(&removed_ports);
        }

        for id in subtree {
            let slot = self.models.remove(id.0);
            for port in slot.ports.values() {
                self.ports.remove(port.0);
            }
            if let ModelKind::Atomic(atomic) = slot.kind {
                if let Some(key) = atomic.into_core().pending {
                    self.scheduler.cancel(key);
                }
            }
        }

        Ok(())
    }

    /// Declares an input port carrying values of type `T` on a model.
    pub fn add_input_port<T: Message>(
        &mut self,
        model: ModelId,
        name: &str,
    ) -> Result<PortId, StructureError> {
        self.add_port::<T>(model, name, PortKind::Input)
    }

    /// Declares an output port carrying values of type `T` on a model.
    pub fn add_output_port<T: Message>(
        &mut self,
        model: ModelId,
        name: &str,
    ) -> Result<PortId, StructureError> {
        self.add_port::<T>(model, name, PortKind::Output)
    }

    /// Removes an input port, purging every coupling that references it.
    pub fn remove_input_port(&mut self, model: ModelId, name: &str) -> Result<(), StructureError> {
        self.remove_port(model, name, PortKind::Input)
    }

    /// Removes an output port, purging every coupling that references it.
    pub fn remove_output_port(&mut self, model: ModelId, name: &str) -> Result<(), StructureError> {
        self.remove_port(model, name, PortKind::Output)
    }

    /// Wires a child's output port to a sibling child's input port.
    pub fn add_internal_coupling(&mut self, from: PortId, to: PortId) -> Result<(), CouplingError> {
        let from_ref = self.ports.get(from.0).ok_or(CouplingError::PortNotFound)?;
        let to_ref = self.ports.get(to.0).ok_or(CouplingError::PortNotFound)?;
        let coupling = Coupling::new(CouplingKind::Internal, from, from_ref, to, to_ref)?;

        let from_parent = self.models[from_ref.owner().0].parent;
        let to_parent = self.models[to_ref.owner().0].parent;
        let parent = match (from_parent, to_parent) {
            (Some(a), Some(b)) if a == b => a,
            _ => return Err(CouplingError::NotSiblings),
        };

        self.models[parent.0]
            .kind
            .as_coupled_mut()
            .expect(BROKEN_HIERARCHY)
            .insert(coupling);

        Ok(())
    }

    /// Wires a coupled model's own input port to one of its children's
    /// input ports.
    pub fn add_external_input_coupling(
        &mut self,
        from: PortId,
        to: PortId,
    ) -> Result<(), CouplingError> {
        let from_ref = self.ports.get(from.0).ok_or(CouplingError::PortNotFound)?;
        let to_ref = self.ports.get(to.0).ok_or(CouplingError::PortNotFound)?;
        let coupling = Coupling::new(CouplingKind::ExternalInput, from, from_ref, to, to_ref)?;

        let owner = from_ref.owner();
        if self.models[to_ref.owner().0].parent != Some(owner) {
            return Err(CouplingError::NotParentChild);
        }
        self.models[owner.0]
            .kind
            .as_coupled_mut()
            .ok_or(CouplingError::NotParentChild)?
            .insert(coupling);

        Ok(())
    }

    /// Wires a child's output port to its parent coupled model's own output
    /// port.
    pub fn add_external_output_coupling(
        &mut self,
        from: PortId,
        to: PortId,
    ) -> Result<(), CouplingError> {
        let from_ref = self.ports.get(from.0).ok_or(CouplingError::PortNotFound)?;
        let to_ref = self.ports.get(to.0).ok_or(CouplingError::PortNotFound)?;
        let coupling = Coupling::new(CouplingKind::ExternalOutput, from, from_ref, to, to_ref)?;

        let owner = to_ref.owner();
        if self.models[from_ref.owner().0].parent != Some(owner) {
            return Err(CouplingError::NotParentChild);
        }
        self.models[owner.0]
            .kind
            .as_coupled_mut()
            .ok_or(CouplingError::NotParentChild)?
            .insert(coupling);

        Ok(())
    }

    /// Subscribes an observer to the "state updated" notifications of a
    /// model.
    ///
    /// Subscribing to a coupled model covers its entire subtree, including
    /// children mounted after the subscription was taken.
    pub fn subscribe(
        &mut self,
        model: ModelId,
        observer: Arc<dyn StateObserver>,
    ) -> Result<SubscriptionId, StructureError> {
        if !self.models.contains(model.0) {
            return Err(StructureError::ModelNotFound);
        }

        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        for target in self.collect_subtree(model) {
            self.models[target.0]
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(ObserverEntry {
                    id,
                    observer: observer.clone(),
                });
        }

        Ok(id)
    }

    /// Releases a subscription on every model it was propagated to.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) {
        for (_, slot) in self.models.iter_mut() {
            slot.observers
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|entry| entry.id != subscription);
        }
    }

    /// Returns the local name of a model.
    pub fn name(&self, model: ModelId) -> Result<&str, StructureError> {
        self.model(model).map(|slot| slot.name.as_str())
    }

    /// Returns the full hierarchical name of a model.
    pub fn full_name(&self, model: ModelId) -> Result<&str, StructureError> {
        self.model(model).map(|slot| &*slot.full_name)
    }

    /// Returns the parent of a model, or `None` for a root model.
    pub fn parent(&self, model: ModelId) -> Result<Option<ModelId>, StructureError> {
        self.model(model).map(|slot| slot.parent)
    }

    /// Returns the children of a coupled model.
    pub fn children(&self, model: ModelId) -> Result<Vec<ModelId>, StructureError> {
        self.coupled(model)
            .map(|coupled| coupled.children().to_vec())
    }

    /// Returns the internal couplings of a coupled model.
    pub fn internal_couplings(&self, model: ModelId) -> Result<Vec<Coupling>, StructureError> {
        self.coupled(model)
            .map(|coupled| coupled.internal().iter().copied().collect())
    }

    /// Returns the external input couplings of a coupled model.
    pub fn external_input_couplings(
        &self,
        model: ModelId,
    ) -> Result<Vec<Coupling>, StructureError> {
        self.coupled(model)
            .map(|coupled| coupled.external_input().iter().copied().collect())
    }

    /// Returns the external output couplings of a coupled model.
    pub fn external_output_couplings(
        &self,
        model: ModelId,
    ) -> Result<Vec<Coupling>, StructureError> {
        self.coupled(model)
            .map(|coupled| coupled.external_output().iter().copied().collect())
    }

    /// Looks up a port by its local name on a model.
    pub fn find_port(&self, model: ModelId, name: &str) -> Result<PortId, StructureError> {
        self.model(model)?
            .ports
            .get(name)
            .copied()
            .ok_or(StructureError::PortNotFound)
    }

    /// Returns the descriptor of a port.
    pub fn port(&self, port: PortId) -> Result<&Port, StructureError> {
        self.ports.get(port.0).ok_or(StructureError::PortNotFound)
    }

    /// Delivers a value to an input port at the given simulated time.
    ///
    /// On an atomic model this applies the external transition, or the
    /// confluent transition when the delivery ties exactly with the
    /// scheduled internal transition. On a coupled model the value is
    /// forwarded along every matching external input coupling.
    ///
    /// A delivery beyond the model's internal-transition horizon is a fatal
    /// time-synchronization violation: the error is surfaced and no
    /// transition is applied.
    pub fn receive(
        &self,
        port: PortId,
        value: &dyn Message,
        time: MonotonicTime,
    ) -> Result<(), ExecutionError> {
        let port_ref = self.ports.get(port.0).ok_or(ExecutionError::PortNotFound)?;
        if port_ref.kind() != PortKind::Input {
            return Err(ExecutionError::NotAnInputPort);
        }
        if !port_ref.accepts(value) {
            return Err(ExecutionError::PayloadTypeMismatch);
        }

        let owner = self
            .models
            .get(port_ref.owner().0)
            .ok_or(ExecutionError::ModelNotFound)?;
        match &owner.kind {
            ModelKind::Atomic(atomic) => {
                self.apply_external(owner, atomic, port_ref.name(), value, time)
            }
            ModelKind::Coupled(coupled) => {
                for coupling in coupled.external_input_from(port) {
                    self.receive(coupling.to_port(), value, time)?;
                }
                Ok(())
            }
        }
    }

    /// Emits a value from an output port at the current simulated time.
    ///
    /// The value is routed along the matching internal and external output
    /// couplings of the owning model's parent. Emitting from a root-level
    /// output port succeeds and delivers to nothing.
    pub fn send(&self, port: PortId, value: &dyn Message) -> Result<(), ExecutionError> {
        let port_ref = self.ports.get(port.0).ok_or(ExecutionError::PortNotFound)?;
        if port_ref.kind() != PortKind::Output {
            return Err(ExecutionError::NotAnOutputPort);
        }
        if !port_ref.accepts(value) {
            return Err(ExecutionError::PayloadTypeMismatch);
        }

        self.route_output(port, value, self.scheduler.now())
    }

    /// Applies the internal transition of an atomic model.
    ///
    /// This is the callback invoked by the scheduling collaborator when a
    /// scheduled internal-transition event fires. It applies
    /// `delta_internal`, routes the values emitted by the output function
    /// and reschedules the model at its new internal-transition horizon, or
    /// lets it go passive when the new time advance is infinite.
    pub fn process_internal(&self, model: ModelId) -> Result<(), ExecutionError> {
        let slot = self
            .models
            .get(model.0)
            .ok_or(ExecutionError::ModelNotFound)?;
        let atomic = slot.kind.as_atomic().ok_or(ExecutionError::NotAtomic)?;
        let now = self.scheduler.now();

        let mut core = atomic.lock();
        core.behavior.delta_internal();
        let mut output = OutputBag::new();
        core.behavior.output(&mut output);
        core.last_event = now;
        core.conflict = false;
        // The event that triggered this callback is spent.
        core.pending = core
            .behavior
            .time_advance()
            .as_duration()
            .map(|advance| self.scheduler.schedule_internal(model, now + advance));
        let report = core.behavior.state_fields();
        drop(core);

        self.notify_state(slot, report);

        for (port_name, value) in output.into_items() {
            let &port = slot
                .ports
                .get(port_name.as_str())
                .ok_or(ExecutionError::PortNotFound)?;
            let port_ref = &self.ports[port.0];
            if port_ref.kind() != PortKind::Output {
                return Err(ExecutionError::NotAnOutputPort);
            }
            if !port_ref.accepts(&*value) {
                return Err(ExecutionError::PayloadTypeMismatch);
            }
            self.route_output(port, &*value, now)?;
        }

        Ok(())
    }

    /// Requests a fresh internal-transition event for an atomic model at
    /// `time_last_event + time_advance()`, replacing any pending one.
    ///
    /// Returns the scheduled deadline, or `None` when the model is passive.
    /// The external-transition contract cancels a superseded event without
    /// rescheduling; a simulation driver calls this method when it wants a
    /// model to resume its own internal-transition schedule.
    pub fn rearm_internal(&self, model: ModelId) -> Result<Option<MonotonicTime>, ExecutionError> {
        let slot = self
            .models
            .get(model.0)
            .ok_or(ExecutionError::ModelNotFound)?;
        let atomic = slot.kind.as_atomic().ok_or(ExecutionError::NotAtomic)?;

        let mut core = atomic.lock();
        if let Some(key) = core.pending.take() {
            self.scheduler.cancel(key);
        }
        let deadline = core.behavior.time_advance().deadline(core.last_event);
        if let Some(at) = deadline {
            core.pending = Some(self.scheduler.schedule_internal(model, at));
        }

        Ok(deadline)
    }

    /// Returns the internal-transition horizon of an atomic model, or
    /// `None` when the model is passive.
    pub fn next_internal(&self, model: ModelId) -> Result<Option<MonotonicTime>, ExecutionError> {
        let slot = self
            .models
            .get(model.0)
            .ok_or(ExecutionError::ModelNotFound)?;
        let atomic = slot.kind.as_atomic().ok_or(ExecutionError::NotAtomic)?;

        let core = atomic.lock();
        Ok(core.behavior.time_advance().deadline(core.last_event))
    }

    /// External/confluent transition entry point, per the DEVS contract.
    fn apply_external(
        &self,
        slot: &ModelSlot,
        atomic: &AtomicSlot,
        port_name: &str,
        value: &dyn Message,
        time: MonotonicTime,
    ) -> Result<(), ExecutionError> {
        // Busy marker: a concurrent delivery blocks here until the in-flight
        // transition releases it.
        let mut core = atomic.lock();

        if time < core.last_event {
            error!(
                model = %slot.full_name,
                "time synchronization problem: event delivered before the last applied transition"
            );
            return Err(ExecutionError::TimeSynchronization {
                model: slot.full_name.to_string(),
                time,
                horizon: core.last_event,
            });
        }
        let elapsed = time.duration_since(core.last_event);
        match core.behavior.time_advance().as_duration() {
            Some(advance) if elapsed > advance => {
                error!(
                    model = %slot.full_name,
                    "time synchronization problem: event delivered past the internal-transition horizon"
                );
                return Err(ExecutionError::TimeSynchronization {
                    model: slot.full_name.to_string(),
                    time,
                    horizon: core.last_event + advance,
                });
            }
            // A genuine tie requires a scheduled internal transition to tie
            // with.
            Some(advance) => {
                core.conflict = elapsed == advance && !elapsed.is_zero() && core.pending.is_some();
            }
            None => core.conflict = false,
        }

        // The transition about to be applied supersedes the pending internal
        // event; the guard cancels it on every exit path.
        let mut superseded = CancelGuard::new(&*self.scheduler, core.pending.take());

        if core.conflict {
            core.behavior.delta_confluent(elapsed, port_name, value);
        } else {
            core.behavior.delta_external(elapsed, port_name, value);
        }
        core.last_event = time;
        superseded.cancel_now();

        let report = core.behavior.state_fields();
        drop(core);

        self.notify_state(slot, report);
        Ok(())
    }

    /// Routes a value emitted from an output port: internal couplings
    /// deliver to sibling inputs, external output couplings forward to the
    /// parent's own output ports, recursively. At the root the value is
    /// dropped.
    fn route_output(
        &self,
        port: PortId,
        value: &dyn Message,
        time: MonotonicTime,
    ) -> Result<(), ExecutionError> {
        let port_ref = self.ports.get(port.0).ok_or(ExecutionError::PortNotFound)?;
        let owner = self
            .models
            .get(port_ref.owner().0)
            .ok_or(ExecutionError::ModelNotFound)?;
        let parent = match owner.parent {
            Some(parent) => parent,
            None => return Ok(()),
        };
        let coupled = self.models[parent.0]
            .kind
            .as_coupled()
            .expect(BROKEN_HIERARCHY);

        for coupling in coupled.internal_from(port) {
            self.receive(coupling.to_port(), value, time)?;
        }
        for coupling in coupled.external_output_from(port) {
            self.route_output(coupling.to_port(), value, time)?;
        }

        Ok(())
    }

    /// Broadcasts one "state updated" notification per reported field.
    ///
    /// Subscriptions whose observer reports a gone receiving end are
    /// dropped; the triggering transition is unaffected.
    fn notify_state(&self, slot: &ModelSlot, report: Vec<StateField>) {
        if report.is_empty() {
            return;
        }
        let updates: Vec<StateUpdate> = report
            .into_iter()
            .map(|field| {
                let (name, value) = field.into_parts();
                StateUpdate::new(slot.full_name.clone(), name, value)
            })
            .collect();

        let mut observers = slot
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        observers.retain(|entry| {
            for update in &updates {
                if let Err(err) = entry.observer.state_updated(update) {
                    warn!(
                        model = %slot.full_name,
                        subscription = ?entry.id,
                        error = %err,
                        "dropping state subscription"
                    );
                    return false;
                }
            }
            true
        });
    }

    fn model(&self, model: ModelId) -> Result<&ModelSlot, StructureError> {
        self.models.get(model.0).ok_or(StructureError::ModelNotFound)
    }

    fn coupled(&self, model: ModelId) -> Result<&CoupledSlot, StructureError> {
        self.model(model)?
            .kind
            .as_coupled()
            .ok_or(StructureError::NotACoupledModel)
    }

    /// Validates a mount point and computes the new model's full name and
    /// inherited subscriptions.
    fn prepare_mount(
        &self,
        name: &str,
        parent: Option<ModelId>,
    ) -> Result<(Arc<str>, Vec<ObserverEntry>), StructureError> {
        if name.is_empty() || name.contains('.') {
            return Err(StructureError::InvalidName);
        }

        match parent {
            Some(parent) => {
                let slot = self
                    .models
                    .get(parent.0)
                    .ok_or(StructureError::ModelNotFound)?;
                let coupled = slot
                    .kind
                    .as_coupled()
                    .ok_or(StructureError::NotACoupledModel)?;
                for &child in coupled.children() {
                    if self.models[child.0].name == name {
                        return Err(StructureError::DuplicateModelName);
                    }
                }
                let full_name = format!("{}.{}", slot.full_name, name);
                let observers = slot
                    .observers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();

                Ok((Arc::from(full_name), observers))
            }
            None => {
                for (_, slot) in self.models.iter() {
                    if slot.parent.is_none() && slot.name == name {
                        return Err(StructureError::DuplicateModelName);
                    }
                }

                Ok((Arc::from(name), Vec::new()))
            }
        }
    }

    fn add_port<T: Message>(
        &mut self,
        model: ModelId,
        name: &str,
        kind: PortKind,
    ) -> Result<PortId, StructureError> {
        if name.is_empty() {
            return Err(StructureError::InvalidName);
        }
        let slot = self.model(model)?;
        if slot.ports.contains_key(name) {
            return Err(StructureError::DuplicatePortName);
        }

        let id = PortId(self.ports.insert(Port::new::<T>(name, model, kind)));
        self.models[model.0].ports.insert(name.to_owned(), id);

        Ok(id)
    }

    fn remove_port(
        &mut self,
        model: ModelId,
        name: &str,
        kind: PortKind,
    ) -> Result<(), StructureError> {
        let slot = self.model(model)?;
        let &port = slot.ports.get(name).ok_or(StructureError::PortNotFound)?;
        if self.ports[port.0].kind() != kind {
            return Err(StructureError::PortNotFound);
        }

        // Purge couplings referencing the port: in the owner's parent for
        // IC/EIC/EOC endpoints on the child side, and in the owner itself
        // for its own external couplings.
        if let Some(parent) = slot.parent {
            self.models[parent.0]
                .kind
                .as_coupled_mut()
                .expect(BROKEN_HIERARCHY)
                .purge_port(port);
        }
        if let Some(coupled) = self.models[model.0].kind.as_coupled_mut() {
            coupled.purge_port(port);
        }

        self.models[model.0].ports.remove(name);
        self.ports.remove(port.0);

        Ok(())
    }

    /// Returns a model and all of its descendants.
    fn collect_subtree(&self, root: ModelId) -> Vec<ModelId> {
        let mut subtree = vec![root];
        let mut next = 0;
        while next < subtree.len() {
            if let Some(coupled) = self.models[subtree[next].0].kind.as_coupled() {
                subtree.extend_from_slice(coupled.children());
            }
            next += 1;
        }

        subtree
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("models", &self.models.len())
            .field("ports", &self.ports.len())
            .finish_non_exhaustive()
    }
}

/// Error returned by structural operations.
///
/// A failed structural operation leaves the hierarchy unchanged.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StructureError {
    /// The model does not exist.
    ModelNotFound,
    /// The port does not exist on the model.
    PortNotFound,
    /// The operation requires a coupled model.
    NotACoupledModel,
    /// A sibling model with the same name already exists.
    DuplicateModelName,
    /// A port with the same name already exists on the model.
    DuplicatePortName,
    /// The name is empty or contains a path separator.
    InvalidName,
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelNotFound => f.write_str("the model does not exist"),
            Self::PortNotFound => f.write_str("the port does not exist on the model"),
            Self::NotACoupledModel => f.write_str("the operation requires a coupled model"),
            Self::DuplicateModelName => {
                f.write_str("a sibling model with the same name already exists")
            }
            Self::DuplicatePortName => {
                f.write_str("a port with the same name already exists on the model")
            }
            Self::InvalidName => f.write_str("the name is empty or contains a path separator"),
        }
    }
}

impl Error for StructureError {}

/// Error returned by event-delivery and transition operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExecutionError {
    /// The model does not exist.
    ModelNotFound,
    /// The operation requires an atomic model.
    NotAtomic,
    /// The port does not exist.
    PortNotFound,
    /// The port is not an input port.
    NotAnInputPort,
    /// The port is not an output port.
    NotAnOutputPort,
    /// The payload type does not match the port's value type.
    PayloadTypeMismatch,
    /// The scheduling contract was violated: an event was delivered beyond
    /// the model's internal-transition horizon.
    ///
    /// This indicates a bug in the scheduling collaborator or in a caller,
    /// not a data problem; no transition was applied.
    TimeSynchronization {
        /// Full name of the model the event was delivered to.
        model: String,
        /// Simulated time of the offending delivery.
        time: MonotonicTime,
        /// Latest simulated time at which the delivery would have been
        /// legal.
        horizon: MonotonicTime,
    },
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelNotFound => f.write_str("the model does not exist"),
            Self::NotAtomic => f.write_str("the operation requires an atomic model"),
            Self::PortNotFound => f.write_str("the port does not exist"),
            Self::NotAnInputPort => f.write_str("the port is not an input port"),
            Self::NotAnOutputPort => f.write_str("the port is not an output port"),
            Self::PayloadTypeMismatch => {
                f.write_str("the payload type does not match the port's value type")
            }
            Self::TimeSynchronization {
                model,
                time,
                horizon,
            } => write!(
                f,
                "time synchronization problem: model '{}' received an event at {:?} beyond its horizon {:?}",
                model, time, horizon
            ),
        }
    }
}

impl Error for ExecutionError {}
