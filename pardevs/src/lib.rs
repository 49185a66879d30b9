//! A Parallel DEVS execution engine for hierarchical discrete-event system
//! models.
//!
//! Pardevs implements the Parallel DEVS formalism: systems are described as
//! a hierarchy of *atomic models* (leaf state machines) and *coupled models*
//! (structural containers), wired together through typed ports and coupling
//! relations and executed under a shared simulated-time clock.
//!
//! The engine deliberately does not own the event list that drives the
//! simulated clock: the decision of *when* each internal transition fires
//! belongs to an external scheduling collaborator, accessed through the
//! narrow [`schedule::Scheduler`] trait. The engine's job is everything
//! else: atomic-model transition semantics, the coupled-model structural
//! graph, and the message routing that moves values between models while
//! preserving the DEVS timing invariants.
//!
//! # A practical overview
//!
//! Working with the engine involves three distinct activities:
//!
//! 1. the design of atomic-model behaviors, by implementing the
//!    [`model::Atomic`] trait,
//! 2. the assembly of a model hierarchy, performed by mounting models and
//!    wiring their ports through coupling relations,
//! 3. the execution of the simulation, driven by a scheduling collaborator
//!    firing internal transitions and by external deliveries on input
//!    ports.
//!
//! ## Authoring atomic models
//!
//! An atomic model holds domain state and defines its dynamics with five
//! functions: a *time advance* (how long the current state lasts absent
//! input, possibly infinite for passive states), an *internal transition*
//! applied when that time expires, an *output function* emitting values at
//! internal transitions, an *external transition* applied when a value
//! arrives on an input port, and a *confluent transition* applied when an
//! arrival ties exactly with the scheduled internal transition.
//!
//! Models also declare their observable state explicitly through the
//! [`model::ReportsState`] trait; after every applied transition the engine
//! broadcasts one "state updated" notification per declared field.
//!
//! ## Assembling and observing a hierarchy
//!
//! Models are mounted into a [`simulation::Simulation`] and wired with the
//! three DEVS coupling kinds: internal couplings between sibling children,
//! external input couplings from a coupled model's own inputs down to child
//! inputs, and external output couplings from child outputs up to the
//! coupled model's own outputs. All wiring is checked when the coupling is
//! constructed: direction, payload type, hierarchy relation, and the ban on
//! coupling a model to itself.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use pardevs::model::{Atomic, OutputBag, ReportsState, StateField};
//! use pardevs::observer::StateBuffer;
//! use pardevs::ports::Message;
//! use pardevs::schedule::NoScheduler;
//! use pardevs::simulation::Simulation;
//! use pardevs::time::{MonotonicTime, TimeAdvance};
//!
//! // A single-server queue: jobs accumulate on arrival and complete one by
//! // one, each taking 5s of service.
//! struct Server {
//!     backlog: u64,
//! }
//!
//! impl ReportsState for Server {
//!     fn state_fields(&self) -> Vec<StateField> {
//!         vec![StateField::new("backlog", self.backlog)]
//!     }
//! }
//!
//! impl Atomic for Server {
//!     fn time_advance(&self) -> TimeAdvance {
//!         if self.backlog == 0 {
//!             TimeAdvance::INFINITY
//!         } else {
//!             TimeAdvance::new(Duration::from_secs(5))
//!         }
//!     }
//!
//!     fn delta_internal(&mut self) {
//!         self.backlog -= 1;
//!     }
//!
//!     fn output(&mut self, output: &mut OutputBag) {
//!         output.push("done", 1u64);
//!     }
//!
//!     fn delta_external(&mut self, _elapsed: Duration, _port: &str, value: &dyn Message) {
//!         if let Some(jobs) = value.downcast_ref::<u64>() {
//!             self.backlog += jobs;
//!         }
//!     }
//! }
//!
//! let mut simu = Simulation::new(Arc::new(NoScheduler::new()));
//!
//! // Mount a coupled "plant" containing the server.
//! let plant = simu.add_coupled("plant", None)?;
//! let server = simu.add_atomic(Server { backlog: 0 }, "server", Some(plant))?;
//! let jobs = simu.add_input_port::<u64>(server, "jobs")?;
//! let _done = simu.add_output_port::<u64>(server, "done")?;
//!
//! // Route the plant's own input down to the server.
//! let plant_jobs = simu.add_input_port::<u64>(plant, "jobs")?;
//! simu.add_external_input_coupling(plant_jobs, jobs)?;
//!
//! // Observe the whole plant subtree.
//! let mut updates = StateBuffer::new();
//! simu.subscribe(plant, Arc::new(updates.writer()))?;
//!
//! // Deliver two jobs to the plant, one second into the simulation.
//! let at = MonotonicTime::EPOCH + Duration::from_secs(1);
//! simu.receive(plant_jobs, &2u64, at)?;
//!
//! let update = updates.next().unwrap();
//! assert_eq!(update.model(), "plant.server");
//! assert_eq!(update.field(), "backlog");
//! assert_eq!(update.value().downcast_ref::<u64>(), Some(&2));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Driving a simulation
//!
//! A scheduling collaborator implements [`schedule::Scheduler`] and fires
//! each requested internal transition by calling
//! [`simulation::Simulation::process_internal`] at the scheduled time. The
//! engine requests scheduling when an atomic model is mounted and after
//! every internal transition; an external transition cancels the superseded
//! event, and drivers that want a model to resume its own schedule call
//! [`simulation::Simulation::rearm_internal`].
//!
//! # Timing and ordering guarantees
//!
//! For a single atomic model, transitions are applied in the order their
//! triggering calls acquire the model's busy marker, and at most one
//! transition is ever in flight. Deliveries may originate from independent
//! execution contexts: mutual exclusion is per atomic model, not global,
//! so models at the same simulated time may be processed in either order
//! unless the scheduling collaborator defines a tie-break.
//!
//! Simulated-time ties are resolved by exact equality. An external value
//! arriving exactly at a model's scheduled internal-transition time
//! triggers the confluent transition; a delivery beyond that horizon is a
//! fatal time-synchronization violation, surfaced as a distinct error and
//! never silently applied.

#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod coupling;
pub mod model;
pub mod observer;
pub mod ports;
pub mod schedule;
pub mod simulation;
pub mod time;
