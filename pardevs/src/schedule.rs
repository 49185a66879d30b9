//! Scheduling collaborator boundary.
//!
//! The engine does not own the event list that decides *when* internal
//! transitions fire: that responsibility belongs to an external scheduling
//! collaborator accessed through the narrow [`Scheduler`] trait. The engine
//! only ever:
//!
//! * requests an internal transition for a model at an absolute time,
//!   receiving an opaque [`EventKey`] in return,
//! * cancels a previously requested event when a newer transition supersedes
//!   it,
//! * reads the current simulated time.
//!
//! The collaborator must deliver each scheduled event by invoking
//! [`Simulation::process_internal`](crate::simulation::Simulation::process_internal)
//! at the requested time, and must honor a total order on timestamps. No
//! particular event-list data structure is prescribed.
//!
//! For benches that only exercise structure and external deliveries,
//! [`NoScheduler`] provides a no-op binding.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::simulation::ModelId;
use crate::time::MonotonicTime;

/// Opaque handle to a scheduled internal-transition event.
///
/// The handle is produced by the scheduling collaborator and passed back to
/// it verbatim for cancellation; the engine attaches no meaning to its value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EventKey(u64);

impl EventKey {
    /// Creates a key from a raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value of the key.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Interface to the external scheduling collaborator.
///
/// Implementations must be thread-safe: event delivery may originate from
/// independent execution contexts.
pub trait Scheduler: Send + Sync {
    /// Requests an internal transition for `model` at the absolute time `at`.
    fn schedule_internal(&self, model: ModelId, at: MonotonicTime) -> EventKey;

    /// Cancels a previously scheduled event.
    ///
    /// Cancelling an event that already fired or was already cancelled is a
    /// no-op.
    fn cancel(&self, key: EventKey);

    /// Returns the current simulated time.
    fn now(&self) -> MonotonicTime;
}

/// A scheduler binding that ignores all scheduling requests.
///
/// Useful for building and inspecting a model hierarchy, or for benches
/// driven purely by external deliveries. The simulated time is pinned to
/// [`MonotonicTime::EPOCH`].
pub struct NoScheduler {
    next_key: AtomicU64,
}

impl NoScheduler {
    /// Creates a new `NoScheduler`.
    pub fn new() -> Self {
        Self {
            next_key: AtomicU64::new(0),
        }
    }
}

impl Default for NoScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for NoScheduler {
    fn schedule_internal(&self, _model: ModelId, _at: MonotonicTime) -> EventKey {
        EventKey::new(self.next_key.fetch_add(1, Ordering::Relaxed))
    }

    fn cancel(&self, _key: EventKey) {}

    fn now(&self) -> MonotonicTime {
        MonotonicTime::EPOCH
    }
}

impl fmt::Debug for NoScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoScheduler").finish_non_exhaustive()
    }
}
