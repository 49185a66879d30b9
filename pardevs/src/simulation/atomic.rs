//! Per-instance bookkeeping of mounted atomic models.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::model::Atomic;
use crate::schedule::{EventKey, Scheduler};
use crate::time::MonotonicTime;

/// The engine-side slot of a mounted atomic model.
///
/// The mutex is the busy marker: it is held for the whole duration of a
/// transition and guarantees that at most one internal, external or
/// confluent transition is in flight for a given model at any instant.
pub(crate) struct AtomicSlot {
    core: Mutex<AtomicCore>,
}

/// The mutable state guarded by the busy marker.
pub(crate) struct AtomicCore {
    /// The model's transition functions and domain state.
    pub(crate) behavior: Box<dyn Atomic>,
    /// Simulated time of the most recently applied transition.
    pub(crate) last_event: MonotonicTime,
    /// Handle to the scheduled internal-transition event, if any.
    pub(crate) pending: Option<EventKey>,
    /// Set when an external event arrives exactly at the scheduled
    /// internal-transition time.
    pub(crate) conflict: bool,
}

impl AtomicSlot {
    pub(crate) fn new(
        behavior: Box<dyn Atomic>,
        mounted_at: MonotonicTime,
        pending: Option<EventKey>,
    ) -> Self {
        Self {
            core: Mutex::new(AtomicCore {
                behavior,
                last_event: mounted_at,
                pending,
                conflict: false,
            }),
        }
    }

    /// Acquires the busy marker, blocking while another transition is in
    /// flight.
    ///
    /// Poisoning is deliberately ignored: the busy marker is released on
    /// every path, panicking transition code included.
    pub(crate) fn lock(&self) -> MutexGuard<'_, AtomicCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn into_core(self) -> AtomicCore {
        self.core
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cancellation token for a superseded internal-transition event.
///
/// The wrapped event is cancelled with the scheduling collaborator exactly
/// once, on every exit path of the transition that superseded it.
pub(crate) struct CancelGuard<'a> {
    scheduler: &'a dyn Scheduler,
    key: Option<EventKey>,
}

impl<'a> CancelGuard<'a> {
    pub(crate) fn new(scheduler: &'a dyn Scheduler, key: Option<EventKey>) -> Self {
        Self { scheduler, key }
    }

    pub(crate) fn cancel_now(&mut self) {
        if let Some(key) = self.key.take() {
            self.scheduler.cancel(key);
        }
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        self.cancel_now();
    }
}
