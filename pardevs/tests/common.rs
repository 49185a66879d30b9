//! Shared test helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use pardevs::schedule::{EventKey, Scheduler};
use pardevs::simulation::ModelId;
use pardevs::time::MonotonicTime;

/// Returns the timestamp `secs` seconds after the epoch.
pub fn secs(secs: u64) -> MonotonicTime {
    MonotonicTime::EPOCH + Duration::from_secs(secs)
}

/// Installs a terse subscriber so engine diagnostics show up in test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A scheduler double that records every request and lets tests move the
/// clock by hand.
pub struct RecordingScheduler {
    now: Mutex<MonotonicTime>,
    next_key: AtomicU64,
    scheduled: Mutex<Vec<(ModelId, MonotonicTime, EventKey)>>,
    cancelled: Mutex<Vec<EventKey>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::at(MonotonicTime::EPOCH)
    }

    pub fn at(now: MonotonicTime) -> Self {
        Self {
            now: Mutex::new(now),
            next_key: AtomicU64::new(0),
            scheduled: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub fn set_now(&self, now: MonotonicTime) {
        *self.now.lock().unwrap() = now;
    }

    /// Returns every `(time, key)` pair requested for the given model, in
    /// request order.
    pub fn scheduled_for(&self, model: ModelId) -> Vec<(MonotonicTime, EventKey)> {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _, _)| *m == model)
            .map(|&(_, at, key)| (at, key))
            .collect()
    }

    pub fn was_cancelled(&self, key: EventKey) -> bool {
        self.cancelled.lock().unwrap().contains(&key)
    }

    pub fn cancel_count(&self) -> usize {
        self.cancelled.lock().unwrap().len()
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule_internal(&self, model: ModelId, at: MonotonicTime) -> EventKey {
        let key = EventKey::new(self.next_key.fetch_add(1, Ordering::Relaxed));
        self.scheduled.lock().unwrap().push((model, at, key));
        key
    }

    fn cancel(&self, key: EventKey) {
        self.cancelled.lock().unwrap().push(key);
    }

    fn now(&self) -> MonotonicTime {
        *self.now.lock().unwrap()
    }
}
