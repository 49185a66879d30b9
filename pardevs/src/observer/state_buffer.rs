use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::{ObserverClosed, StateObserver, StateUpdate};

/// The shared data of a `StateBuffer`.
struct Inner {
    capacity: usize,
    buffer: Mutex<VecDeque<StateUpdate>>,
}

/// A bounded FIFO sink for state-change notifications.
///
/// If the maximum capacity is exceeded, older updates are overwritten.
/// Updates are returned in first-in-first-out order. Note that even if the
/// iterator returns `None`, it may still produce more items in the future
/// (in other words, it is not a
/// [`FusedIterator`](std::iter::FusedIterator)).
///
/// Dropping the buffer invalidates its writers: their next delivery reports
/// [`ObserverClosed`] and the engine drops the corresponding subscription.
pub struct StateBuffer {
    inner: Arc<Inner>,
}

impl StateBuffer {
    /// Default capacity when constructed with `new`.
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Creates a `StateBuffer` with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a `StateBuffer` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                buffer: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Returns a writer that can be subscribed as a state observer.
    pub fn writer(&self) -> StateBufferWriter {
        StateBufferWriter {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Iterator for StateBuffer {
    type Item = StateUpdate;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

impl Default for StateBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateBuffer").finish_non_exhaustive()
    }
}

/// The producer handle of a `StateBuffer`.
pub struct StateBufferWriter {
    inner: Weak<Inner>,
}

impl StateObserver for StateBufferWriter {
    fn state_updated(&self, update: &StateUpdate) -> Result<(), ObserverClosed> {
        let inner = self.inner.upgrade().ok_or(ObserverClosed)?;

        let mut buffer = inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if buffer.len() == inner.capacity {
            buffer.pop_front();
        }
        buffer.push_back(update.clone());

        Ok(())
    }
}

impl fmt::Debug for StateBufferWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateBufferWriter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(field: &'static str, value: u64) -> StateUpdate {
        StateUpdate::new(Arc::from("bench.model"), field, Box::new(value))
    }

    #[test]
    fn capacity_overwrites_oldest() {
        let mut buffer = StateBuffer::with_capacity(2);
        let writer = buffer.writer();

        writer.state_updated(&update("n", 1)).unwrap();
        writer.state_updated(&update("n", 2)).unwrap();
        writer.state_updated(&update("n", 3)).unwrap();

        assert_eq!(buffer.next().unwrap().value().downcast_ref::<u64>(), Some(&2));
        assert_eq!(buffer.next().unwrap().value().downcast_ref::<u64>(), Some(&3));
        assert!(buffer.next().is_none());
    }

    #[test]
    fn dropped_buffer_closes_writer() {
        let buffer = StateBuffer::new();
        let writer = buffer.writer();
        drop(buffer);

        assert_eq!(writer.state_updated(&update("n", 1)), Err(ObserverClosed));
    }
}
