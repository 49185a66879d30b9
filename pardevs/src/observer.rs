//! State-change notifications.
//!
//! After every applied transition, the engine broadcasts one
//! [`StateUpdate`] per state field declared by the transitioning atomic
//! model (see [`ReportsState`](crate::model::ReportsState)). Consumers
//! subscribe per individual model or per coupled-model subtree, in which
//! case the subscription transparently extends to all descendants,
//! including those added after the subscription was taken.
//!
//! The broadcast is strictly one-way: the engine never blocks on a
//! subscriber and a failing subscriber never affects the triggering
//! transition. When a subscriber reports that its receiving end is gone
//! ([`ObserverClosed`]), the engine logs the failure and drops that
//! subscription.
//!
//! Subscriptions are explicit resources: they are created by
//! [`Simulation::subscribe`](crate::simulation::Simulation::subscribe),
//! identified by a [`SubscriptionId`] and released with
//! [`Simulation::unsubscribe`](crate::simulation::Simulation::unsubscribe).
//!
//! The [`StateBuffer`] sink collects updates in a bounded FIFO buffer; its
//! writer half reports [`ObserverClosed`] once the buffer is dropped, so an
//! abandoned sink unsubscribes itself on the next notification.

mod state_buffer;

pub use state_buffer::{StateBuffer, StateBufferWriter};

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::ports::Message;

/// A "state updated" notification.
///
/// Carries the full hierarchical name of the transitioning model, the name
/// of the state field and its value after the transition.
#[derive(Clone, Debug)]
pub struct StateUpdate {
    model: Arc<str>,
    field: &'static str,
    value: Box<dyn Message>,
}

impl StateUpdate {
    pub(crate) fn new(model: Arc<str>, field: &'static str, value: Box<dyn Message>) -> Self {
        Self {
            model,
            field,
            value,
        }
    }

    /// Returns the full hierarchical name of the model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the name of the state field.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Returns the value of the state field after the transition.
    pub fn value(&self) -> &dyn Message {
        &*self.value
    }
}

/// A consumer of state-change notifications.
pub trait StateObserver: Send + Sync {
    /// Delivers one notification.
    ///
    /// Returning [`ObserverClosed`] signals that the receiving end is gone;
    /// the engine then drops the subscription. The triggering transition
    /// completes normally either way.
    fn state_updated(&self, update: &StateUpdate) -> Result<(), ObserverClosed>;
}

/// Error reported by an observer whose receiving end is gone.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ObserverClosed;

impl fmt::Display for ObserverClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the observer's receiving end is gone")
    }
}

impl Error for ObserverClosed {}

/// Handle identifying a state subscription.
///
/// A subscription taken on a coupled model is propagated to its whole
/// subtree under a single identifier; releasing the identifier releases all
/// of it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
