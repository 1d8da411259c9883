//! Inbound message fan-out.
//!
//! Collaborators register an [`InboundSubscriber`] handle once and then
//! receive every message the host sends for the lifetime of the channel.
//! There is no removal operation: the original system accumulated sinks for
//! the process lifetime and this registry keeps that contract.

use std::sync::{Arc, Mutex};

use textlink_core::InboundMessage;
use tracing::warn;

/// A registered collaborator that receives every inbound message.
///
/// `deliver` is invoked synchronously on the reader loop's task, one
/// subscriber at a time, in registration order. Implementations should be
/// quick; anything long-running belongs on a task of its own.
///
/// Errors are logged and swallowed – a failing subscriber never blocks
/// delivery to the remaining ones, and nothing propagates back to the host.
pub trait InboundSubscriber: Send + Sync {
    fn deliver(&self, msg: &InboundMessage) -> anyhow::Result<()>;
}

/// Insertion-ordered set of subscriber handles.
///
/// The list is guarded by its own lock and snapshotted before each broadcast
/// so concurrent [`add`](SubscriberRegistry::add) calls never race with an
/// in-progress delivery.
#[derive(Default)]
pub struct SubscriberRegistry {
    inner: Mutex<Vec<Arc<dyn InboundSubscriber>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subscriber. No duplicate check; registering the same handle
    /// twice delivers every message twice.
    pub fn add(&self, subscriber: Arc<dyn InboundSubscriber>) {
        self.inner.lock().unwrap().push(subscriber);
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `msg` to every subscriber registered at the time of the call,
    /// in registration order.
    pub fn broadcast(&self, msg: &InboundMessage) {
        let snapshot: Vec<_> = self.inner.lock().unwrap().clone();
        for subscriber in snapshot {
            if let Err(e) = subscriber.deliver(msg) {
                warn!("subscriber failed to handle inbound message: {e:#}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
