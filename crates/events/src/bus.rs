//! Organization-scoped publish/subscribe abstraction (mechanics only).
//!
//! The bus is a direct fan-out: it keeps no queue and no history.
//!
//! - **Topic per organization**: a message goes to the subscribers of the
//!   organization it belongs to ([`crate::OrganizationScoped`]), nobody else.
//! - **At-most-once, best effort**: only subscribers registered at publish time
//!   receive a message. Late subscribers never see it.
//! - **Per-topic order**: messages published one after another by the same
//!   caller reach each subscriber in publish order.
//! - **Never blocks the publisher**: callbacks must enqueue and return. A
//!   subscriber whose buffer is full reports [`DeliveryError::Lagged`] and loses
//!   that message; other subscribers are unaffected.
//!
//! ```text
//! Mutation → Store (commit) → EventBus::publish → callback per subscriber
//!                                                   ├─ stream session A
//!                                                   └─ stream session B
//! ```
//!
//! A multi-instance deployment would put an external broker behind this same
//! trait; stream sessions and the mutation gateway only see `EventBus`.

use std::sync::{Arc, Mutex};

use pipeboard_core::OrganizationId;
use thiserror::Error;

/// Subscriber callback. Must not block.
pub type Callback<M> = Box<dyn Fn(&M) -> Result<(), DeliveryError> + Send + Sync>;

/// Why a single subscriber could not take a message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber's buffer is full; the message is dropped for it.
    #[error("subscriber buffer is full")]
    Lagged,

    /// The subscriber is gone; the bus may drop its registration.
    #[error("subscriber is closed")]
    Closed,

    #[error("delivery failed: {0}")]
    Other(String),
}

/// Bus-level failure (never caused by an individual subscriber).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The subscriber registry lock was poisoned.
    #[error("subscriber registry is poisoned")]
    Poisoned,
}

type Release = Box<dyn FnOnce() + Send>;

/// Handle for one registration on one topic.
///
/// `unsubscribe` may be called any number of times; only the first call does
/// anything. Dropping the handle unsubscribes, so a registration never
/// outlives its owner.
pub struct Subscription {
    topic: OrganizationId,
    release: Mutex<Option<Release>>,
}

impl Subscription {
    pub fn new(topic: OrganizationId, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            topic,
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// A handle with nothing to release (registration did not happen).
    pub fn detached(topic: OrganizationId) -> Self {
        Self {
            topic,
            release: Mutex::new(None),
        }
    }

    pub fn topic(&self) -> OrganizationId {
        self.topic
    }

    pub fn is_active(&self) -> bool {
        match self.release.lock() {
            Ok(slot) => slot.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    pub fn unsubscribe(&self) {
        let release = match self.release.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(release) = release {
            release();
            tracing::debug!(organization_id = %self.topic, "unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Organization-scoped event bus.
///
/// Implementations own their synchronization: `publish`, `subscribe` and
/// `Subscription::unsubscribe` may be called concurrently from any thread.
pub trait EventBus<M>: Send + Sync {
    /// Deliver `message` to every current subscriber of its organization.
    ///
    /// Zero subscribers is not an error. Individual subscriber failures are
    /// isolated and never surface here.
    fn publish(&self, message: M) -> Result<(), BusError>;

    /// Register `callback` for future messages of `topic`.
    fn subscribe(&self, topic: OrganizationId, callback: Callback<M>) -> Subscription;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    fn publish(&self, message: M) -> Result<(), BusError> {
        (**self).publish(message)
    }

    fn subscribe(&self, topic: OrganizationId, callback: Callback<M>) -> Subscription {
        (**self).subscribe(topic, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn unsubscribe_runs_release_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sub = Subscription::new(OrganizationId::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.is_active());
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        drop(sub);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        drop(Subscription::new(OrganizationId::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_handle_is_inert() {
        let sub = Subscription::detached(OrganizationId::new());
        assert!(!sub.is_active());
        sub.unsubscribe();
    }
}
