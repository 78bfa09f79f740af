//! In-process event bus (single instance, no persistence).

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use pipeboard_core::OrganizationId;

use crate::bus::{BusError, Callback, DeliveryError, EventBus, Subscription};
use crate::topic::OrganizationScoped;

type SharedCallback<M> = Arc<dyn Fn(&M) -> Result<(), DeliveryError> + Send + Sync>;

struct Registry<M> {
    next_id: u64,
    topics: HashMap<OrganizationId, BTreeMap<u64, SharedCallback<M>>>,
}

impl<M> Registry<M> {
    fn remove(&mut self, topic: OrganizationId, id: u64) -> bool {
        let Some(subscribers) = self.topics.get_mut(&topic) else {
            return false;
        };
        let removed = subscribers.remove(&id).is_some();
        if subscribers.is_empty() {
            self.topics.remove(&topic);
        }
        removed
    }
}

/// In-memory pub/sub bus keyed by organization.
///
/// - No IO / no async
/// - Callbacks run on the publisher's thread, outside the registry lock
/// - A failing or panicking callback only affects its own subscriber
/// - Subscribers reporting [`DeliveryError::Closed`] are dropped while publishing
pub struct InMemoryEventBus<M> {
    registry: Arc<Mutex<Registry<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live registrations for `topic`.
    pub fn subscriber_count(&self, topic: OrganizationId) -> usize {
        self.registry
            .lock()
            .map(|reg| reg.topics.get(&topic).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.registry.lock().map(|reg| reg.topics.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                topics: HashMap::new(),
            })),
        }
    }
}

impl<M> core::fmt::Debug for InMemoryEventBus<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("topics", &self.topic_count())
            .finish()
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: OrganizationScoped + Send + 'static,
{
    fn publish(&self, message: M) -> Result<(), BusError> {
        let topic = message.organization_id();

        // Snapshot, then deliver without holding the lock so callbacks may
        // subscribe/unsubscribe freely.
        let targets: Vec<(u64, SharedCallback<M>)> = {
            let reg = self.registry.lock().map_err(|_| BusError::Poisoned)?;
            match reg.topics.get(&topic) {
                Some(subscribers) => subscribers.iter().map(|(id, cb)| (*id, cb.clone())).collect(),
                None => Vec::new(),
            }
        };

        let mut delivered = 0usize;
        let mut closed = Vec::new();
        for (id, callback) in &targets {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&message))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(DeliveryError::Closed)) => closed.push(*id),
                Ok(Err(err)) => {
                    tracing::warn!(organization_id = %topic, subscriber = *id, error = %err, "delivery failed");
                }
                Err(_) => {
                    tracing::warn!(organization_id = %topic, subscriber = *id, "subscriber panicked during delivery");
                }
            }
        }

        if !closed.is_empty() {
            let mut reg = self.registry.lock().map_err(|_| BusError::Poisoned)?;
            for id in closed {
                reg.remove(topic, id);
            }
        }

        tracing::debug!(organization_id = %topic, subscribers = targets.len(), delivered, "published");
        Ok(())
    }

    fn subscribe(&self, topic: OrganizationId, callback: Callback<M>) -> Subscription {
        let id = match self.registry.lock() {
            Ok(mut reg) => {
                let id = reg.next_id;
                reg.next_id += 1;
                reg.topics.entry(topic).or_default().insert(id, Arc::from(callback));
                id
            }
            Err(_) => {
                tracing::warn!(organization_id = %topic, "subscriber registry poisoned; subscription is inert");
                return Subscription::detached(topic);
            }
        };
        tracing::debug!(organization_id = %topic, subscriber = id, "subscribed");

        let registry: Weak<Mutex<Registry<M>>> = Arc::downgrade(&self.registry);
        Subscription::new(topic, move || {
            if let Some(registry) = registry.upgrade() {
                if let Ok(mut reg) = registry.lock() {
                    reg.remove(topic, id);
                }
            }
        })
    }
}
