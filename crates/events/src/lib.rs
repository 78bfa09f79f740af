//! Realtime board events and the organization-scoped event bus.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod topic;

pub use bus::{BusError, Callback, DeliveryError, EventBus, Subscription};
pub use event::{EventType, PipelineEvent};
pub use in_memory_bus::InMemoryEventBus;
pub use topic::OrganizationScoped;
