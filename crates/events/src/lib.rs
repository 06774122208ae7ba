//! Pressroom domain events.
//!
//! - [`DomainEvent`]: the audit record of one article lifecycle transition.
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`EventSink`]: where buffered events go when a request flushes.
//! - [`DomainEventCollector`]: per-request buffer of recorded events.
//! - [`EventPersistence`]: background service that durably writes every
//!   event to the `domain_events` table.

pub mod bus;
pub mod persistence;
pub mod recorder;

pub use bus::{DomainEvent, DomainEventType, EventBus, EventSink};
pub use persistence::EventPersistence;
pub use recorder::DomainEventCollector;
