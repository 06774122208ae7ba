//! Per-request domain event buffer.

use pressroom_core::CoreError;

use crate::bus::{DomainEvent, EventSink};

/// Collects the events of one request until it flushes.
#[derive(Debug, Default)]
pub struct DomainEventCollector {
    events: Vec<DomainEvent>,
}

impl DomainEventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&mut self, event: DomainEvent) {
        tracing::debug!(
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            "Domain event collected"
        );
        self.events.push(event);
    }

    pub fn events(&self) -> &[DomainEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the events recorded after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Hand the collected events to `sink` in recording order. Returns the
    /// number of dispatched events.
    pub async fn flush(&mut self, sink: &dyn EventSink) -> Result<usize, CoreError> {
        if self.events.is_empty() {
            return Ok(0);
        }
        let events = std::mem::take(&mut self.events);
        let count = events.len();
        sink.dispatch(events).await?;
        Ok(count)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
