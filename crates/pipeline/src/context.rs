//! Per-request state owned by a [`DocumentSession`](crate::session::DocumentSession).

use pressroom_core::route_manager::RouteManager;
use pressroom_core::types::DocumentId;
use pressroom_core::CoreError;
use pressroom_events::{DomainEventCollector, DomainEventType};

use crate::scheduler::IndexScheduler;

/// A copy whose domain event is recorded once the content store flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCopy {
    pub uuid: DocumentId,
    pub locale: String,
    pub source: Option<DocumentId>,
}

/// Buffer sizes at the start of an operation.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    events: usize,
    copies: usize,
    classifications: usize,
}

/// Buffers filled by subscribers and drained on flush, plus the request's
/// route transaction.
#[derive(Debug, Default)]
pub struct RequestContext {
    pub index: IndexScheduler,
    pub events: DomainEventCollector,
    pub copies: Vec<PendingCopy>,
    /// Persist classifications, pushed at pre-persist and popped once the
    /// draft write has happened.
    classifications: Vec<DomainEventType>,
    routes: Option<RouteManager>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context working in the given route transaction.
    pub fn with_routes(routes: RouteManager) -> Self {
        Self {
            routes: Some(routes),
            ..Self::default()
        }
    }

    /// The request's route transaction.
    pub fn routes(&self) -> Result<&RouteManager, CoreError> {
        self.routes
            .as_ref()
            .ok_or_else(|| CoreError::Internal("no route transaction is open".to_string()))
    }

    pub(crate) fn route_transaction(&self) -> Option<&RouteManager> {
        self.routes.as_ref()
    }

    pub(crate) fn set_routes(&mut self, routes: RouteManager) {
        self.routes = Some(routes);
    }

    pub(crate) fn take_routes(&mut self) -> Option<RouteManager> {
        self.routes.take()
    }

    pub fn push_classification(&mut self, event_type: DomainEventType) {
        self.classifications.push(event_type);
    }

    pub fn pop_classification(&mut self) -> Option<DomainEventType> {
        self.classifications.pop()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            events: self.events.len(),
            copies: self.copies.len(),
            classifications: self.classifications.len(),
        }
    }

    /// Forget what an operation that failed midway recorded. Index keys stay:
    /// they are re-read from the store on flush.
    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        self.events.truncate(checkpoint.events);
        self.copies.truncate(checkpoint.copies);
        self.classifications.truncate(checkpoint.classifications);
    }

    /// Whether a flush would do any work.
    pub fn has_pending_work(&self) -> bool {
        !self.index.is_empty() || !self.events.is_empty() || !self.copies.is_empty()
    }

    /// Drop all buffered work. The route transaction stays open.
    pub fn clear(&mut self) {
        self.index.clear();
        self.events.clear();
        self.copies.clear();
        self.classifications.clear();
    }
}
