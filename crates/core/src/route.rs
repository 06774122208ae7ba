//! Route registry model and storage contract.
//!
//! One [`Route`] row exists per `(path, locale)`. At most one of them is a
//! current (non-history) route; history routes redirect to the current route
//! of the same entity through `target`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DocumentId, RouteId, Timestamp};

// ---------------------------------------------------------------------------
// EntityRef
// ---------------------------------------------------------------------------

/// The entity a route points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: DocumentId,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: DocumentId) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// A row of the route registry.
///
/// `id` is `None` until the row has been saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: Option<RouteId>,
    pub path: String,
    pub locale: String,
    pub entity: EntityRef,
    pub history: bool,
    pub target: Option<RouteId>,
    pub created: Timestamp,
}

impl Route {
    /// A new current route for `entity`.
    pub fn new(path: impl Into<String>, locale: impl Into<String>, entity: EntityRef) -> Self {
        Self {
            id: None,
            path: path.into(),
            locale: locale.into(),
            entity,
            history: false,
            target: None,
            created: chrono::Utc::now(),
        }
    }

    /// Saved routes always carry an id; this returns it or an internal error.
    pub fn require_id(&self) -> Result<RouteId, CoreError> {
        self.id.ok_or_else(|| {
            CoreError::Internal(format!("route '{}' has not been saved", self.path))
        })
    }

    /// Turn this route into a redirect to `target`.
    pub fn retire(&mut self, target: RouteId) {
        self.history = true;
        self.target = Some(target);
    }

    /// Turn this route into history without a redirect target yet.
    pub fn release(&mut self) {
        self.history = true;
        self.target = None;
    }

    /// Turn this route back into the current route of `entity`.
    pub fn reallocate(&mut self, entity: EntityRef) {
        self.entity = entity;
        self.history = false;
        self.target = None;
    }
}

// ---------------------------------------------------------------------------
// RouteRepository
// ---------------------------------------------------------------------------

/// Route storage seen through one transaction.
///
/// Writes stay pending until [`flush`](Self::flush) commits them or
/// [`rollback`](Self::rollback) discards them. Savepoints nest: each
/// [`savepoint`](Self::savepoint) is closed by exactly one
/// [`release_savepoint`](Self::release_savepoint) or
/// [`rollback_to_savepoint`](Self::rollback_to_savepoint).
#[async_trait]
pub trait RouteRepository: Send + Sync {
    /// The route stored for `(path, locale)`, current or history.
    async fn find_by_path(&self, path: &str, locale: &str) -> Result<Option<Route>, CoreError>;

    /// The current route of `entity` in `locale`.
    async fn find_by_entity(
        &self,
        entity: &EntityRef,
        locale: &str,
    ) -> Result<Option<Route>, CoreError>;

    /// All history routes of `entity` in `locale`.
    async fn find_history_by_entity(
        &self,
        entity: &EntityRef,
        locale: &str,
    ) -> Result<Vec<Route>, CoreError>;

    /// All history routes redirecting to `target`.
    async fn find_history_by_target(&self, target: RouteId) -> Result<Vec<Route>, CoreError>;

    /// Every route of `entity` in every locale.
    async fn find_all_by_entity(&self, entity: &EntityRef) -> Result<Vec<Route>, CoreError>;

    /// Insert the route when it has no id, update it otherwise.
    ///
    /// A `(path, locale)` pair held by another row fails with
    /// [`CoreError::RouteConflict`] and leaves the transaction usable.
    async fn save(&self, route: Route) -> Result<Route, CoreError>;

    async fn remove(&self, id: RouteId) -> Result<(), CoreError>;

    async fn savepoint(&self) -> Result<(), CoreError>;

    /// Undo the writes made since the innermost open savepoint and close it.
    async fn rollback_to_savepoint(&self) -> Result<(), CoreError>;

    /// Close the innermost open savepoint, keeping its writes.
    async fn release_savepoint(&self) -> Result<(), CoreError>;

    /// Commit pending writes.
    async fn flush(&self) -> Result<(), CoreError>;

    /// Discard pending writes.
    async fn rollback(&self) -> Result<(), CoreError>;
}

/// Hands out route transactions, one per request.
#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn begin(&self) -> Result<Arc<dyn RouteRepository>, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retire_and_reallocate() {
        let entity = EntityRef::new("article", DocumentId::new_v4());
        let mut route = Route::new("/articles/hello", "de", entity.clone());
        route.retire(7);
        assert!(route.history);
        assert_eq!(route.target, Some(7));

        let other = EntityRef::new("article", DocumentId::new_v4());
        route.reallocate(other.clone());
        assert!(!route.history);
        assert_eq!(route.target, None);
        assert_eq!(route.entity, other);
    }

    #[test]
    fn unsaved_route_has_no_id() {
        let route = Route::new("/a", "en", EntityRef::new("article", DocumentId::new_v4()));
        assert!(route.require_id().is_err());
    }
}
