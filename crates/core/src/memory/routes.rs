use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::error::CoreError;
use crate::route::{EntityRef, Route, RouteRepository, RouteStore};
use crate::types::RouteId;

#[derive(Debug, Default)]
struct RouteState {
    routes: BTreeMap<RouteId, Route>,
    next_id: RouteId,
    flushes: usize,
}

/// Prior values of the rows a handle wrote, for undo.
#[derive(Debug, Default)]
struct Journal {
    entries: Vec<(RouteId, Option<Route>)>,
    savepoints: Vec<usize>,
}

/// Route registry held in a map.
///
/// Enforces the same `(path, locale)` uniqueness a database constraint
/// would: saving a second row for an occupied pair fails.
///
/// Every handle returned by [`begin`](RouteStore::begin) shares the map but
/// keeps its own undo journal. Writes are visible to all handles at once;
/// rollback restores the rows the handle touched.
#[derive(Debug, Default)]
pub struct MemoryRouteRepository {
    state: Arc<RwLock<RouteState>>,
    journal: Mutex<Journal>,
}

impl MemoryRouteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, current and history.
    pub async fn len(&self) -> usize {
        self.state.read().await.routes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All rows ordered by id.
    pub async fn all(&self) -> Vec<Route> {
        self.state.read().await.routes.values().cloned().collect()
    }

    pub async fn flush_count(&self) -> usize {
        self.state.read().await.flushes
    }

    /// Restore journal entries past `mark`, newest first.
    async fn undo_to(&self, journal: &mut Journal, mark: usize) {
        let mut state = self.state.write().await;
        for (id, previous) in journal.entries.drain(mark..).rev() {
            match previous {
                Some(route) => state.routes.insert(id, route),
                None => state.routes.remove(&id),
            };
        }
    }
}

#[async_trait]
impl RouteStore for MemoryRouteRepository {
    async fn begin(&self) -> Result<Arc<dyn RouteRepository>, CoreError> {
        Ok(Arc::new(Self {
            state: self.state.clone(),
            journal: Mutex::default(),
        }))
    }
}

#[async_trait]
impl RouteRepository for MemoryRouteRepository {
    async fn find_by_path(&self, path: &str, locale: &str) -> Result<Option<Route>, CoreError> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .values()
            .find(|r| r.path == path && r.locale == locale)
            .cloned())
    }

    async fn find_by_entity(
        &self,
        entity: &EntityRef,
        locale: &str,
    ) -> Result<Option<Route>, CoreError> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .values()
            .find(|r| !r.history && r.entity == *entity && r.locale == locale)
            .cloned())
    }

    async fn find_history_by_entity(
        &self,
        entity: &EntityRef,
        locale: &str,
    ) -> Result<Vec<Route>, CoreError> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .values()
            .filter(|r| r.history && r.entity == *entity && r.locale == locale)
            .cloned()
            .collect())
    }

    async fn find_history_by_target(&self, target: RouteId) -> Result<Vec<Route>, CoreError> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .values()
            .filter(|r| r.history && r.target == Some(target))
            .cloned()
            .collect())
    }

    async fn find_all_by_entity(&self, entity: &EntityRef) -> Result<Vec<Route>, CoreError> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .values()
            .filter(|r| r.entity == *entity)
            .cloned()
            .collect())
    }

    async fn save(&self, mut route: Route) -> Result<Route, CoreError> {
        let mut journal = self.journal.lock().await;
        let mut state = self.state.write().await;

        let occupied = state.routes.values().any(|r| {
            r.path == route.path && r.locale == route.locale && r.id != route.id
        });
        if occupied {
            return Err(CoreError::RouteConflict {
                path: route.path,
                locale: route.locale,
            });
        }

        let id = match route.id {
            Some(id) if state.routes.contains_key(&id) => id,
            Some(id) => {
                return Err(CoreError::NotFound {
                    entity: "route",
                    id: id.to_string(),
                })
            }
            None => {
                state.next_id += 1;
                state.next_id
            }
        };
        route.id = Some(id);
        let previous = state.routes.insert(id, route.clone());
        journal.entries.push((id, previous));
        Ok(route)
    }

    async fn remove(&self, id: RouteId) -> Result<(), CoreError> {
        let mut journal = self.journal.lock().await;
        if let Some(previous) = self.state.write().await.routes.remove(&id) {
            journal.entries.push((id, Some(previous)));
        }
        Ok(())
    }

    async fn savepoint(&self) -> Result<(), CoreError> {
        let mut journal = self.journal.lock().await;
        let mark = journal.entries.len();
        journal.savepoints.push(mark);
        Ok(())
    }

    async fn rollback_to_savepoint(&self) -> Result<(), CoreError> {
        let mut journal = self.journal.lock().await;
        let mark = journal
            .savepoints
            .pop()
            .ok_or_else(|| CoreError::Internal("no route savepoint is open".to_string()))?;
        self.undo_to(&mut journal, mark).await;
        Ok(())
    }

    async fn release_savepoint(&self) -> Result<(), CoreError> {
        let mut journal = self.journal.lock().await;
        journal
            .savepoints
            .pop()
            .ok_or_else(|| CoreError::Internal("no route savepoint is open".to_string()))?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), CoreError> {
        let mut journal = self.journal.lock().await;
        journal.entries.clear();
        journal.savepoints.clear();
        self.state.write().await.flushes += 1;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), CoreError> {
        let mut journal = self.journal.lock().await;
        self.undo_to(&mut journal, 0).await;
        journal.savepoints.clear();
        Ok(())
    }
}
