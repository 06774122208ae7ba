//! Route conflict resolution and history maintenance.
//!
//! [`RouteManager`] is the single place that writes to the route registry.
//! It keeps at most one current route per `(path, locale)` and turns retired
//! paths into history routes redirecting to the entity's current route.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::route::{EntityRef, Route, RouteRepository};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Highest numeric suffix tried by [`RouteConflictPolicy::AutoIncrement`].
pub const MAX_AUTO_INCREMENT: u32 = 100;

/// Maximum number of history hops followed by [`RouteManager::resolve`].
pub const MAX_REDIRECT_DEPTH: usize = 16;

// ---------------------------------------------------------------------------
// RouteConflictPolicy
// ---------------------------------------------------------------------------

/// What to do when a candidate path is owned by another entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteConflictPolicy {
    /// Fail with [`CoreError::RouteConflict`].
    #[default]
    Reject,
    /// Append `-1`, `-2`, … until the path is free.
    AutoIncrement,
}

impl RouteConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::AutoIncrement => "auto_increment",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "reject" => Ok(Self::Reject),
            "auto_increment" => Ok(Self::AutoIncrement),
            _ => Err(CoreError::Validation(format!(
                "Invalid route conflict policy: '{s}'. Must be one of: reject, auto_increment"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// RouteManager
// ---------------------------------------------------------------------------

/// Creates, reallocates and removes routes.
#[derive(Clone)]
pub struct RouteManager {
    repo: Arc<dyn RouteRepository>,
}

impl RouteManager {
    pub fn new(repo: Arc<dyn RouteRepository>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Arc<dyn RouteRepository> {
        &self.repo
    }

    /// Whether `entity` may take `path` in `locale`.
    ///
    /// Free paths, history routes and routes already owned by the entity are
    /// all available.
    pub async fn is_available(
        &self,
        entity: &EntityRef,
        locale: &str,
        path: &str,
    ) -> Result<bool, CoreError> {
        self.is_available_in_group(entity, &[], locale, path).await
    }

    /// Like [`is_available`](Self::is_available), but current routes owned
    /// by a member of `group` also count as available.
    pub async fn is_available_in_group(
        &self,
        entity: &EntityRef,
        group: &[EntityRef],
        locale: &str,
        path: &str,
    ) -> Result<bool, CoreError> {
        Ok(match self.repo.find_by_path(path, locale).await? {
            None => true,
            Some(route) => {
                route.history || route.entity == *entity || group.contains(&route.entity)
            }
        })
    }

    /// Return a path `entity` may use, applying `policy` on conflict.
    pub async fn ensure_available(
        &self,
        entity: &EntityRef,
        locale: &str,
        path: &str,
        policy: RouteConflictPolicy,
    ) -> Result<String, CoreError> {
        self.ensure_available_in_group(entity, &[], locale, path, policy)
            .await
    }

    /// [`ensure_available`](Self::ensure_available) for one member of a
    /// group whose paths may be exchanged among each other, such as the
    /// pages of one article.
    pub async fn ensure_available_in_group(
        &self,
        entity: &EntityRef,
        group: &[EntityRef],
        locale: &str,
        path: &str,
        policy: RouteConflictPolicy,
    ) -> Result<String, CoreError> {
        if self.is_available_in_group(entity, group, locale, path).await? {
            return Ok(path.to_string());
        }

        if policy == RouteConflictPolicy::AutoIncrement {
            for i in 1..=MAX_AUTO_INCREMENT {
                let candidate = format!("{path}-{i}");
                if self
                    .is_available_in_group(entity, group, locale, &candidate)
                    .await?
                {
                    return Ok(candidate);
                }
            }
        }

        Err(CoreError::RouteConflict {
            path: path.to_string(),
            locale: locale.to_string(),
        })
    }

    /// Make `path` the current route of `entity` in `locale`.
    ///
    /// Idempotent when the entity already owns the path. A history route at
    /// the path is reallocated. The previous current route becomes history
    /// and every history route that redirected to it is moved over to the
    /// new route.
    pub async fn create_or_update(
        &self,
        entity: &EntityRef,
        locale: &str,
        path: &str,
        policy: RouteConflictPolicy,
    ) -> Result<Route, CoreError> {
        let path = self.ensure_available(entity, locale, path, policy).await?;
        let current = self.repo.find_by_entity(entity, locale).await?;

        if let Some(current) = &current {
            if current.path == path {
                return Ok(current.clone());
            }
        }

        let route = match self.repo.find_by_path(&path, locale).await? {
            Some(existing) if !existing.history && existing.entity == *entity => {
                // Already reallocated within this transaction.
                existing
            }
            Some(mut existing) => {
                tracing::debug!(path = %path, locale, entity = %entity, "Reallocating history route");
                existing.reallocate(entity.clone());
                self.repo.save(existing).await?
            }
            None => {
                self.repo
                    .save(Route::new(path.clone(), locale, entity.clone()))
                    .await?
            }
        };
        let route_id = route.require_id()?;

        if let Some(mut previous) = current {
            let previous_id = previous.require_id()?;
            for mut history in self.repo.find_history_by_target(previous_id).await? {
                if history.id == Some(route_id) {
                    continue;
                }
                history.retire(route_id);
                self.repo.save(history).await?;
            }
            previous.retire(route_id);
            self.repo.save(previous).await?;
        }

        tracing::debug!(path = %route.path, locale, entity = %entity, "Route assigned");
        Ok(route)
    }

    /// Assign new paths to a group of entities in one step.
    ///
    /// Members may take over each other's paths, e.g. when pages are
    /// renumbered. Every member whose path changes first releases its
    /// current route; each released route then redirects to its former
    /// owner's new route unless another member reallocated it.
    pub async fn reassign(
        &self,
        locale: &str,
        assignments: &[(EntityRef, String)],
        policy: RouteConflictPolicy,
    ) -> Result<Vec<Route>, CoreError> {
        let mut released = Vec::new();
        for (entity, path) in assignments {
            if let Some(mut current) = self.repo.find_by_entity(entity, locale).await? {
                if current.path != *path {
                    let id = current.require_id()?;
                    current.release();
                    self.repo.save(current).await?;
                    released.push((entity.clone(), id));
                }
            }
        }

        let mut routes = Vec::with_capacity(assignments.len());
        for (entity, path) in assignments {
            let route = self.create_or_update(entity, locale, path, policy).await?;
            let route_id = route.require_id()?;

            for (owner, old_id) in released.iter().filter(|(owner, _)| owner == entity) {
                for mut history in self.repo.find_history_by_target(*old_id).await? {
                    if history.entity == *owner && history.id != Some(route_id) {
                        history.retire(route_id);
                        self.repo.save(history).await?;
                    }
                }
            }
            routes.push(route);
        }

        // Released rows nobody reallocated redirect to their owner's new route.
        for (owner, old_id) in &released {
            let Some(target) = routes
                .iter()
                .find(|r| r.entity == *owner)
                .and_then(|r| r.id)
            else {
                continue;
            };
            for mut route in self.repo.find_all_by_entity(owner).await? {
                if route.id == Some(*old_id) && route.history && route.target.is_none() {
                    route.retire(target);
                    self.repo.save(route).await?;
                }
            }
        }

        tracing::debug!(locale, routes = routes.len(), "Routes reassigned");
        Ok(routes)
    }

    /// The current route of `entity` in `locale`.
    pub async fn current(
        &self,
        entity: &EntityRef,
        locale: &str,
    ) -> Result<Option<Route>, CoreError> {
        self.repo.find_by_entity(entity, locale).await
    }

    /// Remove every current and history route of `entity`, optionally
    /// limited to one locale. Returns the number of removed rows.
    pub async fn remove_for_entity(
        &self,
        entity: &EntityRef,
        locale: Option<&str>,
    ) -> Result<usize, CoreError> {
        let mut removed = 0;
        for route in self.repo.find_all_by_entity(entity).await? {
            if locale.is_some_and(|l| l != route.locale) {
                continue;
            }
            self.repo.remove(route.require_id()?).await?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Resolve `path` to the live route it addresses, following history
    /// redirects. Returns `None` for unknown paths and broken redirects.
    pub async fn resolve(&self, path: &str, locale: &str) -> Result<Option<Route>, CoreError> {
        let Some(mut route) = self.repo.find_by_path(path, locale).await? else {
            return Ok(None);
        };

        for _ in 0..MAX_REDIRECT_DEPTH {
            if !route.history {
                return Ok(Some(route));
            }
            let Some(target) = route.target else {
                return Ok(None);
            };
            let Some(next) = self.repo.find_by_entity(&route.entity, locale).await? else {
                return Ok(None);
            };
            if next.id != Some(target) {
                tracing::warn!(path = %route.path, locale, "History route target is stale");
            }
            route = next;
        }

        Ok(None)
    }

    /// Open a savepoint that a failing operation can return to.
    pub async fn savepoint(&self) -> Result<(), CoreError> {
        self.repo.savepoint().await
    }

    pub async fn release_savepoint(&self) -> Result<(), CoreError> {
        self.repo.release_savepoint().await
    }

    pub async fn rollback_to_savepoint(&self) -> Result<(), CoreError> {
        self.repo.rollback_to_savepoint().await
    }

    pub async fn flush(&self) -> Result<(), CoreError> {
        self.repo.flush().await
    }

    pub async fn rollback(&self) -> Result<(), CoreError> {
        self.repo.rollback().await
    }
}

impl std::fmt::Debug for RouteManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteManager").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::memory::MemoryRouteRepository;
    use crate::types::DocumentId;

    fn manager() -> (RouteManager, Arc<MemoryRouteRepository>) {
        let repo = Arc::new(MemoryRouteRepository::new());
        (RouteManager::new(repo.clone()), repo)
    }

    fn article() -> EntityRef {
        EntityRef::new("article", DocumentId::new_v4())
    }

    #[tokio::test]
    async fn creates_current_route() {
        let (manager, _) = manager();
        let entity = article();

        let route = manager
            .create_or_update(&entity, "de", "/articles/hello", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        assert_eq!(route.path, "/articles/hello");
        assert!(!route.history);
        assert_eq!(route.entity, entity);
    }

    #[tokio::test]
    async fn same_path_is_idempotent() {
        let (manager, repo) = manager();
        let entity = article();

        let first = manager
            .create_or_update(&entity, "de", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        let second = manager
            .create_or_update(&entity, "de", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn path_change_keeps_history_redirect() {
        let (manager, repo) = manager();
        let entity = article();

        manager
            .create_or_update(&entity, "de", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        let current = manager
            .create_or_update(&entity, "de", "/b", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        let old = repo.find_by_path("/a", "de").await.unwrap().unwrap();
        assert!(old.history);
        assert_eq!(old.target, current.id);

        let resolved = manager.resolve("/a", "de").await.unwrap().unwrap();
        assert_eq!(resolved.path, "/b");
    }

    #[tokio::test]
    async fn history_routes_migrate_to_new_current() {
        let (manager, repo) = manager();
        let entity = article();

        for path in ["/a", "/b", "/c"] {
            manager
                .create_or_update(&entity, "de", path, RouteConflictPolicy::Reject)
                .await
                .unwrap();
        }

        let current = repo.find_by_entity(&entity, "de").await.unwrap().unwrap();
        assert_eq!(current.path, "/c");
        for path in ["/a", "/b"] {
            let history = repo.find_by_path(path, "de").await.unwrap().unwrap();
            assert!(history.history);
            assert_eq!(history.target, current.id, "{path} should redirect to /c");
        }
    }

    #[tokio::test]
    async fn returning_to_old_path_reallocates_history_row() {
        let (manager, repo) = manager();
        let entity = article();

        let first = manager
            .create_or_update(&entity, "de", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        manager
            .create_or_update(&entity, "de", "/b", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        let back = manager
            .create_or_update(&entity, "de", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        assert_eq!(back.id, first.id);
        assert!(!back.history);
        let b = repo.find_by_path("/b", "de").await.unwrap().unwrap();
        assert!(b.history);
        assert_eq!(b.target, back.id);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn foreign_current_route_conflicts() {
        let (manager, _) = manager();
        manager
            .create_or_update(&article(), "de", "/articles/hello", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        let result = manager
            .create_or_update(&article(), "de", "/articles/hello", RouteConflictPolicy::Reject)
            .await;

        assert_matches!(result, Err(CoreError::RouteConflict { path, locale })
            if path == "/articles/hello" && locale == "de");
    }

    #[tokio::test]
    async fn same_path_in_other_locale_is_free() {
        let (manager, _) = manager();
        manager
            .create_or_update(&article(), "de", "/hello", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        let route = manager
            .create_or_update(&article(), "en", "/hello", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        assert_eq!(route.locale, "en");
    }

    #[tokio::test]
    async fn foreign_history_route_is_reallocated() {
        let (manager, _) = manager();
        let first = article();
        let second = article();

        manager
            .create_or_update(&first, "de", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        manager
            .create_or_update(&first, "de", "/b", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        let taken = manager
            .create_or_update(&second, "de", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        assert_eq!(taken.entity, second);
        assert!(!taken.history);
    }

    #[tokio::test]
    async fn auto_increment_finds_free_suffix() {
        let (manager, _) = manager();
        manager
            .create_or_update(&article(), "de", "/hello", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        manager
            .create_or_update(&article(), "de", "/hello-1", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        let path = manager
            .ensure_available(&article(), "de", "/hello", RouteConflictPolicy::AutoIncrement)
            .await
            .unwrap();
        assert_eq!(path, "/hello-2");
    }

    #[tokio::test]
    async fn group_members_may_share_paths_during_checks() {
        let (manager, _) = manager();
        let first = EntityRef::new("article_page", DocumentId::new_v4());
        let second = EntityRef::new("article_page", DocumentId::new_v4());
        manager
            .create_or_update(&first, "de", "/a/page-2", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        let group = [first.clone(), second.clone()];
        let path = manager
            .ensure_available_in_group(&second, &group, "de", "/a/page-2", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        assert_eq!(path, "/a/page-2");
        assert_matches!(
            manager
                .ensure_available(&second, "de", "/a/page-2", RouteConflictPolicy::Reject)
                .await,
            Err(CoreError::RouteConflict { .. })
        );
    }

    #[tokio::test]
    async fn reassign_swaps_paths_between_members() {
        let (manager, repo) = manager();
        let first = EntityRef::new("article_page", DocumentId::new_v4());
        let second = EntityRef::new("article_page", DocumentId::new_v4());
        manager
            .create_or_update(&first, "de", "/a/page-2", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        manager
            .create_or_update(&second, "de", "/a/page-3", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        let routes = manager
            .reassign(
                "de",
                &[
                    (second.clone(), "/a/page-2".to_string()),
                    (first.clone(), "/a/page-3".to_string()),
                ],
                RouteConflictPolicy::Reject,
            )
            .await
            .unwrap();

        assert_eq!(routes.len(), 2);
        let page_two = repo.find_by_path("/a/page-2", "de").await.unwrap().unwrap();
        let page_three = repo.find_by_path("/a/page-3", "de").await.unwrap().unwrap();
        assert_eq!(page_two.entity, second);
        assert!(!page_two.history);
        assert_eq!(page_three.entity, first);
        assert!(!page_three.history);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn reassign_to_free_path_leaves_redirect() {
        let (manager, repo) = manager();
        let page = EntityRef::new("article_page", DocumentId::new_v4());
        manager
            .create_or_update(&page, "de", "/a/page-3", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        let routes = manager
            .reassign(
                "de",
                &[(page.clone(), "/a/page-2".to_string())],
                RouteConflictPolicy::Reject,
            )
            .await
            .unwrap();

        let old = repo.find_by_path("/a/page-3", "de").await.unwrap().unwrap();
        assert!(old.history);
        assert_eq!(old.target, routes[0].id);
    }

    #[tokio::test]
    async fn remove_for_entity_limits_to_locale() {
        let (manager, repo) = manager();
        let entity = article();
        manager
            .create_or_update(&entity, "de", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        manager
            .create_or_update(&entity, "de", "/b", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        manager
            .create_or_update(&entity, "en", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        let removed = manager.remove_for_entity(&entity, Some("de")).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(repo.len().await, 1);

        manager.remove_for_entity(&entity, None).await.unwrap();
        assert_eq!(repo.len().await, 0);
    }

    #[tokio::test]
    async fn resolve_unknown_path_is_none() {
        let (manager, _) = manager();
        assert!(manager.resolve("/nope", "de").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rollback_to_savepoint_restores_previous_current_route() {
        let (manager, repo) = manager();
        let entity = article();
        let first = manager
            .create_or_update(&entity, "de", "/a", RouteConflictPolicy::Reject)
            .await
            .unwrap();

        manager.savepoint().await.unwrap();
        manager
            .create_or_update(&entity, "de", "/b", RouteConflictPolicy::Reject)
            .await
            .unwrap();
        manager.rollback_to_savepoint().await.unwrap();

        assert_eq!(manager.current(&entity, "de").await.unwrap(), Some(first));
        assert!(repo.find_by_path("/b", "de").await.unwrap().is_none());
    }

    #[test]
    fn policy_round_trip() {
        assert_eq!(
            RouteConflictPolicy::from_str("auto_increment").unwrap(),
            RouteConflictPolicy::AutoIncrement
        );
        assert!(RouteConflictPolicy::from_str("bogus").is_err());
        assert_eq!(RouteConflictPolicy::Reject.as_str(), "reject");
    }
}
