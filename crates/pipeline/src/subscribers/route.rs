//! Route maintenance.
//!
//! Draft documents carry a reserved path that is checked for availability
//! but not registered. Publishing registers the path as the document's
//! current route; the previous current route turns into a redirect. Pages
//! of one article are handled as a group so renumbering may swap paths.

use std::sync::Arc;

use async_trait::async_trait;
use pressroom_core::document::{ArticlePage, Document, Localized, PAGE_ENTITY_TYPE};
use pressroom_core::route::EntityRef;
use pressroom_core::route_generator::{ChainRouteGenerator, RouteContext, SchemaRouteGenerator};
use pressroom_core::route_manager::{RouteConflictPolicy, RouteManager};
use pressroom_core::store::ContentStore;
use pressroom_core::types::{DocumentId, Workspace};
use pressroom_core::CoreError;

use super::{child_pages, own_translation, PRIORITY_ROUTE};
use crate::context::RequestContext;
use crate::dispatcher::Subscriber;
use crate::event::{EventKind, LifecycleEvent};

/// Works in the route transaction of the request being dispatched.
pub struct RouteSubscriber {
    store: Arc<dyn ContentStore>,
    generator: ChainRouteGenerator,
    schema: Arc<SchemaRouteGenerator>,
    policy: RouteConflictPolicy,
}

impl RouteSubscriber {
    pub fn new(
        store: Arc<dyn ContentStore>,
        generator: ChainRouteGenerator,
        schema: Arc<SchemaRouteGenerator>,
        policy: RouteConflictPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            schema,
            policy,
        }
    }

    // -----------------------------------------------------------------------
    // Draft paths
    // -----------------------------------------------------------------------

    /// Generate and reserve the draft path of `document`.
    async fn reserve(
        &self,
        routes: &RouteManager,
        document: &mut Document,
        hint: Option<&str>,
        policy: RouteConflictPolicy,
    ) -> Result<(), CoreError> {
        if document.is_ghost() {
            return Ok(());
        }

        let entity = document.routable().route_entity();
        let locale = document.locale().to_string();

        let path = match document.parent_id() {
            None => {
                let Some(generated) = self
                    .generator
                    .generate(document, &RouteContext::default(), hint)
                    .await?
                else {
                    tracing::warn!(uuid = %document.uuid(), "No route could be generated");
                    return Ok(());
                };
                let path = routes
                    .ensure_available(&entity, &locale, &generated.path, policy)
                    .await?;
                let binding = document
                    .as_article_mut()
                    .and_then(|a| a.page_tree.as_mut());
                if let (Some(suffix), Some(binding)) = (generated.suffix, binding) {
                    binding.suffix = Some(suffix);
                }
                path
            }
            Some(parent) => {
                let Some(parent_path) = self.parent_path(parent, &locale).await? else {
                    return Ok(());
                };
                let group = self.page_group(parent).await?;
                let context = RouteContext {
                    parent_path: Some(&parent_path),
                };
                let Some(generated) = self.generator.generate(document, &context, hint).await? else {
                    return Ok(());
                };
                routes
                    .ensure_available_in_group(&entity, &group, &locale, &generated.path, policy)
                    .await?
            }
        };

        document.routable_mut().set_route_path(path);
        Ok(())
    }

    /// Regenerate the draft paths of an article's pages below `article_path`
    /// and save the pages that changed.
    async fn reserve_pages(
        &self,
        routes: &RouteManager,
        article: DocumentId,
        article_path: &str,
        locale: &str,
        policy: RouteConflictPolicy,
    ) -> Result<(), CoreError> {
        let pages = child_pages(self.store.as_ref(), article, locale, Workspace::Draft).await?;
        let group = self.page_group(article).await?;

        for page in pages {
            let path = self.page_path(&page, article_path).await?;
            let path = routes
                .ensure_available_in_group(&page_entity(&page), &group, locale, &path, policy)
                .await?;
            self.save_page_path(page, path, Workspace::Draft).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Registered routes
    // -----------------------------------------------------------------------

    /// Register the current route of a document being published.
    async fn register(
        &self,
        routes: &RouteManager,
        document: &mut Document,
    ) -> Result<(), CoreError> {
        if document.is_ghost() {
            return Ok(());
        }

        let context_path = match document.parent_id() {
            Some(parent) => self.parent_path(parent, document.locale()).await?,
            None => None,
        };
        let context = RouteContext {
            parent_path: context_path.as_deref(),
        };
        let hint = document.routable().route_path().map(str::to_string);
        let Some(generated) = self.generator.generate(document, &context, hint.as_deref()).await?
        else {
            tracing::warn!(uuid = %document.uuid(), "Publishing without a route");
            return Ok(());
        };

        let entity = document.routable().route_entity();
        let route = routes
            .create_or_update(&entity, document.locale(), &generated.path, self.policy)
            .await?;
        document.routable_mut().set_route_path(route.path.clone());

        if let Document::Article(article) = document {
            self.drop_stale_page_routes(routes, article.uuid).await?;
            self.assign_pages(
                routes,
                article.uuid,
                &route.path,
                &article.locale,
                Workspace::Draft,
            )
            .await?;
        }
        Ok(())
    }

    /// Live pages missing from the draft leave live with this publish;
    /// their routes go first so draft pages can take over the paths.
    async fn drop_stale_page_routes(
        &self,
        routes: &RouteManager,
        article: DocumentId,
    ) -> Result<(), CoreError> {
        let draft = self.store.children(article, Workspace::Draft).await?;
        for child in self.store.children(article, Workspace::Live).await? {
            if draft.contains(&child) {
                continue;
            }
            let removed = routes
                .remove_for_entity(&EntityRef::new(PAGE_ENTITY_TYPE, child), None)
                .await?;
            tracing::debug!(uuid = %child, parent = %article, removed, "Routes of stale page removed");
        }
        Ok(())
    }

    /// Register the routes of an article's pages below `article_path` in
    /// one step, saving the pages of `workspace` whose path changed.
    async fn assign_pages(
        &self,
        routes: &RouteManager,
        article: DocumentId,
        article_path: &str,
        locale: &str,
        workspace: Workspace,
    ) -> Result<(), CoreError> {
        let pages = child_pages(self.store.as_ref(), article, locale, workspace).await?;
        let mut assignments = Vec::with_capacity(pages.len());
        for page in &pages {
            assignments.push((page_entity(page), self.page_path(page, article_path).await?));
        }

        let assigned = routes.reassign(locale, &assignments, self.policy).await?;
        for (page, route) in pages.into_iter().zip(assigned) {
            self.save_page_path(page, route.path, workspace).await?;
        }
        Ok(())
    }

    /// Drop the routes of a document and its pages, optionally limited to
    /// one locale.
    async fn remove_routes(
        &self,
        routes: &RouteManager,
        document: &Document,
        locale: Option<&str>,
    ) -> Result<(), CoreError> {
        let id = document.uuid();
        let mut removed = routes
            .remove_for_entity(&document.routable().route_entity(), locale)
            .await?;

        if document.has_children() {
            let mut children = self.store.children(id, Workspace::Draft).await?;
            for child in self.store.children(id, Workspace::Live).await? {
                if !children.contains(&child) {
                    children.push(child);
                }
            }
            for child in children {
                removed += routes
                    .remove_for_entity(&EntityRef::new(PAGE_ENTITY_TYPE, child), locale)
                    .await?;
            }
        }

        tracing::debug!(uuid = %id, locale = ?locale, removed, "Routes removed");
        Ok(())
    }

    /// After a page left or moved, regenerate its siblings' paths.
    async fn refresh_siblings(
        &self,
        routes: &RouteManager,
        article: DocumentId,
        locale: &str,
        include_live: bool,
    ) -> Result<(), CoreError> {
        if !self.schema.page_routes_depend_on_order() {
            return Ok(());
        }

        if let Some(parent) = own_translation(self.store.as_ref(), article, locale, Workspace::Draft).await? {
            if let Some(path) = parent.routable().route_path() {
                self.reserve_pages(routes, article, path, locale, self.policy)
                    .await?;
            }
        }

        if include_live {
            if let Some(parent) = own_translation(self.store.as_ref(), article, locale, Workspace::Live).await? {
                if let Some(path) = parent.routable().route_path() {
                    self.assign_pages(routes, article, path, locale, Workspace::Live)
                        .await?;
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn parent_path(&self, parent: DocumentId, locale: &str) -> Result<Option<String>, CoreError> {
        Ok(own_translation(self.store.as_ref(), parent, locale, Workspace::Draft)
            .await?
            .and_then(|d| d.routable().route_path().map(str::to_string)))
    }

    /// Every page of `article` in either workspace. Members may take over
    /// each other's paths.
    async fn page_group(&self, article: DocumentId) -> Result<Vec<EntityRef>, CoreError> {
        let mut pages = self.store.children(article, Workspace::Draft).await?;
        for child in self.store.children(article, Workspace::Live).await? {
            if !pages.contains(&child) {
                pages.push(child);
            }
        }
        Ok(pages
            .into_iter()
            .map(|id| EntityRef::new(PAGE_ENTITY_TYPE, id))
            .collect())
    }

    async fn page_path(&self, page: &ArticlePage, article_path: &str) -> Result<String, CoreError> {
        let context = RouteContext {
            parent_path: Some(article_path),
        };
        let document = Document::Page(page.clone());
        self.generator
            .generate(&document, &context, None)
            .await?
            .map(|g| g.path)
            .ok_or_else(|| CoreError::Internal(format!("no route generated for page {}", page.uuid)))
    }

    async fn save_page_path(
        &self,
        mut page: ArticlePage,
        path: String,
        workspace: Workspace,
    ) -> Result<(), CoreError> {
        if page.route_path.as_deref() == Some(path.as_str()) {
            return Ok(());
        }
        tracing::debug!(uuid = %page.uuid, path = %path, workspace = %workspace, "Page route updated");
        page.route_path = Some(path);
        self.store.save(&page.into(), workspace).await
    }
}

fn page_entity(page: &ArticlePage) -> EntityRef {
    EntityRef::new(PAGE_ENTITY_TYPE, page.uuid)
}

#[async_trait]
impl Subscriber for RouteSubscriber {
    fn name(&self) -> &'static str {
        "route"
    }

    fn subscriptions(&self) -> Vec<(EventKind, i32)> {
        vec![
            (EventKind::Persist, PRIORITY_ROUTE),
            (EventKind::Publish, PRIORITY_ROUTE),
            (EventKind::Remove, PRIORITY_ROUTE),
            (EventKind::PostRemove, PRIORITY_ROUTE),
            (EventKind::RemoveLocale, PRIORITY_ROUTE),
            (EventKind::Copy, PRIORITY_ROUTE),
            (EventKind::CopyLocale, PRIORITY_ROUTE),
            (EventKind::Reorder, PRIORITY_ROUTE),
            (EventKind::Restore, PRIORITY_ROUTE),
            (EventKind::Flush, PRIORITY_ROUTE),
        ]
    }

    async fn on_event(
        &self,
        event: &mut LifecycleEvent,
        ctx: &mut RequestContext,
    ) -> Result<(), CoreError> {
        let routes = ctx.routes()?;
        let locale = event.locale().to_string();
        match event.kind() {
            EventKind::Persist => {
                let before = event.document.routable().route_path().map(str::to_string);
                let hint = event.route_hint.clone();
                self.reserve(routes, &mut event.document, hint.as_deref(), self.policy)
                    .await?;
                if let (Document::Article(article), Some(path)) =
                    (&event.document, event.document.routable().route_path())
                {
                    if !event.document.is_new() && before.as_deref() != Some(path) {
                        self.reserve_pages(routes, article.uuid, path, &locale, self.policy)
                            .await?;
                    }
                }
            }
            EventKind::Publish => self.register(routes, &mut event.document).await?,
            EventKind::Remove => self.remove_routes(routes, &event.document, None).await?,
            EventKind::RemoveLocale => {
                self.remove_routes(routes, &event.document, Some(&locale))
                    .await?
            }
            EventKind::PostRemove => {
                if let Some(parent) = event.document.parent_id() {
                    self.refresh_siblings(routes, parent, &locale, true).await?;
                }
            }
            EventKind::Reorder => {
                if let Some(parent) = event.document.parent_id() {
                    self.refresh_siblings(routes, parent, &locale, false).await?;
                }
            }
            EventKind::Copy | EventKind::CopyLocale => {
                let policy = RouteConflictPolicy::AutoIncrement;
                self.reserve(routes, &mut event.document, None, policy).await?;
                if let (Document::Article(article), Some(path)) =
                    (&event.document, event.document.routable().route_path())
                {
                    self.reserve_pages(routes, article.uuid, path, &locale, policy)
                        .await?;
                }
            }
            EventKind::Restore => {
                let hint = event.document.routable().route_path().map(str::to_string);
                self.reserve(routes, &mut event.document, hint.as_deref(), self.policy)
                    .await?;
                if let (Document::Article(article), Some(path)) =
                    (&event.document, event.document.routable().route_path())
                {
                    self.reserve_pages(routes, article.uuid, path, &locale, self.policy)
                        .await?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn on_flush(&self, ctx: &mut RequestContext) -> Result<(), CoreError> {
        match ctx.route_transaction() {
            Some(routes) => routes.flush().await,
            None => Ok(()),
        }
    }
}
