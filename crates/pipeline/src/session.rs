//! Document operations of one request.
//!
//! A [`DocumentSession`] drives every write through the subscriber chain
//! and buffers index and domain event work until [`flush`](DocumentSession::flush).
//! Route writes go to a transaction of its own. Each operation runs inside
//! a route savepoint: when it fails, its route writes and recorded events
//! are undone while earlier operations of the session stay pending.
//! Dropping a session without flushing discards the buffered work; the
//! content store keeps whatever was already written.

use pressroom_core::document::{Document, DocumentKind, LocalizationState, Localized};
use pressroom_core::route::Route;
use pressroom_core::route_manager::RouteManager;
use pressroom_core::store::ContentStore;
use pressroom_core::types::{DocumentId, Workspace};
use pressroom_core::CoreError;

use crate::context::{Checkpoint, RequestContext};
use crate::event::{EventKind, LifecycleEvent};
use crate::pipeline::ContentPipeline;

pub struct DocumentSession<'a> {
    pipeline: &'a ContentPipeline,
    ctx: RequestContext,
}

impl<'a> DocumentSession<'a> {
    pub(crate) fn new(pipeline: &'a ContentPipeline) -> Self {
        Self {
            pipeline,
            ctx: RequestContext::new(),
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub(crate) fn store(&self) -> &'a dyn ContentStore {
        self.pipeline.store().as_ref()
    }

    async fn dispatch(&mut self, event: &mut LifecycleEvent) -> Result<(), CoreError> {
        self.pipeline.dispatcher().dispatch(event, &mut self.ctx).await
    }

    /// The session's route transaction, begun on first use.
    async fn routes(&mut self) -> Result<RouteManager, CoreError> {
        if let Some(routes) = self.ctx.route_transaction() {
            return Ok(routes.clone());
        }
        let routes = RouteManager::new(self.pipeline.route_store().begin().await?);
        self.ctx.set_routes(routes.clone());
        Ok(routes)
    }

    async fn begin_operation(&mut self) -> Result<Checkpoint, CoreError> {
        self.routes().await?.savepoint().await?;
        Ok(self.ctx.checkpoint())
    }

    /// Keep the operation's work, or undo it when `result` is an error.
    async fn end_operation<T>(
        &mut self,
        checkpoint: Checkpoint,
        result: Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let routes = self.routes().await?;
        match result {
            Ok(value) => {
                routes.release_savepoint().await?;
                Ok(value)
            }
            Err(err) => {
                self.ctx.rewind(checkpoint);
                match routes.rollback_to_savepoint().await {
                    Ok(()) => {
                        tracing::debug!(error = %err, "Route writes of failed operation undone")
                    }
                    Err(undo) => tracing::error!(
                        error = %err,
                        undo_error = %undo,
                        "Route writes of failed operation could not be undone"
                    ),
                }
                Err(err)
            }
        }
    }

    /// Load `id` in `locale`, failing when the node does not exist.
    async fn load(
        &self,
        id: DocumentId,
        locale: &str,
        workspace: Workspace,
    ) -> Result<Document, CoreError> {
        self.store()
            .find(id, locale, workspace)
            .await?
            .ok_or_else(|| CoreError::document_not_found(id))
    }

    /// Like [`load`](Self::load), but ghosts count as missing.
    async fn load_own(
        &self,
        id: DocumentId,
        locale: &str,
        workspace: Workspace,
    ) -> Result<Document, CoreError> {
        let document = self.load(id, locale, workspace).await?;
        if document.is_ghost() {
            return Err(CoreError::NotFound {
                entity: "translation",
                id: format!("{id}/{locale}"),
            });
        }
        Ok(document)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find(
        &self,
        id: DocumentId,
        locale: &str,
        workspace: Workspace,
    ) -> Result<Option<Document>, CoreError> {
        self.store().find(id, locale, workspace).await
    }

    /// Resolve `path` as this session sees the route registry, following
    /// history redirects.
    pub async fn resolve(&mut self, path: &str, locale: &str) -> Result<Option<Route>, CoreError> {
        self.routes().await?.resolve(path, locale).await
    }

    // -----------------------------------------------------------------------
    // Persist
    // -----------------------------------------------------------------------

    /// Create or update the draft of `document` in its locale.
    ///
    /// `route_hint` is used verbatim as the path instead of a generated one,
    /// subject to the conflict policy. Persisting a ghost turns it into an
    /// own translation.
    pub async fn persist(
        &mut self,
        mut document: Document,
        route_hint: Option<&str>,
    ) -> Result<Document, CoreError> {
        if document.is_ghost() {
            document.set_localization(LocalizationState::Localized);
        }
        let mut event = LifecycleEvent::new(EventKind::PrePersist, document)
            .with_route_hint(route_hint.map(str::to_string));

        let checkpoint = self.begin_operation().await?;
        let result = self.run_persist(&mut event).await;
        self.end_operation(checkpoint, result).await?;

        tracing::info!(
            uuid = %event.document.uuid(),
            locale = %event.locale(),
            route = ?event.document.routable().route_path(),
            "Document persisted"
        );
        Ok(event.document)
    }

    async fn run_persist(&mut self, event: &mut LifecycleEvent) -> Result<(), CoreError> {
        self.dispatch(event).await?;

        if event.document.is_new() {
            let id = self
                .store()
                .create_node(event.document.kind(), event.document.parent_id())
                .await?;
            event.document.set_uuid(id);
        }

        event.advance(EventKind::Persist);
        self.dispatch(event).await?;
        self.store().save(&event.document, Workspace::Draft).await?;
        event.advance(EventKind::PostPersist);
        self.dispatch(event).await
    }

    // -----------------------------------------------------------------------
    // Publish / unpublish
    // -----------------------------------------------------------------------

    /// Publish the draft of `id` in `locale`. Articles take their pages
    /// along and get a new version.
    pub async fn publish(&mut self, id: DocumentId, locale: &str) -> Result<Document, CoreError> {
        let checkpoint = self.begin_operation().await?;
        let result = self.publish_tree(id, locale).await;
        self.end_operation(checkpoint, result).await
    }

    async fn publish_tree(&mut self, id: DocumentId, locale: &str) -> Result<Document, CoreError> {
        let document = self.publish_one(id, locale).await?;

        if document.has_children() {
            for child in self.store().children(id, Workspace::Draft).await? {
                match self.store().find(child, locale, Workspace::Draft).await? {
                    Some(Document::Page(page)) if !page.is_ghost() => {
                        self.publish_one(child, locale).await?;
                    }
                    _ => {}
                }
            }
            let version = self.store().create_version(id, locale).await?;
            tracing::debug!(uuid = %id, locale, version, "Version created");
        }

        tracing::info!(
            uuid = %id,
            locale,
            route = ?document.routable().route_path(),
            "Document published"
        );
        Ok(document)
    }

    async fn publish_one(&mut self, id: DocumentId, locale: &str) -> Result<Document, CoreError> {
        let document = self.load_own(id, locale, Workspace::Draft).await?;
        if let Some(parent) = document.parent_id() {
            if !self.store().node_exists(parent, Workspace::Live).await? {
                return Err(CoreError::Validation(format!(
                    "page {id} cannot be published before its article {parent}"
                )));
            }
        }

        let mut event = LifecycleEvent::new(EventKind::Publish, document);
        self.dispatch(&mut event).await?;
        self.store().save(&event.document, Workspace::Draft).await?;
        self.store().publish(id, locale).await?;
        event.advance(EventKind::PostPublish);
        self.dispatch(&mut event).await?;
        Ok(event.document)
    }

    /// Take `locale` of `id` offline. Its routes are kept.
    pub async fn unpublish(&mut self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let checkpoint = self.begin_operation().await?;
        let result = self.run_unpublish(id, locale).await;
        self.end_operation(checkpoint, result).await
    }

    async fn run_unpublish(&mut self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let document = self.load_own(id, locale, Workspace::Draft).await?;
        let mut event = LifecycleEvent::new(EventKind::Unpublish, document);
        self.dispatch(&mut event).await?;
        self.store().save(&event.document, Workspace::Draft).await?;
        self.store().unpublish(id, locale).await?;
        tracing::info!(uuid = %id, locale, "Document unpublished");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Remove `id` with its subtree from both workspaces.
    pub async fn remove(&mut self, id: DocumentId) -> Result<(), CoreError> {
        let checkpoint = self.begin_operation().await?;
        let result = self.run_remove(id).await;
        self.end_operation(checkpoint, result).await
    }

    async fn run_remove(&mut self, id: DocumentId) -> Result<(), CoreError> {
        let store = self.store();
        let workspace = if store.node_exists(id, Workspace::Draft).await? {
            Workspace::Draft
        } else if store.node_exists(id, Workspace::Live).await? {
            Workspace::Live
        } else {
            return Err(CoreError::document_not_found(id));
        };

        let locales = union(
            store.locales(id, Workspace::Draft).await?,
            store.locales(id, Workspace::Live).await?,
        );
        let Some(first) = locales.first() else {
            store.remove(id).await?;
            return Ok(());
        };

        let document = self.load(id, first, workspace).await?;
        let parent = document.parent_id();
        let mut event = LifecycleEvent::new(EventKind::Remove, document);
        self.dispatch(&mut event).await?;
        store.remove(id).await?;

        if let Some(parent) = parent {
            let parent_locales = union(
                store.locales(parent, Workspace::Draft).await?,
                store.locales(parent, Workspace::Live).await?,
            );
            for locale in parent_locales {
                let mut document = event.document.clone();
                document.set_locale(locale);
                let mut removed = LifecycleEvent::new(EventKind::PostRemove, document);
                self.dispatch(&mut removed).await?;
            }
        }

        tracing::info!(uuid = %id, "Document removed");
        Ok(())
    }

    /// Throw away the draft of `locale` and return to the published state.
    pub async fn remove_draft(&mut self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let checkpoint = self.begin_operation().await?;
        let result = self.run_remove_draft(id, locale).await;
        self.end_operation(checkpoint, result).await
    }

    async fn run_remove_draft(&mut self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let document = self.load_own(id, locale, Workspace::Live).await?;
        let mut event = LifecycleEvent::new(EventKind::RemoveDraft, document);
        self.dispatch(&mut event).await?;
        self.store().remove_draft(id, locale).await?;
        tracing::info!(uuid = %id, locale, "Draft removed");
        Ok(())
    }

    /// Drop one translation of an article, with its pages and routes.
    pub async fn remove_locale(&mut self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let checkpoint = self.begin_operation().await?;
        let result = self.run_remove_locale(id, locale).await;
        self.end_operation(checkpoint, result).await
    }

    async fn run_remove_locale(&mut self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let document = self.load_own(id, locale, Workspace::Draft).await?;
        if document.kind() != DocumentKind::Article {
            return Err(CoreError::Validation(format!(
                "translations can only be removed from articles, {id} is a page"
            )));
        }
        let mut event = LifecycleEvent::new(EventKind::RemoveLocale, document);
        self.dispatch(&mut event).await?;
        self.store().remove_locale(id, locale).await?;
        tracing::info!(uuid = %id, locale, "Translation removed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Copy, reorder, restore
    // -----------------------------------------------------------------------

    /// Copy an article with its pages. Returns the id of the copy.
    pub async fn copy(&mut self, id: DocumentId) -> Result<DocumentId, CoreError> {
        let checkpoint = self.begin_operation().await?;
        let result = self.run_copy(id).await;
        self.end_operation(checkpoint, result).await
    }

    async fn run_copy(&mut self, id: DocumentId) -> Result<DocumentId, CoreError> {
        if self.store().node_kind(id, Workspace::Draft).await? != Some(DocumentKind::Article) {
            return Err(CoreError::Validation(format!("{id} is not an article")));
        }

        let copy = self.store().copy(id, None).await?;
        for locale in self.store().locales(copy, Workspace::Draft).await? {
            let document = self.load(copy, &locale, Workspace::Draft).await?;
            let mut event = LifecycleEvent::new(EventKind::Copy, document).with_source(id);
            self.dispatch(&mut event).await?;
            self.store().save(&event.document, Workspace::Draft).await?;
        }

        tracing::info!(source = %id, uuid = %copy, "Document copied");
        Ok(copy)
    }

    /// Seed the `target` translation of an article from `source`.
    pub async fn copy_locale(
        &mut self,
        id: DocumentId,
        source: &str,
        target: &str,
    ) -> Result<(), CoreError> {
        let checkpoint = self.begin_operation().await?;
        let result = self.run_copy_locale(id, source, target).await;
        self.end_operation(checkpoint, result).await
    }

    async fn run_copy_locale(
        &mut self,
        id: DocumentId,
        source: &str,
        target: &str,
    ) -> Result<(), CoreError> {
        self.load_own(id, source, Workspace::Draft).await?;
        self.store().copy_locale(id, source, target).await?;

        let document = self.load(id, target, Workspace::Draft).await?;
        let mut event =
            LifecycleEvent::new(EventKind::CopyLocale, document).with_source_locale(source);
        self.dispatch(&mut event).await?;
        self.store().save(&event.document, Workspace::Draft).await?;
        tracing::info!(uuid = %id, source, target, "Translation copied");
        Ok(())
    }

    /// Move a page to `position` among its siblings.
    pub async fn reorder(&mut self, id: DocumentId, position: usize) -> Result<(), CoreError> {
        let checkpoint = self.begin_operation().await?;
        let result = self.run_reorder(id, position).await;
        self.end_operation(checkpoint, result).await
    }

    async fn run_reorder(&mut self, id: DocumentId, position: usize) -> Result<(), CoreError> {
        if self.store().node_kind(id, Workspace::Draft).await? != Some(DocumentKind::Page) {
            return Err(CoreError::Validation(format!("{id} is not a page")));
        }
        let parent = self
            .store()
            .parent(id, Workspace::Draft)
            .await?
            .ok_or_else(|| CoreError::document_not_found(id))?;

        self.store().reorder(id, position).await?;
        for locale in self.store().locales(parent, Workspace::Draft).await? {
            let document = self.load(id, &locale, Workspace::Draft).await?;
            let mut event = LifecycleEvent::new(EventKind::Reorder, document);
            self.dispatch(&mut event).await?;
        }

        tracing::info!(uuid = %id, parent = %parent, position, "Page reordered");
        Ok(())
    }

    /// Bring back a published version of an article into the draft.
    pub async fn restore(
        &mut self,
        id: DocumentId,
        locale: &str,
        version: u32,
    ) -> Result<Document, CoreError> {
        let checkpoint = self.begin_operation().await?;
        let result = self.run_restore(id, locale, version).await;
        self.end_operation(checkpoint, result).await
    }

    async fn run_restore(
        &mut self,
        id: DocumentId,
        locale: &str,
        version: u32,
    ) -> Result<Document, CoreError> {
        self.store().restore(id, locale, version).await?;

        let document = self.load_own(id, locale, Workspace::Draft).await?;
        let mut event = LifecycleEvent::new(EventKind::Restore, document).with_version(version);
        self.dispatch(&mut event).await?;
        self.store().save(&event.document, Workspace::Draft).await?;
        tracing::info!(uuid = %id, locale, version, "Version restored");
        Ok(event.document)
    }

    // -----------------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------------

    /// Flush the content store, then write routes, index entries and domain
    /// events buffered by this request.
    pub async fn flush(&mut self) -> Result<(), CoreError> {
        self.store().flush().await?;
        self.pipeline.dispatcher().flush(&mut self.ctx).await?;
        tracing::debug!("Session flushed");
        Ok(())
    }

    /// Drop buffered work and roll back pending route writes.
    pub async fn discard(&mut self) -> Result<(), CoreError> {
        if self.ctx.has_pending_work() {
            tracing::warn!(
                index_keys = self.ctx.index.len(),
                events = self.ctx.events.len(),
                copies = self.ctx.copies.len(),
                "Discarding unflushed work"
            );
        }
        self.ctx.clear();
        if let Some(routes) = self.ctx.take_routes() {
            routes.rollback().await?;
        }
        Ok(())
    }
}

fn union(mut left: Vec<String>, right: Vec<String>) -> Vec<String> {
    for locale in right {
        if !left.contains(&locale) {
            left.push(locale);
        }
    }
    left
}
