use std::sync::Arc;

use async_trait::async_trait;
use pressroom_core::document::Document;
use pressroom_core::index::IndexTarget;
use pressroom_core::store::ContentStore;
use pressroom_core::types::{DocumentId, Workspace};
use pressroom_core::CoreError;

use super::PRIORITY_INDEX;
use crate::context::RequestContext;
use crate::dispatcher::Subscriber;
use crate::event::{EventKind, LifecycleEvent};
use crate::scheduler::Indexer;

/// Schedules index writes for everything a lifecycle event touched. Writes
/// happen once per key on flush; removals are immediate.
pub struct IndexSubscriber {
    store: Arc<dyn ContentStore>,
    indexer: Arc<Indexer>,
}

impl IndexSubscriber {
    pub fn new(store: Arc<dyn ContentStore>, indexer: Arc<Indexer>) -> Self {
        Self { store, indexer }
    }

    async fn all_locales(&self, id: DocumentId) -> Result<Vec<String>, CoreError> {
        let mut locales = self.store.locales(id, Workspace::Draft).await?;
        for locale in self.store.locales(id, Workspace::Live).await? {
            if !locales.contains(&locale) {
                locales.push(locale);
            }
        }
        Ok(locales)
    }
}

#[async_trait]
impl Subscriber for IndexSubscriber {
    fn name(&self) -> &'static str {
        "index"
    }

    fn subscriptions(&self) -> Vec<(EventKind, i32)> {
        vec![
            (EventKind::Persist, PRIORITY_INDEX),
            (EventKind::PostPublish, PRIORITY_INDEX),
            (EventKind::Unpublish, PRIORITY_INDEX),
            (EventKind::Remove, PRIORITY_INDEX),
            (EventKind::PostRemove, PRIORITY_INDEX),
            (EventKind::RemoveDraft, PRIORITY_INDEX),
            (EventKind::RemoveLocale, PRIORITY_INDEX),
            (EventKind::Copy, PRIORITY_INDEX),
            (EventKind::CopyLocale, PRIORITY_INDEX),
            (EventKind::Reorder, PRIORITY_INDEX),
            (EventKind::Restore, PRIORITY_INDEX),
            (EventKind::Flush, PRIORITY_INDEX),
        ]
    }

    async fn on_event(
        &self,
        event: &mut LifecycleEvent,
        ctx: &mut RequestContext,
    ) -> Result<(), CoreError> {
        let locale = event.locale().to_string();
        let article = event.document.article_id();
        let scheduler = &mut ctx.index;

        match event.kind() {
            EventKind::Persist
            | EventKind::RemoveDraft
            | EventKind::CopyLocale
            | EventKind::Reorder
            | EventKind::Restore => {
                scheduler.schedule(article, &locale, IndexTarget::Draft);
            }
            EventKind::PostPublish => {
                scheduler.schedule(article, &locale, IndexTarget::Draft);
                scheduler.schedule(article, &locale, IndexTarget::Live);
            }
            EventKind::Unpublish => {
                if let Document::Article(a) = &event.document {
                    self.indexer
                        .remove_now(IndexTarget::Live, a.uuid, &[locale.clone()])
                        .await?;
                    scheduler.unschedule(a.uuid, &locale, IndexTarget::Live);
                    scheduler.schedule(a.uuid, &locale, IndexTarget::Draft);
                }
            }
            EventKind::Remove => {
                if let Document::Article(a) = &event.document {
                    let locales = self.all_locales(a.uuid).await?;
                    self.indexer
                        .remove_now(IndexTarget::Draft, a.uuid, &locales)
                        .await?;
                    self.indexer
                        .remove_now(IndexTarget::Live, a.uuid, &locales)
                        .await?;
                    scheduler.forget(a.uuid);
                }
            }
            EventKind::PostRemove => {
                scheduler.schedule(article, &locale, IndexTarget::Draft);
                if self.store.node_exists(article, Workspace::Live).await? {
                    scheduler.schedule(article, &locale, IndexTarget::Live);
                }
            }
            EventKind::RemoveLocale => {
                if let Document::Article(a) = &event.document {
                    let locales = [locale.clone()];
                    self.indexer
                        .remove_now(IndexTarget::Draft, a.uuid, &locales)
                        .await?;
                    self.indexer
                        .remove_now(IndexTarget::Live, a.uuid, &locales)
                        .await?;
                    scheduler.unschedule(a.uuid, &locale, IndexTarget::Draft);
                    scheduler.unschedule(a.uuid, &locale, IndexTarget::Live);
                }
            }
            EventKind::Copy => {
                // The copy is not readable before the store flushes.
                scheduler.defer(article, &locale, IndexTarget::Draft);
            }
            _ => {}
        }
        Ok(())
    }

    async fn on_flush(&self, ctx: &mut RequestContext) -> Result<(), CoreError> {
        ctx.index.release_deferred();
        let upserts = ctx.index.flush(&self.indexer).await?;
        if upserts > 0 {
            tracing::info!(upserts, "Search indices updated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pressroom_core::document::Article;
    use pressroom_core::memory::{MemoryContentStore, MemorySearchIndex};
    use pressroom_core::view::DefaultProjectionBuilder;

    use super::*;

    fn subscriber() -> IndexSubscriber {
        let store = Arc::new(MemoryContentStore::new());
        let indexer = Indexer::new(
            store.clone(),
            Arc::new(DefaultProjectionBuilder::new(None)),
            Arc::new(MemorySearchIndex::new()),
            Arc::new(MemorySearchIndex::new()),
        );
        IndexSubscriber::new(store, Arc::new(indexer))
    }

    fn article() -> Document {
        let mut article = Article::new("de", "x", "default");
        article.uuid = DocumentId::new_v4();
        article.into()
    }

    #[tokio::test]
    async fn publish_schedules_both_targets() {
        let sub = subscriber();
        let document = article();
        let id = document.uuid();
        let mut ctx = RequestContext::new();

        let mut event = LifecycleEvent::new(EventKind::PostPublish, document);
        sub.on_event(&mut event, &mut ctx).await.unwrap();

        assert!(ctx.index.is_scheduled(id, "de", IndexTarget::Draft));
        assert!(ctx.index.is_scheduled(id, "de", IndexTarget::Live));
    }

    #[tokio::test]
    async fn copies_are_deferred() {
        let sub = subscriber();
        let document = article();
        let id = document.uuid();
        let mut ctx = RequestContext::new();

        let mut event = LifecycleEvent::new(EventKind::Copy, document);
        sub.on_event(&mut event, &mut ctx).await.unwrap();

        assert!(!ctx.index.is_scheduled(id, "de", IndexTarget::Draft));
        assert!(ctx.index.is_deferred(id, "de", IndexTarget::Draft));
    }

    #[tokio::test]
    async fn unpublish_drops_pending_live_write() {
        let sub = subscriber();
        let document = article();
        let id = document.uuid();
        let mut ctx = RequestContext::new();
        ctx.index.schedule(id, "de", IndexTarget::Live);

        let mut event = LifecycleEvent::new(EventKind::Unpublish, document);
        sub.on_event(&mut event, &mut ctx).await.unwrap();

        assert!(!ctx.index.is_scheduled(id, "de", IndexTarget::Live));
        assert!(ctx.index.is_scheduled(id, "de", IndexTarget::Draft));
    }
}
