use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pressroom_core::document::{Document, WorkflowStage};
use pressroom_core::store::ContentStore;
use pressroom_core::types::{DocumentId, Workspace};
use pressroom_core::CoreError;

use super::PRIORITY_WORKFLOW;
use crate::context::RequestContext;
use crate::dispatcher::Subscriber;
use crate::event::{EventKind, LifecycleEvent};

/// Maintains workflow stages and keeps the live page set of an article in
/// line with its draft.
pub struct WorkflowSubscriber {
    store: Arc<dyn ContentStore>,
}

impl WorkflowSubscriber {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Pages removed from the draft disappear from live once the article
    /// is published again.
    async fn drop_stale_live_pages(&self, article: DocumentId) -> Result<(), CoreError> {
        let draft = self.store.children(article, Workspace::Draft).await?;
        for child in self.store.children(article, Workspace::Live).await? {
            if !draft.contains(&child) {
                tracing::debug!(uuid = %child, parent = %article, "Removing page no longer in draft");
                self.store.remove_node(child, Workspace::Live).await?;
            }
        }
        Ok(())
    }

    /// Bring the draft pages of `article` back to their live state.
    async fn revert_pages(&self, article: DocumentId, locale: &str) -> Result<(), CoreError> {
        let live = self.store.children(article, Workspace::Live).await?;

        for child in self.store.children(article, Workspace::Draft).await? {
            if !live.contains(&child) {
                tracing::warn!(uuid = %child, parent = %article, "Removing orphaned draft node");
                self.store.remove_node(child, Workspace::Draft).await?;
                continue;
            }
            if self.has_live_translation(child, locale).await? {
                self.store.remove_draft(child, locale).await?;
            }
        }

        let draft = self.store.children(article, Workspace::Draft).await?;
        for child in live {
            if !draft.contains(&child) && self.has_live_translation(child, locale).await? {
                tracing::debug!(uuid = %child, parent = %article, "Restoring page from live");
                self.store.remove_draft(child, locale).await?;
            }
        }
        Ok(())
    }

    async fn has_live_translation(&self, id: DocumentId, locale: &str) -> Result<bool, CoreError> {
        Ok(self
            .store
            .locales(id, Workspace::Live)
            .await?
            .iter()
            .any(|l| l == locale))
    }
}

#[async_trait]
impl Subscriber for WorkflowSubscriber {
    fn name(&self) -> &'static str {
        "workflow"
    }

    fn subscriptions(&self) -> Vec<(EventKind, i32)> {
        vec![
            (EventKind::Publish, PRIORITY_WORKFLOW),
            (EventKind::PostPublish, PRIORITY_WORKFLOW),
            (EventKind::Unpublish, PRIORITY_WORKFLOW),
            (EventKind::RemoveDraft, PRIORITY_WORKFLOW),
            (EventKind::Copy, PRIORITY_WORKFLOW),
            (EventKind::CopyLocale, PRIORITY_WORKFLOW),
        ]
    }

    async fn on_event(
        &self,
        event: &mut LifecycleEvent,
        _ctx: &mut RequestContext,
    ) -> Result<(), CoreError> {
        match event.kind() {
            EventKind::Publish => {
                event
                    .document
                    .set_workflow_stage(WorkflowStage::Published, Some(Utc::now()));
            }
            EventKind::Unpublish | EventKind::Copy | EventKind::CopyLocale => {
                event.document.set_workflow_stage(WorkflowStage::Draft, None);
            }
            EventKind::PostPublish => {
                if let Document::Article(article) = &event.document {
                    self.drop_stale_live_pages(article.uuid).await?;
                }
            }
            EventKind::RemoveDraft => {
                if let Document::Article(article) = &event.document {
                    self.revert_pages(article.uuid, &article.locale).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pressroom_core::document::{Article, DocumentKind};
    use pressroom_core::memory::MemoryContentStore;

    use super::*;

    #[tokio::test]
    async fn publish_and_unpublish_switch_stage() {
        let sub = WorkflowSubscriber::new(Arc::new(MemoryContentStore::new()));
        let mut event = LifecycleEvent::new(EventKind::Publish, Article::new("de", "x", "default").into());
        let mut ctx = RequestContext::new();

        sub.on_event(&mut event, &mut ctx).await.unwrap();
        assert_eq!(event.document.workflow_stage(), WorkflowStage::Published);
        assert!(event.document.as_article().unwrap().published.is_some());

        event.advance(EventKind::Unpublish);
        sub.on_event(&mut event, &mut ctx).await.unwrap();
        assert_eq!(event.document.workflow_stage(), WorkflowStage::Draft);
        assert!(event.document.as_article().unwrap().published.is_none());
    }

    #[tokio::test]
    async fn stale_live_pages_are_dropped() {
        let store = Arc::new(MemoryContentStore::new());
        let id = store.create_node(DocumentKind::Article, None).await.unwrap();
        let mut article = Article::new("de", "x", "default");
        article.uuid = id;
        store.save(&article.clone().into(), Workspace::Draft).await.unwrap();

        let page_id = store.create_node(DocumentKind::Page, Some(id)).await.unwrap();
        let mut page = pressroom_core::document::ArticlePage::new(id, "de", "p");
        page.uuid = page_id;
        store.save(&page.into(), Workspace::Draft).await.unwrap();
        store.publish(id, "de").await.unwrap();
        store.publish(page_id, "de").await.unwrap();
        store.remove_node(page_id, Workspace::Draft).await.unwrap();

        let sub = WorkflowSubscriber::new(store.clone());
        let mut event = LifecycleEvent::new(EventKind::PostPublish, article.into());
        sub.on_event(&mut event, &mut RequestContext::new()).await.unwrap();

        assert!(!store.node_exists(page_id, Workspace::Live).await.unwrap());
    }
}
