use std::sync::Arc;

use async_trait::async_trait;
use pressroom_core::document::{Document, Localized};
use pressroom_core::store::ContentStore;
use pressroom_core::types::{DocumentId, Workspace};
use pressroom_core::CoreError;

use super::{own_translation, page_summaries, PRIORITY_PAGE_SUMMARY};
use crate::context::RequestContext;
use crate::dispatcher::Subscriber;
use crate::event::{EventKind, LifecycleEvent};

/// Keeps the ordered page list stored on each article current.
pub struct PageSummarySubscriber {
    store: Arc<dyn ContentStore>,
}

impl PageSummarySubscriber {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    async fn rebuild(&self, document: &mut Document, workspace: Workspace) -> Result<(), CoreError> {
        if document.is_new() || document.is_ghost() {
            return Ok(());
        }
        let id = document.uuid();
        let locale = document.locale().to_string();
        if let Some(article) = document.pages_mut() {
            let pages = page_summaries(self.store.as_ref(), id, &locale, workspace).await?;
            article.set_pages(pages);
        }
        Ok(())
    }

    /// Rebuild and save a stored article whose pages changed.
    async fn rebuild_stored(
        &self,
        article: DocumentId,
        locale: &str,
        workspace: Workspace,
    ) -> Result<(), CoreError> {
        let Some(mut document) = own_translation(self.store.as_ref(), article, locale, workspace).await?
        else {
            return Ok(());
        };
        let before = document.as_article().map(|a| a.pages.clone());
        self.rebuild(&mut document, workspace).await?;
        if document.as_article().map(|a| &a.pages) != before.as_ref() {
            self.store.save(&document, workspace).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Subscriber for PageSummarySubscriber {
    fn name(&self) -> &'static str {
        "page_summary"
    }

    fn subscriptions(&self) -> Vec<(EventKind, i32)> {
        vec![
            (EventKind::Persist, PRIORITY_PAGE_SUMMARY),
            (EventKind::PostPersist, PRIORITY_PAGE_SUMMARY),
            (EventKind::Publish, PRIORITY_PAGE_SUMMARY),
            (EventKind::PostRemove, PRIORITY_PAGE_SUMMARY),
            (EventKind::Copy, PRIORITY_PAGE_SUMMARY),
            (EventKind::CopyLocale, PRIORITY_PAGE_SUMMARY),
            (EventKind::Reorder, PRIORITY_PAGE_SUMMARY),
            (EventKind::Restore, PRIORITY_PAGE_SUMMARY),
        ]
    }

    async fn on_event(
        &self,
        event: &mut LifecycleEvent,
        _ctx: &mut RequestContext,
    ) -> Result<(), CoreError> {
        let locale = event.locale().to_string();
        match (event.kind(), event.document.parent_id()) {
            (
                EventKind::Persist
                | EventKind::Publish
                | EventKind::Copy
                | EventKind::CopyLocale
                | EventKind::Restore,
                None,
            ) => self.rebuild(&mut event.document, Workspace::Draft).await?,
            (EventKind::PostPersist | EventKind::Reorder, Some(parent)) => {
                self.rebuild_stored(parent, &locale, Workspace::Draft).await?
            }
            (EventKind::PostRemove, Some(parent)) => {
                self.rebuild_stored(parent, &locale, Workspace::Draft).await?;
                self.rebuild_stored(parent, &locale, Workspace::Live).await?;
            }
            _ => {}
        }
        Ok(())
    }
}
