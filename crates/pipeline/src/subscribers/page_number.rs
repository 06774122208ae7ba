use std::sync::Arc;

use async_trait::async_trait;
use pressroom_core::document::{Document, Localized};
use pressroom_core::page_number::PageNumberSequencer;
use pressroom_core::store::ContentStore;
use pressroom_core::types::{page_number_property, DocumentId, Workspace};
use pressroom_core::CoreError;

use super::PRIORITY_PAGE_NUMBER;
use crate::context::RequestContext;
use crate::dispatcher::Subscriber;
use crate::event::{EventKind, LifecycleEvent};

/// Keeps page numbers contiguous whenever the set or order of pages changes.
pub struct PageNumberSubscriber {
    store: Arc<dyn ContentStore>,
    sequencer: PageNumberSequencer,
}

impl PageNumberSubscriber {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            sequencer: PageNumberSequencer::new(store.clone()),
            store,
        }
    }

    /// Renumber the pages of `parent` in draft, and in live when the
    /// article is published there.
    async fn renumber_both(&self, parent: DocumentId, locale: &str) -> Result<(), CoreError> {
        for workspace in [Workspace::Draft, Workspace::Live] {
            if self.store.node_exists(parent, workspace).await? {
                self.sequencer.assign(parent, locale, workspace, None).await?;
            }
        }
        Ok(())
    }

    /// Carry the draft number of a freshly published page into live.
    async fn publish_number(&self, id: DocumentId, locale: &str) -> Result<(), CoreError> {
        let property = page_number_property(locale);
        if let Some(number) = self.store.property(id, Workspace::Draft, &property).await? {
            self.store
                .set_property(id, Workspace::Live, &property, number)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Subscriber for PageNumberSubscriber {
    fn name(&self) -> &'static str {
        "page_number"
    }

    fn subscriptions(&self) -> Vec<(EventKind, i32)> {
        vec![
            (EventKind::Persist, PRIORITY_PAGE_NUMBER),
            (EventKind::PostPublish, PRIORITY_PAGE_NUMBER),
            (EventKind::PostRemove, PRIORITY_PAGE_NUMBER),
            (EventKind::Reorder, PRIORITY_PAGE_NUMBER),
            (EventKind::Restore, PRIORITY_PAGE_NUMBER),
        ]
    }

    async fn on_event(
        &self,
        event: &mut LifecycleEvent,
        _ctx: &mut RequestContext,
    ) -> Result<(), CoreError> {
        let locale = event.locale().to_string();
        match (event.kind(), &mut event.document) {
            (EventKind::Persist, Document::Page(page)) => {
                if page.is_ghost() {
                    return Ok(());
                }
                let parent = page.parent;
                self.sequencer
                    .assign(parent, &locale, Workspace::Draft, Some(page))
                    .await?;
            }
            (EventKind::PostPublish, Document::Page(page)) => {
                self.publish_number(page.uuid, &locale).await?;
            }
            (EventKind::PostRemove, Document::Page(page)) => {
                self.renumber_both(page.parent, &locale).await?;
            }
            (EventKind::Reorder, Document::Page(page)) => {
                self.sequencer
                    .assign(page.parent, &locale, Workspace::Draft, None)
                    .await?;
            }
            (EventKind::Restore, Document::Article(article)) => {
                self.sequencer
                    .assign(article.uuid, &locale, Workspace::Draft, None)
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }
}
