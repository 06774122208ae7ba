use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pressroom_core::document::{Document, Localized};
use pressroom_core::store::ContentStore;
use pressroom_core::structure::StructureRegistry;
use pressroom_core::types::Workspace;
use pressroom_core::CoreError;

use super::{child_pages, PRIORITY_STRUCTURE};
use crate::context::RequestContext;
use crate::dispatcher::Subscriber;
use crate::event::{EventKind, LifecycleEvent};

/// Applies structure type defaults and timestamps, and keeps pages on the
/// structure type and shadow locale of their article.
pub struct StructureSubscriber {
    store: Arc<dyn ContentStore>,
    structures: StructureRegistry,
}

impl StructureSubscriber {
    pub fn new(store: Arc<dyn ContentStore>, structures: StructureRegistry) -> Self {
        Self { store, structures }
    }

    async fn apply_defaults(&self, document: &mut Document) -> Result<(), CoreError> {
        let structure_type = self.structures.resolve(document.structure_type())?;
        document.set_structure_type(structure_type);

        match document {
            Document::Article(article) => {
                let now = Utc::now();
                let created = *article.created.get_or_insert(now);
                article.changed = Some(now);
                article.last_modified = Some(now);
                article.authored.get_or_insert(created);
            }
            Document::Page(page) => {
                let parent = self
                    .store
                    .find(page.parent, &page.locale, Workspace::Draft)
                    .await?
                    .ok_or_else(|| CoreError::document_not_found(page.parent))?;
                page.structure_type = parent.structure_type().to_string();
                page.shadow_locale = parent.shadow_locale().map(str::to_string);
            }
        }
        Ok(())
    }

    /// Write the article's structure type and shadow locale to every draft
    /// page that differs.
    async fn propagate(&self, document: &Document) -> Result<(), CoreError> {
        let Document::Article(article) = document else {
            return Ok(());
        };
        if document.is_new() || document.is_ghost() {
            return Ok(());
        }

        let pages = child_pages(
            self.store.as_ref(),
            article.uuid,
            &article.locale,
            Workspace::Draft,
        )
        .await?;
        for mut page in pages {
            if page.structure_type == article.structure_type
                && page.shadow_locale == article.shadow_locale
            {
                continue;
            }
            page.structure_type = article.structure_type.clone();
            page.shadow_locale = article.shadow_locale.clone();
            tracing::debug!(uuid = %page.uuid, parent = %article.uuid, "Page follows article structure");
            self.store.save(&page.into(), Workspace::Draft).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Subscriber for StructureSubscriber {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn subscriptions(&self) -> Vec<(EventKind, i32)> {
        vec![
            (EventKind::PrePersist, PRIORITY_STRUCTURE),
            (EventKind::Persist, PRIORITY_STRUCTURE),
        ]
    }

    async fn on_event(
        &self,
        event: &mut LifecycleEvent,
        _ctx: &mut RequestContext,
    ) -> Result<(), CoreError> {
        match event.kind() {
            EventKind::PrePersist => self.apply_defaults(&mut event.document).await,
            EventKind::Persist => self.propagate(&event.document).await,
            _ => Ok(()),
        }
    }
}
