//! Contiguous page numbering for multi-page articles.

use std::sync::Arc;

use crate::document::{ArticlePage, Document, Localized, FIRST_PAGE_NUMBER};
use crate::error::CoreError;
use crate::store::ContentStore;
use crate::types::{page_number_property, DocumentId, Workspace};

/// Numbers the pages of an article in store child order.
#[derive(Clone)]
pub struct PageNumberSequencer {
    store: Arc<dyn ContentStore>,
}

impl PageNumberSequencer {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Number the pages below `parent` from [`FIRST_PAGE_NUMBER`].
    ///
    /// Non-page children and ghosts are skipped. Each number is written to
    /// the page document and to its `i18n:{locale}-pageNumber` property.
    /// `current` is the page being persisted; it is numbered in place rather
    /// than loaded from the store. Returns `(uuid, number)` in order.
    pub async fn assign(
        &self,
        parent: DocumentId,
        locale: &str,
        workspace: Workspace,
        mut current: Option<&mut ArticlePage>,
    ) -> Result<Vec<(DocumentId, u32)>, CoreError> {
        let property = page_number_property(locale);
        let mut next = FIRST_PAGE_NUMBER;
        let mut assigned = Vec::new();

        for child in self.store.children(parent, workspace).await? {
            if let Some(page) = current.as_deref_mut().filter(|p| p.uuid == child) {
                if page.is_ghost() {
                    continue;
                }
                page.page_number = next;
            } else {
                let Some(Document::Page(mut page)) = self.store.find(child, locale, workspace).await?
                else {
                    continue;
                };
                if page.is_ghost() {
                    continue;
                }
                if page.page_number != next {
                    page.page_number = next;
                    self.store.save(&Document::Page(page), workspace).await?;
                }
            }

            self.store
                .set_property(child, workspace, &property, serde_json::json!(next))
                .await?;
            assigned.push((child, next));
            next += 1;
        }

        tracing::debug!(parent = %parent, locale, pages = assigned.len(), "Page numbers assigned");
        Ok(assigned)
    }
}
