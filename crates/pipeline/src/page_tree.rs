//! Route recomputation after a page of the site tree moved.

use pressroom_core::document::{Document, Localized};
use pressroom_core::types::{DocumentId, Workspace};
use pressroom_core::CoreError;

use crate::session::DocumentSession;

impl DocumentSession<'_> {
    /// Recompute the routes of every article bound to page-tree page
    /// `page_id` in `locale`.
    ///
    /// Each bound article is persisted again so its path is rebuilt from
    /// the page's current path and the stored suffix. Articles published in
    /// `locale` whose path changed are republished so the live route
    /// follows. Returns the ids of the articles whose route changed.
    ///
    /// Only articles bound to `page_id` itself are visited. When a move
    /// changes the paths of descendant pages too, call this once per
    /// affected page; the page tree is not walked here.
    ///
    /// Every article is persisted and published as an operation of its
    /// own. A failure stops the walk but keeps the articles already done.
    pub async fn update_page_tree_routes(
        &mut self,
        page_id: DocumentId,
        locale: &str,
    ) -> Result<Vec<DocumentId>, CoreError> {
        let store = self.store();
        let mut updated = Vec::new();

        for id in store.find_by_page_tree_parent(page_id, Workspace::Draft).await? {
            let Some(document) = store.find(id, locale, Workspace::Draft).await? else {
                continue;
            };
            let bound = matches!(
                &document,
                Document::Article(a) if a.page_tree.as_ref().is_some_and(|b| b.page_id == page_id)
            );
            if document.is_ghost() || !bound {
                continue;
            }

            let before = document.routable().route_path().map(str::to_string);
            let published = store
                .locales(id, Workspace::Live)
                .await?
                .iter()
                .any(|l| l == locale);

            let document = self.persist(document, None).await?;
            let after = document.routable().route_path();
            if before.as_deref() != after {
                if published {
                    self.publish(id, locale).await?;
                }
                tracing::info!(
                    uuid = %id,
                    page_id = %page_id,
                    from = ?before,
                    to = ?after,
                    "Page-tree route recomputed"
                );
                updated.push(id);
            }
        }
        Ok(updated)
    }
}
