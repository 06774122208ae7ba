//! Content store contract.
//!
//! The store keeps one node per document and workspace. A node holds its
//! child ordering, locale-suffixed properties and one translation per
//! locale. Loading a node in a locale without its own translation yields a
//! ghost of another translation; a translation with a shadow locale is
//! served with the shadow's content.

use async_trait::async_trait;

use crate::document::{Document, DocumentKind};
use crate::error::CoreError;
use crate::types::{DocumentId, Workspace};

/// Hierarchical, multi-locale content storage with draft and live workspaces.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Create an empty draft node and append it to `parent`'s children.
    async fn create_node(
        &self,
        kind: DocumentKind,
        parent: Option<DocumentId>,
    ) -> Result<DocumentId, CoreError>;

    async fn node_exists(&self, id: DocumentId, workspace: Workspace) -> Result<bool, CoreError>;

    async fn node_kind(
        &self,
        id: DocumentId,
        workspace: Workspace,
    ) -> Result<Option<DocumentKind>, CoreError>;

    /// Load `id` in `locale`. Missing translations load as ghosts.
    async fn find(
        &self,
        id: DocumentId,
        locale: &str,
        workspace: Workspace,
    ) -> Result<Option<Document>, CoreError>;

    /// Locales with an own translation.
    async fn locales(&self, id: DocumentId, workspace: Workspace)
        -> Result<Vec<String>, CoreError>;

    /// Ordered child ids.
    async fn children(
        &self,
        id: DocumentId,
        workspace: Workspace,
    ) -> Result<Vec<DocumentId>, CoreError>;

    async fn parent(
        &self,
        id: DocumentId,
        workspace: Workspace,
    ) -> Result<Option<DocumentId>, CoreError>;

    /// Write the document's translation for its locale.
    async fn save(&self, document: &Document, workspace: Workspace) -> Result<(), CoreError>;

    async fn set_property(
        &self,
        id: DocumentId,
        workspace: Workspace,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), CoreError>;

    async fn property(
        &self,
        id: DocumentId,
        workspace: Workspace,
        name: &str,
    ) -> Result<Option<serde_json::Value>, CoreError>;

    /// Copy the draft translation and node properties of `locale` into the
    /// live workspace, creating the live node below its live parent.
    async fn publish(&self, id: DocumentId, locale: &str) -> Result<(), CoreError>;

    /// Drop the live translation of `locale` for the node and its subtree.
    async fn unpublish(&self, id: DocumentId, locale: &str) -> Result<(), CoreError>;

    /// Remove the node and its subtree from both workspaces.
    async fn remove(&self, id: DocumentId) -> Result<(), CoreError>;

    /// Remove the node and its subtree from one workspace only.
    async fn remove_node(&self, id: DocumentId, workspace: Workspace) -> Result<(), CoreError>;

    /// Replace the draft translation of `locale` with the live one,
    /// recreating the draft node below its parent when it is missing.
    async fn remove_draft(&self, id: DocumentId, locale: &str) -> Result<(), CoreError>;

    /// Drop the translation of `locale` in both workspaces.
    async fn remove_locale(&self, id: DocumentId, locale: &str) -> Result<(), CoreError>;

    /// Deep-copy the draft subtree below `parent`, returning the new root id.
    async fn copy(
        &self,
        id: DocumentId,
        parent: Option<DocumentId>,
    ) -> Result<DocumentId, CoreError>;

    /// Copy the draft translation of `source` into `target` for the node and
    /// its subtree.
    async fn copy_locale(&self, id: DocumentId, source: &str, target: &str)
        -> Result<(), CoreError>;

    /// Move a draft node to `position` among its siblings.
    async fn reorder(&self, id: DocumentId, position: usize) -> Result<(), CoreError>;

    /// Snapshot the draft subtree in `locale`, returning the version number.
    async fn create_version(&self, id: DocumentId, locale: &str) -> Result<u32, CoreError>;

    /// Restore a snapshot into the draft workspace.
    async fn restore(&self, id: DocumentId, locale: &str, version: u32) -> Result<(), CoreError>;

    /// Articles in `workspace` whose route is bound to page-tree page `page_id`.
    async fn find_by_page_tree_parent(
        &self,
        page_id: DocumentId,
        workspace: Workspace,
    ) -> Result<Vec<DocumentId>, CoreError>;

    async fn flush(&self) -> Result<(), CoreError>;
}
