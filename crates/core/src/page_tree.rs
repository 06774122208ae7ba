//! Contract for the site's page tree.
//!
//! Page-tree-bound articles derive their route and webspace from a page of
//! the site structure, which is managed outside of this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DocumentId;

/// A page of the site's page tree as seen from an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePage {
    pub uuid: DocumentId,
    /// Resource path of the page, e.g. `/company/news`.
    pub path: String,
    pub webspace: String,
}

/// Lookup of page-tree pages.
#[async_trait]
pub trait PageTreeResolver: Send + Sync {
    /// The page in `locale`, or `None` when it no longer exists.
    async fn find_page(
        &self,
        page_id: DocumentId,
        locale: &str,
    ) -> Result<Option<TreePage>, CoreError>;
}
