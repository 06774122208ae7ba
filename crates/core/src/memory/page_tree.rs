use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::page_tree::{PageTreeResolver, TreePage};
use crate::types::DocumentId;

/// Page tree held in a map. Pages are the same in every locale.
#[derive(Default)]
pub struct MemoryPageTree {
    pages: RwLock<HashMap<DocumentId, TreePage>>,
}

impl MemoryPageTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, page: TreePage) {
        self.pages.write().await.insert(page.uuid, page);
    }

    /// Change the resource path of a page, as a move in the site tree does.
    pub async fn set_path(&self, page_id: DocumentId, path: impl Into<String>) {
        if let Some(page) = self.pages.write().await.get_mut(&page_id) {
            page.path = path.into();
        }
    }

    pub async fn remove(&self, page_id: DocumentId) {
        self.pages.write().await.remove(&page_id);
    }
}

#[async_trait]
impl PageTreeResolver for MemoryPageTree {
    async fn find_page(
        &self,
        page_id: DocumentId,
        _locale: &str,
    ) -> Result<Option<TreePage>, CoreError> {
        Ok(self.pages.read().await.get(&page_id).cloned())
    }
}
