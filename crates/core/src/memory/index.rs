use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::index::SearchIndex;
use crate::types::DocumentId;
use crate::view::{view_document_id, ViewDocument};

#[derive(Debug)]
enum PendingWrite {
    Upsert(ViewDocument),
    Remove(String),
}

#[derive(Debug, Default)]
struct IndexState {
    committed: BTreeMap<String, ViewDocument>,
    pending: Vec<PendingWrite>,
    upserts: usize,
    removals: usize,
    commits: usize,
}

/// Search index whose writes become visible on [`SearchIndex::commit`].
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    state: RwLock<IndexState>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// A committed projection by id.
    pub async fn get(&self, id: &str) -> Option<ViewDocument> {
        self.state.read().await.committed.get(id).cloned()
    }

    /// The committed projection of `(uuid, locale)`.
    pub async fn find(&self, uuid: DocumentId, locale: &str) -> Option<ViewDocument> {
        self.get(&view_document_id(uuid, locale)).await
    }

    pub async fn contains(&self, uuid: DocumentId, locale: &str) -> bool {
        self.find(uuid, locale).await.is_some()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.committed.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of upsert calls received.
    pub async fn upsert_count(&self) -> usize {
        self.state.read().await.upserts
    }

    /// Number of remove calls received.
    pub async fn removal_count(&self) -> usize {
        self.state.read().await.removals
    }

    pub async fn commit_count(&self) -> usize {
        self.state.read().await.commits
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn upsert(&self, document: ViewDocument) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        state.upserts += 1;
        state.pending.push(PendingWrite::Upsert(document));
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        state.removals += 1;
        state.pending.push(PendingWrite::Remove(id.to_string()));
        Ok(())
    }

    async fn commit(&self) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let pending = std::mem::take(&mut state.pending);
        for write in pending {
            match write {
                PendingWrite::Upsert(document) => {
                    state.committed.insert(document.id.clone(), document);
                }
                PendingWrite::Remove(id) => {
                    state.committed.remove(&id);
                }
            }
        }
        state.commits += 1;
        Ok(())
    }
}
