//! Request-scoped index scheduling.
//!
//! [`IndexScheduler`] buffers `(uuid, locale, target)` keys during a
//! request. On flush every key is re-read from its workspace, projected and
//! written exactly once, followed by a single commit per target. Removals
//! bypass the buffer through [`Indexer::remove_now`].

use std::collections::BTreeSet;
use std::sync::Arc;

use pressroom_core::document::{Document, Localized};
use pressroom_core::index::{IndexTarget, SearchIndex};
use pressroom_core::store::ContentStore;
use pressroom_core::types::DocumentId;
use pressroom_core::view::{view_document_id, ProjectionBuilder};
use pressroom_core::CoreError;

// ---------------------------------------------------------------------------
// IndexKey
// ---------------------------------------------------------------------------

/// One pending index write.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey {
    pub target: IndexTarget,
    pub uuid: DocumentId,
    pub locale: String,
}

impl IndexKey {
    pub fn new(uuid: DocumentId, locale: impl Into<String>, target: IndexTarget) -> Self {
        Self {
            target,
            uuid,
            locale: locale.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Indexer
// ---------------------------------------------------------------------------

/// Projects stored articles into the draft and live indices.
pub struct Indexer {
    store: Arc<dyn ContentStore>,
    projection: Arc<dyn ProjectionBuilder>,
    draft: Arc<dyn SearchIndex>,
    live: Arc<dyn SearchIndex>,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn ContentStore>,
        projection: Arc<dyn ProjectionBuilder>,
        draft: Arc<dyn SearchIndex>,
        live: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            store,
            projection,
            draft,
            live,
        }
    }

    pub fn index(&self, target: IndexTarget) -> &Arc<dyn SearchIndex> {
        match target {
            IndexTarget::Draft => &self.draft,
            IndexTarget::Live => &self.live,
        }
    }

    /// Bring the index entry of `key` in line with the store.
    ///
    /// Articles missing from the key's workspace are removed. Ghosts are
    /// only kept in the draft index. Returns `true` when a document was
    /// upserted.
    pub async fn reindex(&self, key: &IndexKey) -> Result<bool, CoreError> {
        let index = self.index(key.target);
        let found = self
            .store
            .find(key.uuid, &key.locale, key.target.workspace())
            .await?;

        match found {
            Some(Document::Article(article))
                if key.target == IndexTarget::Draft || !article.is_ghost() =>
            {
                index.upsert(self.projection.to_view_document(&article)).await?;
                Ok(true)
            }
            Some(Document::Page(page)) => {
                tracing::warn!(uuid = %page.uuid, "Pages are indexed through their article, skipping");
                Ok(false)
            }
            _ => {
                index.remove(&view_document_id(key.uuid, &key.locale)).await?;
                Ok(false)
            }
        }
    }

    /// Remove a document from `target` in the given locales and commit.
    pub async fn remove_now(
        &self,
        target: IndexTarget,
        uuid: DocumentId,
        locales: &[String],
    ) -> Result<(), CoreError> {
        let index = self.index(target);
        for locale in locales {
            index.remove(&view_document_id(uuid, locale)).await?;
        }
        index.commit().await?;
        tracing::debug!(uuid = %uuid, target = %target, locales = locales.len(), "Removed from index");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// IndexScheduler
// ---------------------------------------------------------------------------

/// Deduplicating buffer of index writes for one request.
#[derive(Debug, Default)]
pub struct IndexScheduler {
    pending: BTreeSet<IndexKey>,
    deferred: BTreeSet<IndexKey>,
}

impl IndexScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the key was already scheduled.
    pub fn schedule(&mut self, uuid: DocumentId, locale: &str, target: IndexTarget) -> bool {
        self.pending.insert(IndexKey::new(uuid, locale, target))
    }

    /// Schedule a key that can only be indexed after the content store has
    /// flushed, such as a fresh copy.
    pub fn defer(&mut self, uuid: DocumentId, locale: &str, target: IndexTarget) {
        self.deferred.insert(IndexKey::new(uuid, locale, target));
    }

    pub fn unschedule(&mut self, uuid: DocumentId, locale: &str, target: IndexTarget) {
        let key = IndexKey::new(uuid, locale, target);
        self.pending.remove(&key);
        self.deferred.remove(&key);
    }

    /// Drop every key of `uuid`, in all locales and targets.
    pub fn forget(&mut self, uuid: DocumentId) {
        self.pending.retain(|k| k.uuid != uuid);
        self.deferred.retain(|k| k.uuid != uuid);
    }

    pub fn release_deferred(&mut self) {
        self.pending.append(&mut self.deferred);
    }

    pub fn is_scheduled(&self, uuid: DocumentId, locale: &str, target: IndexTarget) -> bool {
        self.pending.contains(&IndexKey::new(uuid, locale, target))
    }

    pub fn is_deferred(&self, uuid: DocumentId, locale: &str, target: IndexTarget) -> bool {
        self.deferred.contains(&IndexKey::new(uuid, locale, target))
    }

    pub fn len(&self) -> usize {
        self.pending.len() + self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reindex every pending key once, then commit each target that had
    /// work. Deferred keys stay buffered. Returns the number of upserts.
    pub async fn flush(&mut self, indexer: &Indexer) -> Result<usize, CoreError> {
        let pending = std::mem::take(&mut self.pending);
        let mut upserts = 0;

        for target in [IndexTarget::Draft, IndexTarget::Live] {
            let mut touched = false;
            for key in pending.iter().filter(|k| k.target == target) {
                if indexer.reindex(key).await? {
                    upserts += 1;
                }
                touched = true;
            }
            if touched {
                indexer.index(target).commit().await?;
            }
        }

        if !pending.is_empty() {
            tracing::debug!(keys = pending.len(), upserts, "Index scheduler flushed");
        }
        Ok(upserts)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.deferred.clear();
    }
}

#[cfg(test)]
mod tests {
    use pressroom_core::document::{Article, DocumentKind};
    use pressroom_core::memory::{MemoryContentStore, MemorySearchIndex};
    use pressroom_core::types::Workspace;
    use pressroom_core::view::DefaultProjectionBuilder;

    use super::*;

    struct Fixture {
        store: Arc<MemoryContentStore>,
        draft: Arc<MemorySearchIndex>,
        live: Arc<MemorySearchIndex>,
        indexer: Indexer,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryContentStore::new());
        let draft = Arc::new(MemorySearchIndex::new());
        let live = Arc::new(MemorySearchIndex::new());
        let indexer = Indexer::new(
            store.clone(),
            Arc::new(DefaultProjectionBuilder::new(None)),
            draft.clone(),
            live.clone(),
        );
        Fixture {
            store,
            draft,
            live,
            indexer,
        }
    }

    async fn stored_article(store: &MemoryContentStore) -> DocumentId {
        let id = store.create_node(DocumentKind::Article, None).await.unwrap();
        let mut article = Article::new("de", "Hello", "default");
        article.uuid = id;
        store.save(&article.into(), Workspace::Draft).await.unwrap();
        id
    }

    #[tokio::test]
    async fn repeated_scheduling_writes_once() {
        let f = fixture();
        let id = stored_article(&f.store).await;

        let mut scheduler = IndexScheduler::new();
        assert!(scheduler.schedule(id, "de", IndexTarget::Draft));
        for _ in 0..4 {
            assert!(!scheduler.schedule(id, "de", IndexTarget::Draft));
        }

        assert_eq!(scheduler.flush(&f.indexer).await.unwrap(), 1);
        assert_eq!(f.draft.upsert_count().await, 1);
        assert_eq!(f.draft.commit_count().await, 1);
        assert_eq!(f.live.commit_count().await, 0);
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn missing_live_document_is_removed_instead_of_indexed() {
        let f = fixture();
        let id = stored_article(&f.store).await;

        let mut scheduler = IndexScheduler::new();
        scheduler.schedule(id, "de", IndexTarget::Live);
        assert_eq!(scheduler.flush(&f.indexer).await.unwrap(), 0);
        assert!(!f.live.contains(id, "de").await);
        assert_eq!(f.live.removal_count().await, 1);
    }

    #[tokio::test]
    async fn deferred_keys_wait_for_release() {
        let f = fixture();
        let id = stored_article(&f.store).await;

        let mut scheduler = IndexScheduler::new();
        scheduler.defer(id, "de", IndexTarget::Draft);
        assert_eq!(scheduler.flush(&f.indexer).await.unwrap(), 0);
        assert!(scheduler.is_deferred(id, "de", IndexTarget::Draft));

        scheduler.release_deferred();
        assert_eq!(scheduler.flush(&f.indexer).await.unwrap(), 1);
        assert!(f.draft.contains(id, "de").await);
    }

    #[tokio::test]
    async fn remove_now_commits_immediately() {
        let f = fixture();
        let id = stored_article(&f.store).await;
        let mut scheduler = IndexScheduler::new();
        scheduler.schedule(id, "de", IndexTarget::Draft);
        scheduler.flush(&f.indexer).await.unwrap();

        f.indexer
            .remove_now(IndexTarget::Draft, id, &["de".to_string()])
            .await
            .unwrap();
        assert!(!f.draft.contains(id, "de").await);
        assert_eq!(f.draft.commit_count().await, 2);
    }
}
