#![allow(dead_code)]

use std::sync::Arc;

use pressroom_core::document::{Article, ArticlePage, Document};
use pressroom_core::memory::{
    MemoryContentStore, MemoryPageTree, MemoryRouteRepository, MemorySearchIndex,
};
use pressroom_core::types::DocumentId;
use pressroom_events::{DomainEvent, EventBus};
use pressroom_pipeline::{Collaborators, ContentPipeline, DocumentSession, PublishingConfig};
use tokio::sync::broadcast;

/// An in-memory pipeline with handles on every collaborator.
pub struct Harness {
    pub pipeline: ContentPipeline,
    pub store: Arc<MemoryContentStore>,
    pub routes: Arc<MemoryRouteRepository>,
    pub page_tree: Arc<MemoryPageTree>,
    pub draft_index: Arc<MemorySearchIndex>,
    pub live_index: Arc<MemorySearchIndex>,
    pub events: broadcast::Receiver<DomainEvent>,
}

/// Build a harness with the default configuration.
pub fn harness() -> Harness {
    harness_with(PublishingConfig::default())
}

pub fn harness_with(config: PublishingConfig) -> Harness {
    let store = Arc::new(MemoryContentStore::new());
    let routes = Arc::new(MemoryRouteRepository::new());
    let page_tree = Arc::new(MemoryPageTree::new());
    let draft_index = Arc::new(MemorySearchIndex::new());
    let live_index = Arc::new(MemorySearchIndex::new());
    let bus = Arc::new(EventBus::default());
    let events = bus.subscribe();

    let pipeline = ContentPipeline::new(
        config,
        Collaborators {
            store: store.clone(),
            routes: routes.clone(),
            page_tree: page_tree.clone(),
            draft_index: draft_index.clone(),
            live_index: live_index.clone(),
            events: bus,
            projection: None,
        },
    )
    .expect("pipeline should build");

    Harness {
        pipeline,
        store,
        routes,
        page_tree,
        draft_index,
        live_index,
        events,
    }
}

impl Harness {
    /// Every domain event dispatched so far.
    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        let mut received = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            received.push(event);
        }
        received
    }
}

/// Persist a new article and return its id.
pub async fn create_article(session: &mut DocumentSession<'_>, title: &str) -> DocumentId {
    session
        .persist(Article::new("de", title, "default").into(), None)
        .await
        .expect("article should persist")
        .uuid()
}

/// Persist a new page below `article` and return its id.
pub async fn add_page(session: &mut DocumentSession<'_>, article: DocumentId, title: &str) -> DocumentId {
    session
        .persist(ArticlePage::new(article, "de", title).into(), None)
        .await
        .expect("page should persist")
        .uuid()
}

pub fn as_page(document: Option<Document>) -> ArticlePage {
    match document {
        Some(Document::Page(page)) => page,
        other => panic!("expected a page, got {other:?}"),
    }
}

pub fn as_article(document: Option<Document>) -> Article {
    match document {
        Some(Document::Article(article)) => article,
        other => panic!("expected an article, got {other:?}"),
    }
}
