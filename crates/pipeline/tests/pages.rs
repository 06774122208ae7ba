mod common;

use assert_matches::assert_matches;
use common::{add_page, as_article, as_page, create_article, harness};
use pressroom_core::route::RouteRepository;
use pressroom_core::store::ContentStore;
use pressroom_core::document::ArticlePage;
use pressroom_core::index::IndexTarget;
use pressroom_core::types::{DocumentId, Workspace};
use pressroom_core::CoreError;
use pressroom_events::DomainEventType;

// ---------------------------------------------------------------------------
// Test: page numbers and paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pages_are_numbered_after_the_article() {
    let h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Hello").await;
    let first = add_page(&mut session, article, "One").await;
    let second = add_page(&mut session, article, "Two").await;

    let first = as_page(h.store.find(first, "de", Workspace::Draft).await.unwrap());
    let second = as_page(h.store.find(second, "de", Workspace::Draft).await.unwrap());
    assert_eq!(first.page_number, 2);
    assert_eq!(second.page_number, 3);
    assert_eq!(first.route_path.as_deref(), Some("/articles/hello/page-2"));
    assert_eq!(second.route_path.as_deref(), Some("/articles/hello/page-3"));
    assert_eq!(first.structure_type, "default");

    let parent = as_article(h.store.find(article, "de", Workspace::Draft).await.unwrap());
    let summary: Vec<_> = parent.pages.iter().map(|p| p.uuid).collect();
    assert_eq!(summary, vec![first.uuid, second.uuid]);
}

#[tokio::test]
async fn test_page_cannot_be_published_before_its_article() {
    let h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Hello").await;
    let page = add_page(&mut session, article, "One").await;

    let err = session.publish(page, "de").await;
    assert_matches!(err, Err(CoreError::Validation(_)));
    assert!(h.routes.is_empty().await);
}

#[tokio::test]
async fn test_page_of_unknown_article_is_rejected() {
    let h = harness();
    let mut session = h.pipeline.session();
    let missing = DocumentId::new_v4();
    let err = session
        .persist(
            ArticlePage::new(missing, "de", "Orphan").into(),
            None,
        )
        .await;
    assert_matches!(err, Err(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Test: reorder
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_reorder_renumbers_and_moves_paths() {
    let h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Hello").await;
    let first = add_page(&mut session, article, "One").await;
    let second = add_page(&mut session, article, "Two").await;
    session.flush().await.unwrap();

    let mut session = h.pipeline.session();
    session.reorder(second, 0).await.unwrap();
    assert!(session
        .context()
        .index
        .is_scheduled(article, "de", IndexTarget::Draft));

    let moved = as_page(h.store.find(second, "de", Workspace::Draft).await.unwrap());
    let pushed = as_page(h.store.find(first, "de", Workspace::Draft).await.unwrap());
    assert_eq!(moved.page_number, 2);
    assert_eq!(moved.route_path.as_deref(), Some("/articles/hello/page-2"));
    assert_eq!(pushed.page_number, 3);
    assert_eq!(pushed.route_path.as_deref(), Some("/articles/hello/page-3"));

    let parent = as_article(h.store.find(article, "de", Workspace::Draft).await.unwrap());
    let summary: Vec<_> = parent.pages.iter().map(|p| p.uuid).collect();
    assert_eq!(summary, vec![second, first]);
}

#[tokio::test]
async fn test_only_pages_can_be_reordered() {
    let h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Hello").await;
    assert_matches!(
        session.reorder(article, 0).await,
        Err(CoreError::Validation(_))
    );
}

// ---------------------------------------------------------------------------
// Test: removing a page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_removed_page_hands_its_path_to_the_next_page() {
    let mut h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Hello").await;
    let first = add_page(&mut session, article, "One").await;
    let second = add_page(&mut session, article, "Two").await;
    session.publish(article, "de").await.unwrap();
    session.flush().await.unwrap();
    h.drain_events();

    let mut session = h.pipeline.session();
    session.remove(first).await.unwrap();
    session.flush().await.unwrap();

    for workspace in [Workspace::Draft, Workspace::Live] {
        let remaining = as_page(h.store.find(second, "de", workspace).await.unwrap());
        assert_eq!(remaining.page_number, 2);
        assert_eq!(remaining.route_path.as_deref(), Some("/articles/hello/page-2"));
    }

    let old = h
        .pipeline
        .resolve("/articles/hello/page-3", "de")
        .await
        .unwrap()
        .expect("old page path still resolves");
    assert_eq!(old.entity.entity_id, second);
    assert_eq!(old.path, "/articles/hello/page-2");
    assert!(h
        .routes
        .find_by_path("/articles/hello/page-3", "de")
        .await
        .unwrap()
        .is_some_and(|r| r.history));

    let live = h.live_index.find(article, "de").await.expect("live projection");
    assert_eq!(live.pages.len(), 1);
    assert_eq!(live.pages[0].uuid, second);

    // Pages never produce domain events of their own.
    assert!(h.drain_events().is_empty());
}

#[tokio::test]
async fn test_new_draft_page_takes_over_path_of_dropped_live_page() {
    let h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Hello").await;
    let dropped = add_page(&mut session, article, "One").await;
    session.publish(article, "de").await.unwrap();

    h.store.remove_node(dropped, Workspace::Draft).await.unwrap();
    let replacement = add_page(&mut session, article, "Uno").await;
    session.publish(article, "de").await.unwrap();
    session.flush().await.unwrap();

    assert_eq!(
        h.store.children(article, Workspace::Live).await.unwrap(),
        vec![replacement]
    );
    let route = h
        .pipeline
        .resolve("/articles/hello/page-2", "de")
        .await
        .unwrap()
        .expect("page path stays registered");
    assert_eq!(route.entity.entity_id, replacement);
}

// ---------------------------------------------------------------------------
// Test: restore
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_restore_brings_back_pages_in_published_order() {
    let mut h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Hello").await;
    let first = add_page(&mut session, article, "One").await;
    let second = add_page(&mut session, article, "Two").await;
    session.publish(article, "de").await.unwrap();
    session.remove(first).await.unwrap();
    session.flush().await.unwrap();
    h.drain_events();

    let mut session = h.pipeline.session();
    let restored = session.restore(article, "de", 1).await.unwrap();
    session.flush().await.unwrap();

    let summary: Vec<_> = restored
        .as_article()
        .map(|a| a.pages.iter().map(|p| p.uuid).collect())
        .unwrap_or_default();
    assert_eq!(summary, vec![first, second]);

    let first = as_page(h.store.find(first, "de", Workspace::Draft).await.unwrap());
    let second = as_page(h.store.find(second, "de", Workspace::Draft).await.unwrap());
    assert_eq!(first.page_number, 2);
    assert_eq!(second.page_number, 3);
    assert_eq!(first.route_path.as_deref(), Some("/articles/hello/page-2"));

    let events = h.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, DomainEventType::VersionRestored);
    assert_eq!(events[0].payload["version"], 1);
}

#[tokio::test]
async fn test_unknown_version_is_not_found() {
    let h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Hello").await;
    assert_matches!(
        session.restore(article, "de", 7).await,
        Err(CoreError::NotFound { .. })
    );
}
