//! End-to-end lifecycle tests against in-memory collaborators.

mod common;

use assert_matches::assert_matches;
use common::{as_article, create_article, harness};
use pressroom_core::document::{Article, Localized, WorkflowStage};
use pressroom_core::store::ContentStore;
use pressroom_core::types::Workspace;
use pressroom_core::CoreError;
use pressroom_events::DomainEventType;

// ---------------------------------------------------------------------------
// Test: create and publish an article
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_publish_registers_route_and_indexes_both_targets() {
    let mut h = harness();
    let mut session = h.pipeline.session();

    let id = create_article(&mut session, "Hello").await;
    session.publish(id, "de").await.unwrap();
    session.flush().await.unwrap();

    let routes = h.routes.all().await;
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].path, "/articles/hello");
    assert_eq!(routes[0].locale, "de");
    assert!(!routes[0].history);
    assert_eq!(routes[0].entity.entity_id, id);

    assert!(h.draft_index.contains(id, "de").await);
    let live = h.live_index.find(id, "de").await.expect("live projection");
    assert_eq!(live.workflow_stage, WorkflowStage::Published);
    assert_eq!(live.route_path.as_deref(), Some("/articles/hello"));

    let stored = as_article(h.store.find(id, "de", Workspace::Live).await.unwrap());
    assert_eq!(stored.workflow_stage, WorkflowStage::Published);
    assert!(stored.published.is_some());

    let types: Vec<_> = h.drain_events().iter().map(|e| e.event_type).collect();
    assert_eq!(types, vec![DomainEventType::Created, DomainEventType::Published]);
}

// ---------------------------------------------------------------------------
// Test: persisting only reserves a path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_persist_reserves_path_without_registering() {
    let h = harness();
    let mut session = h.pipeline.session();

    let id = create_article(&mut session, "Hello").await;
    session.flush().await.unwrap();

    let draft = as_article(h.store.find(id, "de", Workspace::Draft).await.unwrap());
    assert_eq!(draft.route_path.as_deref(), Some("/articles/hello"));
    assert_eq!(draft.workflow_stage, WorkflowStage::Draft);
    assert!(h.routes.is_empty().await);
    assert!(h.draft_index.contains(id, "de").await);
    assert!(!h.live_index.contains(id, "de").await);
}

// ---------------------------------------------------------------------------
// Test: a route hint replaces the generated path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_route_hint_replaces_generated_path() {
    let h = harness();
    let mut session = h.pipeline.session();

    let document = session
        .persist(
            Article::new("de", "Hello", "default").into(),
            Some("custom//path/"),
        )
        .await
        .unwrap();
    assert_eq!(document.routable().route_path(), Some("/custom/path"));
}

// ---------------------------------------------------------------------------
// Test: unpublish
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unpublish_removes_live_projection_and_keeps_route() {
    let mut h = harness();
    let mut session = h.pipeline.session();
    let id = create_article(&mut session, "Hello").await;
    session.publish(id, "de").await.unwrap();
    session.flush().await.unwrap();

    let mut session = h.pipeline.session();
    session.unpublish(id, "de").await.unwrap();
    session.flush().await.unwrap();

    assert!(!h.live_index.contains(id, "de").await);
    let draft = h.draft_index.find(id, "de").await.expect("draft projection");
    assert_eq!(draft.workflow_stage, WorkflowStage::Draft);
    assert!(h.store.find(id, "de", Workspace::Live).await.unwrap().is_none());
    assert_eq!(h.routes.len().await, 1);

    let types: Vec<_> = h.drain_events().iter().map(|e| e.event_type).collect();
    assert_eq!(types.last(), Some(&DomainEventType::Unpublished));
}

// ---------------------------------------------------------------------------
// Test: route conflicts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_second_article_with_taken_path_conflicts() {
    let h = harness();
    let mut session = h.pipeline.session();
    let first = create_article(&mut session, "Hello").await;
    session.publish(first, "de").await.unwrap();

    let err = session
        .persist(
            Article::new("de", "Hello", "default").into(),
            None,
        )
        .await;
    assert_matches!(err, Err(CoreError::RouteConflict { path, locale }) if path == "/articles/hello" && locale == "de");
}

#[tokio::test]
async fn test_publish_conflict_is_fatal() {
    let h = harness();
    let mut session = h.pipeline.session();

    // Both drafts reserve the same free path.
    let first = create_article(&mut session, "Hello").await;
    let second = create_article(&mut session, "Hello").await;

    session.publish(first, "de").await.unwrap();
    let err = session.publish(second, "de").await;
    assert_matches!(err, Err(CoreError::RouteConflict { .. }));

    assert!(!h.store.node_exists(second, Workspace::Live).await.unwrap());
    let routes = h.routes.all().await;
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].entity.entity_id, first);
}

#[tokio::test]
async fn test_page_conflict_undoes_article_route() {
    let mut h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Y").await;
    common::add_page(&mut session, article, "Two").await;
    let squatter = session
        .persist(
            Article::new("de", "X", "default").into(),
            Some("/articles/y/page-2"),
        )
        .await
        .unwrap()
        .uuid();
    session.publish(squatter, "de").await.unwrap();

    let err = session.publish(article, "de").await;
    assert_matches!(err, Err(CoreError::RouteConflict { path, .. }) if path == "/articles/y/page-2");
    session.flush().await.unwrap();

    assert!(!h.store.node_exists(article, Workspace::Live).await.unwrap());
    let routes = h.routes.all().await;
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].entity.entity_id, squatter);
    assert_eq!(routes[0].path, "/articles/y/page-2");

    // The draft written before the failed publish is still indexed.
    assert!(h.draft_index.contains(article, "de").await);
    assert!(!h.live_index.contains(article, "de").await);

    let events = h.drain_events();
    let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            DomainEventType::Created,
            DomainEventType::Created,
            DomainEventType::Published
        ]
    );
    assert_eq!(events[2].aggregate_id, squatter);
}

#[tokio::test]
async fn test_session_continues_after_failed_publish() {
    let h = harness();
    let mut session = h.pipeline.session();
    let article = create_article(&mut session, "Y").await;
    let page = common::add_page(&mut session, article, "Two").await;
    let squatter = session
        .persist(
            Article::new("de", "X", "default").into(),
            Some("/articles/y/page-2"),
        )
        .await
        .unwrap();
    session.publish(squatter.uuid(), "de").await.unwrap();
    assert!(session.publish(article, "de").await.is_err());

    let draft = session
        .find(squatter.uuid(), "de", Workspace::Draft)
        .await
        .unwrap()
        .unwrap();
    session.persist(draft, Some("/articles/x")).await.unwrap();
    session.publish(squatter.uuid(), "de").await.unwrap();
    session.publish(article, "de").await.unwrap();
    session.flush().await.unwrap();

    let page_route = h
        .pipeline
        .resolve("/articles/y/page-2", "de")
        .await
        .unwrap()
        .expect("page path registered");
    assert_eq!(page_route.entity.entity_id, page);
    let moved = h
        .pipeline
        .resolve("/articles/x", "de")
        .await
        .unwrap()
        .expect("moved path registered");
    assert_eq!(moved.entity.entity_id, squatter.uuid());
    assert!(h.live_index.contains(article, "de").await);
}

#[tokio::test]
async fn test_sessions_keep_separate_route_transactions() {
    let h = harness();
    let mut first = h.pipeline.session();
    let mut second = h.pipeline.session();

    let kept = create_article(&mut first, "Kept").await;
    first.publish(kept, "de").await.unwrap();
    let dropped = create_article(&mut second, "Dropped").await;
    second.publish(dropped, "de").await.unwrap();

    second.discard().await.unwrap();
    first.flush().await.unwrap();

    let routes = h.routes.all().await;
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].entity.entity_id, kept);
    assert_eq!(routes[0].path, "/articles/kept");
}

#[tokio::test]
async fn test_same_path_in_other_locale_is_free() {
    let h = harness();
    let mut session = h.pipeline.session();
    let id = create_article(&mut session, "Hello").await;
    session.publish(id, "de").await.unwrap();

    let ghost = session.find(id, "en", Workspace::Draft).await.unwrap().unwrap();
    assert!(ghost.is_ghost());
    let english = session.persist(ghost, None).await.unwrap();
    assert_eq!(english.routable().route_path(), Some("/articles/hello"));
    assert!(!english.is_ghost());
}

// ---------------------------------------------------------------------------
// Test: index writes are deduplicated per request
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_repeated_persists_write_the_index_once() {
    let h = harness();
    let mut session = h.pipeline.session();
    let id = create_article(&mut session, "Hello").await;

    for title in ["Hello", "Hello", "Hello", "Hello"] {
        let mut document = session.find(id, "de", Workspace::Draft).await.unwrap().unwrap();
        if let Some(article) = document.as_article_mut() {
            article.title = title.to_string();
        }
        session.persist(document, None).await.unwrap();
    }
    assert_eq!(session.context().index.len(), 1);
    session.flush().await.unwrap();

    assert_eq!(h.draft_index.upsert_count().await, 1);
    assert_eq!(h.draft_index.commit_count().await, 1);
    assert_eq!(h.live_index.commit_count().await, 0);
    assert_eq!(h.store.flush_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: domain event classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_persist_events_are_classified() {
    let mut h = harness();
    let mut session = h.pipeline.session();

    let id = create_article(&mut session, "Hello").await;
    let document = session.find(id, "de", Workspace::Draft).await.unwrap().unwrap();
    session.persist(document, None).await.unwrap();
    let ghost = session.find(id, "en", Workspace::Draft).await.unwrap().unwrap();
    session.persist(ghost, None).await.unwrap();

    assert!(h.events.try_recv().is_err(), "nothing is dispatched before flush");
    session.flush().await.unwrap();

    let events = h.drain_events();
    let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            DomainEventType::Created,
            DomainEventType::Modified,
            DomainEventType::TranslationAdded
        ]
    );
    assert_eq!(events[2].locale.as_deref(), Some("en"));
    assert_eq!(events[0].payload["title"], "Hello");
}

#[tokio::test]
async fn test_failed_persist_records_nothing() {
    let mut h = harness();
    let mut session = h.pipeline.session();
    let err = session
        .persist(
            Article::new("de", "Hello", "unknown").into(),
            None,
        )
        .await;
    assert_matches!(err, Err(CoreError::StructureTypeNotFound(_)));

    create_article(&mut session, "Other").await;
    session.flush().await.unwrap();
    let types: Vec<_> = h.drain_events().iter().map(|e| e.event_type).collect();
    assert_eq!(types, vec![DomainEventType::Created]);
}

// ---------------------------------------------------------------------------
// Test: removal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_remove_clears_routes_and_indices() {
    let mut h = harness();
    let mut session = h.pipeline.session();
    let id = create_article(&mut session, "Hello").await;
    common::add_page(&mut session, id, "Two").await;
    session.publish(id, "de").await.unwrap();
    session.flush().await.unwrap();
    assert_eq!(h.routes.len().await, 2);

    let mut session = h.pipeline.session();
    session.remove(id).await.unwrap();
    session.flush().await.unwrap();

    assert!(h.routes.is_empty().await);
    assert!(!h.draft_index.contains(id, "de").await);
    assert!(!h.live_index.contains(id, "de").await);
    assert!(!h.store.node_exists(id, Workspace::Draft).await.unwrap());

    let types: Vec<_> = h.drain_events().iter().map(|e| e.event_type).collect();
    assert_eq!(types.last(), Some(&DomainEventType::Removed));
}

#[tokio::test]
async fn test_discarded_session_writes_nothing() {
    let h = harness();
    let mut session = h.pipeline.session();
    let id = create_article(&mut session, "Hello").await;
    session.publish(id, "de").await.unwrap();
    assert_eq!(h.routes.len().await, 1);

    session.discard().await.unwrap();
    session.flush().await.unwrap();

    assert!(!h.draft_index.contains(id, "de").await);
    assert!(h.routes.is_empty().await);
    assert_eq!(h.routes.flush_count().await, 0);
}
