use std::sync::Arc;

use assert_matches::assert_matches;
use pressroom_core::route::{EntityRef, Route, RouteRepository, RouteStore};
use pressroom_core::route_manager::{RouteConflictPolicy, RouteManager};
use pressroom_core::types::DocumentId;
use pressroom_core::CoreError;
use pressroom_db::repositories::PgRouteRepository;

fn article(id: DocumentId) -> EntityRef {
    EntityRef::new("article", id)
}

// ---------------------------------------------------------------------------
// Test: saved routes are visible after flush
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_flush_commits_routes(pool: sqlx::PgPool) {
    let repo = PgRouteRepository::new(pool.clone());
    let entity = article(DocumentId::new_v4());
    let saved = repo
        .save(Route::new("/articles/hello", "de", entity.clone()))
        .await
        .unwrap();
    assert!(saved.id.is_some());
    repo.flush().await.unwrap();

    let reader = PgRouteRepository::new(pool);
    let found = reader
        .find_by_path("/articles/hello", "de")
        .await
        .unwrap()
        .expect("route should be committed");
    assert_eq!(found.entity, entity);
    assert!(!found.history);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rollback_discards_pending_routes(pool: sqlx::PgPool) {
    let repo = PgRouteRepository::new(pool.clone());
    repo.save(Route::new("/articles/hello", "de", article(DocumentId::new_v4())))
        .await
        .unwrap();
    repo.rollback().await.unwrap();

    let reader = PgRouteRepository::new(pool);
    assert!(reader
        .find_by_path("/articles/hello", "de")
        .await
        .unwrap()
        .is_none());
}

// ---------------------------------------------------------------------------
// Test: uniqueness per path and locale
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_path_is_a_route_conflict(pool: sqlx::PgPool) {
    let repo = PgRouteRepository::new(pool.clone());
    repo.save(Route::new("/articles/hello", "de", article(DocumentId::new_v4())))
        .await
        .unwrap();
    repo.flush().await.unwrap();

    let other = PgRouteRepository::new(pool);
    let err = other
        .save(Route::new("/articles/hello", "de", article(DocumentId::new_v4())))
        .await;
    assert_matches!(err, Err(CoreError::RouteConflict { path, .. }) if path == "/articles/hello");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_same_path_in_other_locale_is_allowed(pool: sqlx::PgPool) {
    let repo = PgRouteRepository::new(pool);
    let entity = article(DocumentId::new_v4());
    repo.save(Route::new("/articles/hello", "de", entity.clone()))
        .await
        .unwrap();
    repo.save(Route::new("/articles/hello", "en", entity))
        .await
        .unwrap();
    repo.flush().await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_conflict_leaves_transaction_usable(pool: sqlx::PgPool) {
    let repo = PgRouteRepository::new(pool.clone());
    repo.save(Route::new("/articles/hello", "de", article(DocumentId::new_v4())))
        .await
        .unwrap();

    let err = repo
        .save(Route::new("/articles/hello", "de", article(DocumentId::new_v4())))
        .await;
    assert_matches!(err, Err(CoreError::RouteConflict { .. }));

    repo.save(Route::new("/articles/other", "de", article(DocumentId::new_v4())))
        .await
        .unwrap();
    repo.flush().await.unwrap();

    let reader = PgRouteRepository::new(pool);
    assert!(reader.find_by_path("/articles/hello", "de").await.unwrap().is_some());
    assert!(reader.find_by_path("/articles/other", "de").await.unwrap().is_some());
}

// ---------------------------------------------------------------------------
// Test: transactions per handle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_handles_do_not_commit_each_other(pool: sqlx::PgPool) {
    let store = PgRouteRepository::new(pool.clone());
    let first = store.begin().await.unwrap();
    let second = store.begin().await.unwrap();

    first
        .save(Route::new("/articles/first", "de", article(DocumentId::new_v4())))
        .await
        .unwrap();
    second
        .save(Route::new("/articles/second", "de", article(DocumentId::new_v4())))
        .await
        .unwrap();
    assert!(second
        .find_by_path("/articles/first", "de")
        .await
        .unwrap()
        .is_none());

    first.flush().await.unwrap();
    second.rollback().await.unwrap();

    let reader = PgRouteRepository::new(pool);
    assert!(reader.find_by_path("/articles/first", "de").await.unwrap().is_some());
    assert!(reader.find_by_path("/articles/second", "de").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rollback_to_savepoint_keeps_earlier_writes(pool: sqlx::PgPool) {
    let repo = PgRouteRepository::new(pool.clone());
    repo.save(Route::new("/articles/kept", "de", article(DocumentId::new_v4())))
        .await
        .unwrap();

    repo.savepoint().await.unwrap();
    repo.save(Route::new("/articles/undone", "de", article(DocumentId::new_v4())))
        .await
        .unwrap();
    repo.rollback_to_savepoint().await.unwrap();
    repo.flush().await.unwrap();

    let reader = PgRouteRepository::new(pool);
    assert!(reader.find_by_path("/articles/kept", "de").await.unwrap().is_some());
    assert!(reader.find_by_path("/articles/undone", "de").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: route manager on PostgreSQL
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_moved_route_redirects_through_history(pool: sqlx::PgPool) {
    let manager = RouteManager::new(Arc::new(PgRouteRepository::new(pool)));
    let entity = article(DocumentId::new_v4());

    manager
        .create_or_update(&entity, "de", "/articles/hello", RouteConflictPolicy::Reject)
        .await
        .unwrap();
    let moved = manager
        .create_or_update(&entity, "de", "/articles/hello-world", RouteConflictPolicy::Reject)
        .await
        .unwrap();
    manager.flush().await.unwrap();

    let resolved = manager
        .resolve("/articles/hello", "de")
        .await
        .unwrap()
        .expect("old path should resolve");
    assert_eq!(resolved.id, moved.id);
    assert_eq!(resolved.path, "/articles/hello-world");
}
