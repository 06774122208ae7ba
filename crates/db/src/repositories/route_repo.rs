//! Repository for the `routes` table.

use std::sync::Arc;

use async_trait::async_trait;
use pressroom_core::route::{EntityRef, Route, RouteRepository, RouteStore};
use pressroom_core::types::{DocumentId, RouteId};
use pressroom_core::CoreError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{storage, DbError};
use crate::models::route::RouteRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, path, locale, entity_type, entity_id, history, target_id, created_at";

// ---------------------------------------------------------------------------
// RouteRepo
// ---------------------------------------------------------------------------

/// Query methods for route rows. Every method runs on the given connection
/// so callers control the transaction.
pub struct RouteRepo;

impl RouteRepo {
    /// The row stored for `(path, locale)`, current or history.
    pub async fn find_by_path(
        conn: &mut PgConnection,
        path: &str,
        locale: &str,
    ) -> Result<Option<RouteRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM routes WHERE path = $1 AND locale = $2");
        sqlx::query_as::<_, RouteRow>(&query)
            .bind(path)
            .bind(locale)
            .fetch_optional(conn)
            .await
    }

    /// The current row of an entity in one locale.
    pub async fn find_current_by_entity(
        conn: &mut PgConnection,
        entity_type: &str,
        entity_id: DocumentId,
        locale: &str,
    ) -> Result<Option<RouteRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM routes
             WHERE entity_type = $1 AND entity_id = $2 AND locale = $3 AND NOT history
             ORDER BY id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, RouteRow>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .bind(locale)
            .fetch_optional(conn)
            .await
    }

    /// History rows of an entity in one locale, oldest first.
    pub async fn find_history_by_entity(
        conn: &mut PgConnection,
        entity_type: &str,
        entity_id: DocumentId,
        locale: &str,
    ) -> Result<Vec<RouteRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM routes
             WHERE entity_type = $1 AND entity_id = $2 AND locale = $3 AND history
             ORDER BY id"
        );
        sqlx::query_as::<_, RouteRow>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .bind(locale)
            .fetch_all(conn)
            .await
    }

    /// History rows redirecting to `target_id`.
    pub async fn find_history_by_target(
        conn: &mut PgConnection,
        target_id: RouteId,
    ) -> Result<Vec<RouteRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM routes WHERE target_id = $1 AND history ORDER BY id");
        sqlx::query_as::<_, RouteRow>(&query)
            .bind(target_id)
            .fetch_all(conn)
            .await
    }

    /// Every row of an entity in every locale.
    pub async fn find_all_by_entity(
        conn: &mut PgConnection,
        entity_type: &str,
        entity_id: DocumentId,
    ) -> Result<Vec<RouteRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM routes WHERE entity_type = $1 AND entity_id = $2 ORDER BY id"
        );
        sqlx::query_as::<_, RouteRow>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(conn)
            .await
    }

    /// Insert a new row, returning it.
    pub async fn insert(conn: &mut PgConnection, route: &Route) -> Result<RouteRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO routes (path, locale, entity_type, entity_id, history, target_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RouteRow>(&query)
            .bind(&route.path)
            .bind(&route.locale)
            .bind(&route.entity.entity_type)
            .bind(route.entity.entity_id)
            .bind(route.history)
            .bind(route.target)
            .bind(route.created)
            .fetch_one(conn)
            .await
    }

    /// Update an existing row. Returns `None` if no row with `id` exists.
    pub async fn update(
        conn: &mut PgConnection,
        id: RouteId,
        route: &Route,
    ) -> Result<Option<RouteRow>, sqlx::Error> {
        let query = format!(
            "UPDATE routes SET
                path = $2,
                locale = $3,
                entity_type = $4,
                entity_id = $5,
                history = $6,
                target_id = $7,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RouteRow>(&query)
            .bind(id)
            .bind(&route.path)
            .bind(&route.locale)
            .bind(&route.entity.entity_type)
            .bind(route.entity.entity_id)
            .bind(route.history)
            .bind(route.target)
            .fetch_optional(conn)
            .await
    }

    /// Delete a row. Returns `true` if a row was removed.
    pub async fn delete(conn: &mut PgConnection, id: RouteId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// PgRouteRepository
// ---------------------------------------------------------------------------

/// The open transaction of one handle and its savepoint depth.
#[derive(Default)]
struct TxState {
    tx: Option<Transaction<'static, Postgres>>,
    savepoints: usize,
}

/// [`RouteRepository`] backed by PostgreSQL.
///
/// Each handle owns one transaction, begun lazily by its first call.
/// [`flush`](RouteRepository::flush) commits it; dropping the handle rolls
/// it back. [`begin`](RouteStore::begin) hands out a fresh handle on the
/// same pool, so requests never see each other's pending writes.
pub struct PgRouteRepository {
    pool: PgPool,
    state: Mutex<TxState>,
}

impl PgRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            state: Mutex::new(TxState::default()),
        }
    }

    /// Lock the handle's state, beginning a transaction if none is open.
    async fn transaction(&self) -> Result<MutexGuard<'_, TxState>, CoreError> {
        let mut state = self.state.lock().await;
        if state.tx.is_none() {
            state.tx = Some(self.pool.begin().await.map_err(storage)?);
            tracing::debug!("Route transaction opened");
        }
        Ok(state)
    }

    /// Close the innermost operation savepoint, undoing its writes first
    /// when `undo` is set.
    async fn close_savepoint(&self, undo: bool) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        let depth = state.savepoints;
        if depth == 0 {
            return Err(CoreError::Internal("no route savepoint is open".to_string()));
        }
        let conn = open(&mut state)?;
        if undo {
            execute(&mut *conn, &format!("ROLLBACK TO SAVEPOINT route_op_{depth}")).await?;
        }
        execute(conn, &format!("RELEASE SAVEPOINT route_op_{depth}")).await?;
        state.savepoints = depth - 1;
        Ok(())
    }
}

fn open(state: &mut TxState) -> Result<&mut PgConnection, CoreError> {
    state
        .tx
        .as_deref_mut()
        .ok_or_else(|| CoreError::Internal("route transaction is not open".to_string()))
}

async fn execute(conn: &mut PgConnection, statement: &str) -> Result<(), CoreError> {
    sqlx::query(statement).execute(conn).await.map_err(storage)?;
    Ok(())
}

#[async_trait]
impl RouteStore for PgRouteRepository {
    async fn begin(&self) -> Result<Arc<dyn RouteRepository>, CoreError> {
        Ok(Arc::new(Self::new(self.pool.clone())))
    }
}

#[async_trait]
impl RouteRepository for PgRouteRepository {
    async fn find_by_path(&self, path: &str, locale: &str) -> Result<Option<Route>, CoreError> {
        let mut state = self.transaction().await?;
        let row = RouteRepo::find_by_path(open(&mut state)?, path, locale)
            .await
            .map_err(storage)?;
        Ok(row.map(Route::from))
    }

    async fn find_by_entity(
        &self,
        entity: &EntityRef,
        locale: &str,
    ) -> Result<Option<Route>, CoreError> {
        let mut state = self.transaction().await?;
        let row = RouteRepo::find_current_by_entity(
            open(&mut state)?,
            &entity.entity_type,
            entity.entity_id,
            locale,
        )
        .await
        .map_err(storage)?;
        Ok(row.map(Route::from))
    }

    async fn find_history_by_entity(
        &self,
        entity: &EntityRef,
        locale: &str,
    ) -> Result<Vec<Route>, CoreError> {
        let mut state = self.transaction().await?;
        let rows = RouteRepo::find_history_by_entity(
            open(&mut state)?,
            &entity.entity_type,
            entity.entity_id,
            locale,
        )
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(Route::from).collect())
    }

    async fn find_history_by_target(&self, target: RouteId) -> Result<Vec<Route>, CoreError> {
        let mut state = self.transaction().await?;
        let rows = RouteRepo::find_history_by_target(open(&mut state)?, target)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(Route::from).collect())
    }

    async fn find_all_by_entity(&self, entity: &EntityRef) -> Result<Vec<Route>, CoreError> {
        let mut state = self.transaction().await?;
        let rows =
            RouteRepo::find_all_by_entity(open(&mut state)?, &entity.entity_type, entity.entity_id)
                .await
                .map_err(storage)?;
        Ok(rows.into_iter().map(Route::from).collect())
    }

    async fn save(&self, route: Route) -> Result<Route, CoreError> {
        let mut state = self.transaction().await?;
        let conn = open(&mut state)?;

        // A failed statement aborts the whole transaction unless it ran
        // inside its own savepoint.
        execute(&mut *conn, "SAVEPOINT route_save").await?;
        let result = match route.id {
            None => RouteRepo::insert(&mut *conn, &route).await.map(Some),
            Some(id) => RouteRepo::update(&mut *conn, id, &route).await,
        };
        if result.is_err() {
            execute(&mut *conn, "ROLLBACK TO SAVEPOINT route_save").await?;
        }
        execute(conn, "RELEASE SAVEPOINT route_save").await?;

        match result.map_err(DbError::classify) {
            Ok(Some(row)) => Ok(row.into()),
            Ok(None) => Err(CoreError::NotFound {
                entity: "route",
                id: route.id.map(|id| id.to_string()).unwrap_or_default(),
            }),
            Err(DbError::UniqueViolation(constraint)) => {
                tracing::debug!(
                    path = %route.path,
                    locale = %route.locale,
                    constraint = %constraint,
                    "Route write hit unique constraint"
                );
                Err(CoreError::RouteConflict {
                    path: route.path,
                    locale: route.locale,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn remove(&self, id: RouteId) -> Result<(), CoreError> {
        let mut state = self.transaction().await?;
        RouteRepo::delete(open(&mut state)?, id)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn savepoint(&self) -> Result<(), CoreError> {
        let mut state = self.transaction().await?;
        let depth = state.savepoints + 1;
        execute(open(&mut state)?, &format!("SAVEPOINT route_op_{depth}")).await?;
        state.savepoints = depth;
        Ok(())
    }

    async fn rollback_to_savepoint(&self) -> Result<(), CoreError> {
        self.close_savepoint(true).await
    }

    async fn release_savepoint(&self) -> Result<(), CoreError> {
        self.close_savepoint(false).await
    }

    async fn flush(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        state.savepoints = 0;
        if let Some(tx) = state.tx.take() {
            tx.commit().await.map_err(storage)?;
            tracing::debug!("Route transaction committed");
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock().await;
        state.savepoints = 0;
        if let Some(tx) = state.tx.take() {
            tx.rollback().await.map_err(storage)?;
            tracing::debug!("Route transaction rolled back");
        }
        Ok(())
    }
}
