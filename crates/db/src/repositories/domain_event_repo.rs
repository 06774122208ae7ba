//! Repository for the `domain_events` table.

use pressroom_core::types::DocumentId;
use sqlx::PgPool;

use crate::models::domain_event::{DomainEventRow, NewDomainEvent};

/// Column list for `domain_events` queries.
const COLUMNS: &str =
    "id, event_type, aggregate_type, aggregate_id, locale, payload, occurred_at, created_at";

/// Provides read/write operations for audit events.
pub struct DomainEventRepo;

impl DomainEventRepo {
    /// Insert a new event row, returning the generated ID.
    pub async fn insert(pool: &PgPool, event: &NewDomainEvent<'_>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO domain_events \
                (event_type, aggregate_type, aggregate_id, locale, payload, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(event.event_type)
        .bind(event.aggregate_type)
        .bind(event.aggregate_id)
        .bind(event.locale)
        .bind(event.payload)
        .bind(event.occurred_at)
        .fetch_one(pool)
        .await
    }

    /// All events of one aggregate, oldest first.
    pub async fn list_for_aggregate(
        pool: &PgPool,
        aggregate_id: DocumentId,
    ) -> Result<Vec<DomainEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM domain_events WHERE aggregate_id = $1 ORDER BY occurred_at, id"
        );
        sqlx::query_as::<_, DomainEventRow>(&query)
            .bind(aggregate_id)
            .fetch_all(pool)
            .await
    }

    /// List recent events ordered newest-first.
    pub async fn list_recent(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DomainEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM domain_events ORDER BY occurred_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, DomainEventRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
