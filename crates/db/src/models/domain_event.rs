//! Domain event row.

use pressroom_core::types::{DocumentId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `domain_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DomainEventRow {
    pub id: i64,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: DocumentId,
    pub locale: Option<String>,
    pub payload: serde_json::Value,
    pub occurred_at: Timestamp,
    pub created_at: Timestamp,
}

/// Insert DTO for [`DomainEventRepo::insert`](crate::repositories::DomainEventRepo::insert).
#[derive(Debug, Clone)]
pub struct NewDomainEvent<'a> {
    pub event_type: &'a str,
    pub aggregate_type: &'a str,
    pub aggregate_id: DocumentId,
    pub locale: Option<&'a str>,
    pub payload: &'a serde_json::Value,
    pub occurred_at: Timestamp,
}
