//! Route registry row.

use pressroom_core::route::{EntityRef, Route};
use pressroom_core::types::{DocumentId, RouteId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `routes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RouteRow {
    pub id: RouteId,
    pub path: String,
    pub locale: String,
    pub entity_type: String,
    pub entity_id: DocumentId,
    pub history: bool,
    pub target_id: Option<RouteId>,
    pub created_at: Timestamp,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Route {
            id: Some(row.id),
            path: row.path,
            locale: row.locale,
            entity: EntityRef::new(row.entity_type, row.entity_id),
            history: row.history,
            target: row.target_id,
            created: row.created_at,
        }
    }
}
