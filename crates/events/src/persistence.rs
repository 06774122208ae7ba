//! Audit trail writer.
//!
//! [`EventPersistence::run`] drains a receiver of the
//! [`EventBus`](crate::bus::EventBus) into the `domain_events` table until
//! the bus is dropped. A failed insert is logged and skipped.

use pressroom_db::models::domain_event::NewDomainEvent;
use pressroom_db::repositories::DomainEventRepo;
use pressroom_db::DbPool;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::bus::DomainEvent;

/// Stores every published domain event.
pub struct EventPersistence;

impl EventPersistence {
    /// Write events as they arrive. Returns the number of stored events
    /// once every sender is gone.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<DomainEvent>) -> usize {
        let mut stored = 0;
        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Audit writer fell behind, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            match Self::persist(&pool, &event).await {
                Ok(_) => stored += 1,
                Err(e) => tracing::error!(
                    error = %e,
                    event_type = %event.event_type,
                    uuid = %event.aggregate_id,
                    locale = ?event.locale,
                    "Domain event not stored"
                ),
            }
        }
        tracing::info!(stored, "Audit writer stopped");
        stored
    }

    async fn persist(pool: &DbPool, event: &DomainEvent) -> Result<i64, sqlx::Error> {
        DomainEventRepo::insert(pool, &Self::row(event)).await
    }

    fn row(event: &DomainEvent) -> NewDomainEvent<'_> {
        NewDomainEvent {
            event_type: event.event_type.as_str(),
            aggregate_type: &event.aggregate_type,
            aggregate_id: event.aggregate_id,
            locale: event.locale.as_deref(),
            payload: &event.payload,
            occurred_at: event.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use pressroom_core::types::DocumentId;

    use super::*;
    use crate::bus::DomainEventType;

    #[test]
    fn row_carries_event_fields() {
        let id = DocumentId::new_v4();
        let event = DomainEvent::new(DomainEventType::TranslationAdded, id)
            .with_locale("en")
            .with_payload(serde_json::json!({"title": "Hello"}));

        let row = EventPersistence::row(&event);
        assert_eq!(row.event_type, "translation_added");
        assert_eq!(row.aggregate_type, "article");
        assert_eq!(row.aggregate_id, id);
        assert_eq!(row.locale, Some("en"));
        assert_eq!(row.payload["title"], "Hello");
    }
}
