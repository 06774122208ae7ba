//! Domain event envelope and the in-process event bus.
//!
//! [`EventBus`] is the publish/subscribe hub for [`DomainEvent`]s. It is
//! shared via `Arc<EventBus>` and doubles as the [`EventSink`] the lifecycle
//! pipeline flushes into.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pressroom_core::document::ARTICLE_ENTITY_TYPE;
use pressroom_core::types::DocumentId;
use pressroom_core::CoreError;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// DomainEventType
// ---------------------------------------------------------------------------

/// The lifecycle transition an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEventType {
    Created,
    Modified,
    Published,
    Unpublished,
    TranslationAdded,
    TranslationRemoved,
    TranslationCopied,
    DraftRemoved,
    VersionRestored,
    Removed,
    Copied,
}

impl DomainEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Published => "published",
            Self::Unpublished => "unpublished",
            Self::TranslationAdded => "translation_added",
            Self::TranslationRemoved => "translation_removed",
            Self::TranslationCopied => "translation_copied",
            Self::DraftRemoved => "draft_removed",
            Self::VersionRestored => "version_restored",
            Self::Removed => "removed",
            Self::Copied => "copied",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "created" => Ok(Self::Created),
            "modified" => Ok(Self::Modified),
            "published" => Ok(Self::Published),
            "unpublished" => Ok(Self::Unpublished),
            "translation_added" => Ok(Self::TranslationAdded),
            "translation_removed" => Ok(Self::TranslationRemoved),
            "translation_copied" => Ok(Self::TranslationCopied),
            "draft_removed" => Ok(Self::DraftRemoved),
            "version_restored" => Ok(Self::VersionRestored),
            "removed" => Ok(Self::Removed),
            "copied" => Ok(Self::Copied),
            _ => Err(CoreError::Validation(format!(
                "Invalid domain event type: '{s}'"
            ))),
        }
    }
}

impl std::fmt::Display for DomainEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// One recorded lifecycle transition of an article.
///
/// Constructed via [`DomainEvent::new`] and enriched with
/// [`with_locale`](DomainEvent::with_locale) and
/// [`with_payload`](DomainEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_type: DomainEventType,

    /// Entity kind the event belongs to, `"article"` unless overridden.
    pub aggregate_type: String,

    pub aggregate_id: DocumentId,

    /// Locale the transition happened in; `None` for locale-independent
    /// events such as removal.
    pub locale: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(event_type: DomainEventType, aggregate_id: DocumentId) -> Self {
        Self {
            event_type,
            aggregate_type: ARTICLE_ENTITY_TYPE.to_string(),
            aggregate_id,
            locale: None,
            payload: serde_json::Value::Object(Default::default()),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Receiver of the events a request recorded.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn dispatch(&self, events: Vec<DomainEvent>) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use pressroom_events::bus::{DomainEvent, DomainEventType, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(DomainEvent::new(DomainEventType::Created, uuid::Uuid::new_v4()));
/// assert!(rx.try_recv().is_ok());
/// ```
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody listens.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventSink for EventBus {
    async fn dispatch(&self, events: Vec<DomainEvent>) -> Result<(), CoreError> {
        for event in events {
            tracing::debug!(
                event_type = %event.event_type,
                aggregate_id = %event.aggregate_id,
                locale = ?event.locale,
                "Dispatching domain event"
            );
            self.publish(event);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
