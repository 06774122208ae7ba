//! Lifecycle events delivered to subscribers.

use pressroom_core::document::{Document, Localized};
use pressroom_core::types::DocumentId;
use serde::{Deserialize, Serialize};

/// The lifecycle step an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Before defaults are applied; the store has not assigned an id yet.
    PrePersist,
    /// The document is about to be written to the draft workspace.
    Persist,
    /// The draft write has happened.
    PostPersist,
    /// The document is about to be copied into the live workspace.
    Publish,
    /// The live copy exists.
    PostPublish,
    Unpublish,
    /// The document and its subtree are about to be removed.
    Remove,
    /// A page has been removed; delivered once per locale of its article.
    PostRemove,
    RemoveDraft,
    RemoveLocale,
    /// A copy exists in the draft workspace; delivered once per locale.
    Copy,
    CopyLocale,
    /// A page has moved; delivered once per locale of its article.
    Reorder,
    Restore,
    /// End of request. Delivered through
    /// [`Subscriber::on_flush`](crate::dispatcher::Subscriber::on_flush).
    Flush,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrePersist => "pre_persist",
            Self::Persist => "persist",
            Self::PostPersist => "post_persist",
            Self::Publish => "publish",
            Self::PostPublish => "post_publish",
            Self::Unpublish => "unpublish",
            Self::Remove => "remove",
            Self::PostRemove => "post_remove",
            Self::RemoveDraft => "remove_draft",
            Self::RemoveLocale => "remove_locale",
            Self::Copy => "copy",
            Self::CopyLocale => "copy_locale",
            Self::Reorder => "reorder",
            Self::Restore => "restore",
            Self::Flush => "flush",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document passing through one lifecycle step.
///
/// Subscribers may mutate [`document`](Self::document); the session writes
/// it back to the store where the step persists the subject.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    kind: EventKind,
    pub document: Document,
    /// Path requested by the editor instead of a generated one.
    pub route_hint: Option<String>,
    /// Original of a copy.
    pub source: Option<DocumentId>,
    /// Locale a translation was copied from.
    pub source_locale: Option<String>,
    /// Version being restored.
    pub version: Option<u32>,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, document: Document) -> Self {
        Self {
            kind,
            document,
            route_hint: None,
            source: None,
            source_locale: None,
            version: None,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn locale(&self) -> &str {
        self.document.locale()
    }

    /// Reuse the event for the next step of the same operation.
    pub fn advance(&mut self, kind: EventKind) {
        self.kind = kind;
    }

    pub fn with_route_hint(mut self, hint: Option<String>) -> Self {
        self.route_hint = hint;
        self
    }

    pub fn with_source(mut self, source: DocumentId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_source_locale(mut self, locale: impl Into<String>) -> Self {
        self.source_locale = Some(locale.into());
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}
