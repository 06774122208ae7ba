use std::sync::Arc;

use async_trait::async_trait;
use pressroom_core::document::{Document, Localized};
use pressroom_core::store::ContentStore;
use pressroom_core::types::Workspace;
use pressroom_core::CoreError;
use pressroom_events::{DomainEvent, DomainEventType, EventSink};
use serde_json::json;

use super::{PRIORITY_CLASSIFY, PRIORITY_DOMAIN_EVENT};
use crate::context::{PendingCopy, RequestContext};
use crate::dispatcher::Subscriber;
use crate::event::{EventKind, LifecycleEvent};

/// Records one domain event per article-level transition and hands the
/// request's events to the sink on flush.
///
/// Copies are only noted during the request. Their event is built on flush
/// from the copy as the content store holds it then.
pub struct DomainEventSubscriber {
    store: Arc<dyn ContentStore>,
    sink: Arc<dyn EventSink>,
}

impl DomainEventSubscriber {
    pub fn new(store: Arc<dyn ContentStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// Decide before the write whether a persist creates the article, adds
    /// a translation or modifies an existing one.
    async fn classify(&self, document: &Document) -> Result<DomainEventType, CoreError> {
        if document.is_new() {
            return Ok(DomainEventType::Created);
        }
        let locales = self.store.locales(document.uuid(), Workspace::Draft).await?;
        if locales.iter().any(|l| l == document.locale()) {
            Ok(DomainEventType::Modified)
        } else {
            Ok(DomainEventType::TranslationAdded)
        }
    }
}

fn record(event_type: DomainEventType, document: &Document) -> DomainEvent {
    DomainEvent::new(event_type, document.uuid())
        .with_locale(document.locale())
        .with_payload(json!({
            "title": document.title(),
            "structure_type": document.structure_type(),
            "route_path": document.routable().route_path(),
        }))
}

fn with_field(mut event: DomainEvent, key: &str, value: serde_json::Value) -> DomainEvent {
    if let Some(payload) = event.payload.as_object_mut() {
        payload.insert(key.to_string(), value);
    }
    event
}

#[async_trait]
impl Subscriber for DomainEventSubscriber {
    fn name(&self) -> &'static str {
        "domain_event"
    }

    fn subscriptions(&self) -> Vec<(EventKind, i32)> {
        vec![
            (EventKind::PrePersist, PRIORITY_CLASSIFY),
            (EventKind::PostPersist, PRIORITY_DOMAIN_EVENT),
            (EventKind::PostPublish, PRIORITY_DOMAIN_EVENT),
            (EventKind::Unpublish, PRIORITY_DOMAIN_EVENT),
            (EventKind::Remove, PRIORITY_DOMAIN_EVENT),
            (EventKind::RemoveDraft, PRIORITY_DOMAIN_EVENT),
            (EventKind::RemoveLocale, PRIORITY_DOMAIN_EVENT),
            (EventKind::Copy, PRIORITY_DOMAIN_EVENT),
            (EventKind::CopyLocale, PRIORITY_DOMAIN_EVENT),
            (EventKind::Reorder, PRIORITY_DOMAIN_EVENT),
            (EventKind::Restore, PRIORITY_DOMAIN_EVENT),
            (EventKind::Flush, PRIORITY_DOMAIN_EVENT),
        ]
    }

    async fn on_event(
        &self,
        event: &mut LifecycleEvent,
        ctx: &mut RequestContext,
    ) -> Result<(), CoreError> {
        let document = &event.document;
        let is_article = matches!(document, Document::Article(_));

        match event.kind() {
            EventKind::PrePersist => {
                let classification = self.classify(document).await?;
                ctx.push_classification(classification);
            }
            EventKind::PostPersist => {
                let classification = ctx.pop_classification();
                if let (Some(event_type), true) = (classification, is_article) {
                    ctx.events.collect(record(event_type, document));
                }
            }
            EventKind::PostPublish if is_article => {
                ctx.events.collect(record(DomainEventType::Published, document));
            }
            EventKind::Unpublish if is_article => {
                ctx.events.collect(record(DomainEventType::Unpublished, document));
            }
            EventKind::Remove if is_article => {
                let removed = DomainEvent::new(DomainEventType::Removed, document.uuid())
                    .with_payload(json!({ "title": document.title() }));
                ctx.events.collect(removed);
            }
            EventKind::RemoveDraft if is_article => {
                ctx.events.collect(record(DomainEventType::DraftRemoved, document));
            }
            EventKind::RemoveLocale if is_article => {
                ctx.events
                    .collect(record(DomainEventType::TranslationRemoved, document));
            }
            EventKind::Copy if is_article => {
                ctx.copies.push(PendingCopy {
                    uuid: document.uuid(),
                    locale: document.locale().to_string(),
                    source: event.source,
                });
            }
            EventKind::CopyLocale if is_article => {
                ctx.events.collect(with_field(
                    record(DomainEventType::TranslationCopied, document),
                    "source_locale",
                    json!(event.source_locale),
                ));
            }
            EventKind::Restore if is_article => {
                ctx.events.collect(with_field(
                    record(DomainEventType::VersionRestored, document),
                    "version",
                    json!(event.version),
                ));
            }
            EventKind::Reorder => {
                let parent = document.article_id();
                let moved = DomainEvent::new(DomainEventType::Modified, parent)
                    .with_locale(document.locale())
                    .with_payload(json!({ "reordered_page": document.uuid().to_string() }));
                ctx.events.collect(moved);
            }
            _ => {}
        }
        Ok(())
    }

    async fn on_flush(&self, ctx: &mut RequestContext) -> Result<(), CoreError> {
        for copy in std::mem::take(&mut ctx.copies) {
            let Some(document) = self.store.find(copy.uuid, &copy.locale, Workspace::Draft).await?
            else {
                tracing::warn!(uuid = %copy.uuid, locale = %copy.locale, "Copy vanished before flush");
                continue;
            };
            ctx.events.collect(with_field(
                record(DomainEventType::Copied, &document),
                "source",
                json!(copy.source.map(|s| s.to_string())),
            ));
        }

        let dispatched = ctx.events.flush(self.sink.as_ref()).await?;
        if dispatched > 0 {
            tracing::info!(events = dispatched, "Domain events dispatched");
        }
        Ok(())
    }
}
