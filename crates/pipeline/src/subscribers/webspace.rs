use async_trait::async_trait;
use pressroom_core::document::Localized;
use pressroom_core::webspace::WebspaceResolver;
use pressroom_core::CoreError;

use super::PRIORITY_WEBSPACE;
use crate::context::RequestContext;
use crate::dispatcher::Subscriber;
use crate::event::{EventKind, LifecycleEvent};

/// Resolves main and additional webspaces of articles.
pub struct WebspaceSubscriber {
    resolver: WebspaceResolver,
}

impl WebspaceSubscriber {
    pub fn new(resolver: WebspaceResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Subscriber for WebspaceSubscriber {
    fn name(&self) -> &'static str {
        "webspace"
    }

    fn subscriptions(&self) -> Vec<(EventKind, i32)> {
        vec![
            (EventKind::Persist, PRIORITY_WEBSPACE),
            (EventKind::Publish, PRIORITY_WEBSPACE),
            (EventKind::CopyLocale, PRIORITY_WEBSPACE),
        ]
    }

    async fn on_event(
        &self,
        event: &mut LifecycleEvent,
        _ctx: &mut RequestContext,
    ) -> Result<(), CoreError> {
        let locale = event.locale().to_string();
        if event.document.is_ghost() {
            return Ok(());
        }
        if let Some(document) = event.document.webspace_mut() {
            let assignment = self.resolver.apply(document, &locale).await?;
            tracing::debug!(locale = %locale, main = ?assignment.main, "Webspaces resolved");
        }
        Ok(())
    }
}
