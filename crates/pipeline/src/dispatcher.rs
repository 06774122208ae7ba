//! Priority-ordered delivery of lifecycle events.

use std::sync::Arc;

use async_trait::async_trait;
use pressroom_core::CoreError;

use crate::context::RequestContext;
use crate::event::{EventKind, LifecycleEvent};

/// A participant in the document lifecycle.
#[async_trait]
pub trait Subscriber: Send + Sync {
    fn name(&self) -> &'static str;

    /// The event kinds this subscriber handles with their priorities.
    /// Higher priorities run first.
    fn subscriptions(&self) -> Vec<(EventKind, i32)>;

    async fn on_event(
        &self,
        event: &mut LifecycleEvent,
        ctx: &mut RequestContext,
    ) -> Result<(), CoreError>;

    async fn on_flush(&self, _ctx: &mut RequestContext) -> Result<(), CoreError> {
        Ok(())
    }
}

struct Listener {
    kind: EventKind,
    priority: i32,
    subscriber: Arc<dyn Subscriber>,
}

/// Delivers events to subscribers in strict descending priority. Ties keep
/// registration order.
#[derive(Default)]
pub struct Dispatcher {
    listeners: Vec<Listener>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, subscriber: Arc<dyn Subscriber>) {
        for (kind, priority) in subscriber.subscriptions() {
            self.listeners.push(Listener {
                kind,
                priority,
                subscriber: subscriber.clone(),
            });
        }
        // Stable sort keeps registration order among equal priorities.
        self.listeners.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Subscriber names for `kind` in delivery order.
    pub fn listeners(&self, kind: EventKind) -> Vec<&'static str> {
        self.listeners
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| l.subscriber.name())
            .collect()
    }

    pub async fn dispatch(
        &self,
        event: &mut LifecycleEvent,
        ctx: &mut RequestContext,
    ) -> Result<(), CoreError> {
        let kind = event.kind();
        tracing::debug!(
            kind = %kind,
            uuid = %event.document.uuid(),
            locale = %event.locale(),
            "Dispatching lifecycle event"
        );
        for listener in self.listeners.iter().filter(|l| l.kind == kind) {
            listener.subscriber.on_event(event, ctx).await?;
        }
        Ok(())
    }

    pub async fn flush(&self, ctx: &mut RequestContext) -> Result<(), CoreError> {
        for listener in self.listeners.iter().filter(|l| l.kind == EventKind::Flush) {
            listener.subscriber.on_flush(ctx).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pressroom_core::document::Article;

    use super::*;

    struct Recording {
        name: &'static str,
        priority: i32,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Subscriber for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn subscriptions(&self) -> Vec<(EventKind, i32)> {
            vec![(EventKind::Persist, self.priority), (EventKind::Flush, self.priority)]
        }

        async fn on_event(
            &self,
            _event: &mut LifecycleEvent,
            _ctx: &mut RequestContext,
        ) -> Result<(), CoreError> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }

        async fn on_flush(&self, _ctx: &mut RequestContext) -> Result<(), CoreError> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    fn dispatcher(entries: &[(&'static str, i32)]) -> (Dispatcher, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        for (name, priority) in entries {
            dispatcher.register(Arc::new(Recording {
                name: *name,
                priority: *priority,
                log: log.clone(),
            }));
        }
        (dispatcher, log)
    }

    #[tokio::test]
    async fn higher_priority_runs_first_and_ties_keep_order() {
        let (dispatcher, log) = dispatcher(&[("index", -256), ("route", 256), ("a", 0), ("b", 0)]);

        let mut event = LifecycleEvent::new(EventKind::Persist, Article::new("de", "x", "default").into());
        dispatcher
            .dispatch(&mut event, &mut RequestContext::new())
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["route", "a", "b", "index"]);
        assert_eq!(dispatcher.listeners(EventKind::Persist), vec!["route", "a", "b", "index"]);
    }

    #[tokio::test]
    async fn unsubscribed_kinds_reach_nobody() {
        let (dispatcher, log) = dispatcher(&[("a", 0)]);
        let mut event = LifecycleEvent::new(EventKind::Publish, Article::new("de", "x", "default").into());
        dispatcher
            .dispatch(&mut event, &mut RequestContext::new())
            .await
            .unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn flush_uses_flush_subscriptions() {
        let (dispatcher, log) = dispatcher(&[("low", -1), ("high", 1)]);
        dispatcher.flush(&mut RequestContext::new()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["high", "low"]);
    }
}
