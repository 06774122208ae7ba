//! Assembly of the lifecycle pipeline from configuration and collaborators.

use std::sync::Arc;

use pressroom_core::index::SearchIndex;
use pressroom_core::page_tree::PageTreeResolver;
use pressroom_core::route::{Route, RouteStore};
use pressroom_core::route_generator::{
    ChainRouteGenerator, PageTreeRouteGenerator, RouteGenerator, SchemaRouteGenerator,
};
use pressroom_core::route_manager::RouteManager;
use pressroom_core::store::ContentStore;
use pressroom_core::structure::StructureRegistry;
use pressroom_core::view::{DefaultProjectionBuilder, ProjectionBuilder};
use pressroom_core::webspace::WebspaceResolver;
use pressroom_core::CoreError;
use pressroom_events::EventSink;

use crate::config::PublishingConfig;
use crate::dispatcher::Dispatcher;
use crate::scheduler::Indexer;
use crate::session::DocumentSession;
use crate::subscribers::{
    DomainEventSubscriber, IndexSubscriber, PageNumberSubscriber, PageSummarySubscriber,
    RouteSubscriber, StructureSubscriber, WebspaceSubscriber, WorkflowSubscriber,
};

/// External systems the pipeline keeps consistent.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ContentStore>,
    /// Every session begins its own route transaction here.
    pub routes: Arc<dyn RouteStore>,
    pub page_tree: Arc<dyn PageTreeResolver>,
    pub draft_index: Arc<dyn SearchIndex>,
    pub live_index: Arc<dyn SearchIndex>,
    pub events: Arc<dyn EventSink>,
    /// Defaults to [`DefaultProjectionBuilder`] with the configured default
    /// webspace.
    pub projection: Option<Arc<dyn ProjectionBuilder>>,
}

/// The configured set of subscribers, shared by all sessions.
pub struct ContentPipeline {
    config: PublishingConfig,
    store: Arc<dyn ContentStore>,
    routes: Arc<dyn RouteStore>,
    dispatcher: Dispatcher,
}

impl ContentPipeline {
    /// Build the pipeline.
    ///
    /// Fails when the default structure type is not registered or a route
    /// schema uses unknown tokens.
    pub fn new(config: PublishingConfig, collaborators: Collaborators) -> Result<Self, CoreError> {
        let structures = StructureRegistry::new(
            config.structure_types.clone(),
            config.default_structure_type.clone(),
        )?;
        let schema = Arc::new(SchemaRouteGenerator::new(
            config.article_route_schema.clone(),
            config.page_route_schema.clone(),
        )?);
        let generator = ChainRouteGenerator::new(vec![
            Arc::new(PageTreeRouteGenerator::new(collaborators.page_tree.clone()))
                as Arc<dyn RouteGenerator>,
            schema.clone() as Arc<dyn RouteGenerator>,
        ]);

        let store = collaborators.store;
        let routes = collaborators.routes;
        let projection = collaborators.projection.unwrap_or_else(|| {
            Arc::new(DefaultProjectionBuilder::new(config.default_webspace.clone()))
                as Arc<dyn ProjectionBuilder>
        });
        let indexer = Arc::new(Indexer::new(
            store.clone(),
            projection,
            collaborators.draft_index,
            collaborators.live_index,
        ));

        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(DomainEventSubscriber::new(
            store.clone(),
            collaborators.events,
        )));
        dispatcher.register(Arc::new(StructureSubscriber::new(store.clone(), structures)));
        dispatcher.register(Arc::new(PageNumberSubscriber::new(store.clone())));
        dispatcher.register(Arc::new(WorkflowSubscriber::new(store.clone())));
        dispatcher.register(Arc::new(WebspaceSubscriber::new(WebspaceResolver::new(
            collaborators.page_tree,
        ))));
        dispatcher.register(Arc::new(RouteSubscriber::new(
            store.clone(),
            generator,
            schema,
            config.conflict_policy,
        )));
        dispatcher.register(Arc::new(PageSummarySubscriber::new(store.clone())));
        dispatcher.register(Arc::new(IndexSubscriber::new(store.clone(), indexer)));

        tracing::info!(
            article_schema = %config.article_route_schema,
            page_schema = %config.page_route_schema,
            conflict_policy = config.conflict_policy.as_str(),
            "Content pipeline ready"
        );

        Ok(Self {
            config,
            store,
            routes,
            dispatcher,
        })
    }

    /// Start a request. Buffered work is written on
    /// [`DocumentSession::flush`].
    pub fn session(&self) -> DocumentSession<'_> {
        DocumentSession::new(self)
    }

    pub fn config(&self) -> &PublishingConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn route_store(&self) -> &Arc<dyn RouteStore> {
        &self.routes
    }

    /// Resolve `path` against committed routes, following history
    /// redirects.
    pub async fn resolve(&self, path: &str, locale: &str) -> Result<Option<Route>, CoreError> {
        let routes = RouteManager::new(self.routes.begin().await?);
        let resolved = routes.resolve(path, locale).await;
        routes.rollback().await?;
        resolved
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
