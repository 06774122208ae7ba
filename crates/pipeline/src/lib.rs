//! Lifecycle pipeline keeping articles, routes and search indices in step.
//!
//! Every write goes through a [`DocumentSession`], which emits lifecycle
//! events to priority-ordered [`subscribers`]. Subscribers mutate the
//! document or the store directly (routes, page numbers, webspaces, page
//! summaries) or buffer work in the session's [`RequestContext`] (index
//! writes, domain events). [`DocumentSession::flush`] writes the buffered
//! work once per key.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pressroom_core::document::Article;
//! use pressroom_core::memory::{
//!     MemoryContentStore, MemoryPageTree, MemoryRouteRepository, MemorySearchIndex,
//! };
//! use pressroom_events::EventBus;
//! use pressroom_pipeline::{Collaborators, ContentPipeline, PublishingConfig};
//!
//! # async fn run() -> Result<(), pressroom_core::CoreError> {
//! let pipeline = ContentPipeline::new(
//!     PublishingConfig::from_env()?,
//!     Collaborators {
//!         store: Arc::new(MemoryContentStore::new()),
//!         routes: Arc::new(MemoryRouteRepository::new()),
//!         page_tree: Arc::new(MemoryPageTree::new()),
//!         draft_index: Arc::new(MemorySearchIndex::new()),
//!         live_index: Arc::new(MemorySearchIndex::new()),
//!         events: Arc::new(EventBus::default()),
//!         projection: None,
//!     },
//! )?;
//!
//! let mut session = pipeline.session();
//! let article = session
//!     .persist(Article::new("de", "Hello", "default").into(), None)
//!     .await?;
//! session.publish(article.uuid(), "de").await?;
//! session.flush().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod event;
mod page_tree;
pub mod pipeline;
pub mod scheduler;
pub mod session;
pub mod subscribers;

pub use config::PublishingConfig;
pub use context::RequestContext;
pub use dispatcher::{Dispatcher, Subscriber};
pub use event::{EventKind, LifecycleEvent};
pub use pipeline::{Collaborators, ContentPipeline};
pub use session::DocumentSession;
