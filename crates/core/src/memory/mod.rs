//! In-memory collaborators.
//!
//! Complete implementations of the store, route, index and page-tree
//! contracts backed by `tokio` locks. Used by tests and by embedders that
//! do not need durable storage.

mod index;
mod page_tree;
mod routes;
mod store;

pub use index::MemorySearchIndex;
pub use page_tree::MemoryPageTree;
pub use routes::MemoryRouteRepository;
pub use store::MemoryContentStore;
