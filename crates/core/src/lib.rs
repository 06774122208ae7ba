//! Pressroom publishing core.
//!
//! Domain model and collaborator contracts for keeping article routes, page
//! numbering, webspaces and search projections consistent across the draft
//! store, the live store, the route registry and the two search indices.
//!
//! - [`document`]: the article/page document model and its capabilities.
//! - [`store`]: the content store contract.
//! - [`route`], [`route_manager`], [`route_generator`]: route registry,
//!   conflict resolution and path generation.
//! - [`page_number`]: contiguous page numbering.
//! - [`webspace`]: webspace resolution.
//! - [`index`], [`view`]: search index contract and projections.
//! - [`memory`]: in-memory collaborators.

pub mod document;
pub mod error;
pub mod index;
pub mod memory;
pub mod page_number;
pub mod page_tree;
pub mod route;
pub mod route_generator;
pub mod route_manager;
pub mod slug;
pub mod store;
pub mod structure;
pub mod types;
pub mod view;
pub mod webspace;

pub use error::CoreError;
