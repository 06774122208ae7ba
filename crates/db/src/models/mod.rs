//! Row structs for the route registry and audit tables.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row and its conversion into the core domain type.

pub mod domain_event;
pub mod route;
