//! Repository layer.
//!
//! [`RouteRepo`] and [`DomainEventRepo`] are zero-sized structs with async
//! query methods. [`PgRouteRepository`] adapts `RouteRepo` to the core
//! [`RouteRepository`](pressroom_core::route::RouteRepository) contract.

pub mod domain_event_repo;
pub mod route_repo;

pub use domain_event_repo::DomainEventRepo;
pub use route_repo::{PgRouteRepository, RouteRepo};
