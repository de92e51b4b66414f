//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no Axum).
//! Trait definitions, domain error types and the small pieces of
//! catalog and order logic that do not need a database.

pub mod catalog;
pub mod errors;
pub mod order;
pub mod repositories;

pub use errors::DomainError;
pub use order::{NewOrder, NewOrderItem, OrderFilter, OrderStatus, OrderWithItems};
pub use repositories::*;
