//! Persistence gateway for the order fulfillment system.
//!
//! Offers lookups and CRUD for products and orders, plus [`UnitOfWork`]:
//! an explicit batch of stock and order mutations that a [`Store`] commits
//! all-or-nothing.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod unit_of_work;

pub use common::{OrderId, ProductId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{Store, StoreExt};
pub use unit_of_work::{Committed, UnitOfWork, WorkItem, WorkValidationError, validate_work};
