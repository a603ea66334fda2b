//! Shared types for the order fulfillment system.

mod types;

pub use types::{OrderId, ProductId};
