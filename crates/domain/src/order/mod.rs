//! Order aggregate and related types.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderDraft};
pub use state::OrderStatus;
pub use value_objects::OrderLine;

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The status machine defines no edge between these two statuses.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// The string does not name a known status.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Invalid price.
    #[error("Invalid price: {cents} cents (must be greater than 0)")]
    InvalidPrice { cents: i64 },

    /// The order total does not fit in a money amount.
    #[error("Order total overflows for product {product_id}")]
    TotalOverflow { product_id: ProductId },
}
