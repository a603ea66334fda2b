use domain::{OrderStatus, ProductError};
use thiserror::Error;

use crate::{OrderId, ProductId};

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No product exists with this id.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// No order exists with this id.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A guarded decrement found less stock than requested.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// An increment would push stock past the largest representable quantity.
    #[error(
        "Stock overflow for product {product_id}: adding {requested} to {available} exceeds the stock limit"
    )]
    StockOverflow {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A status compare-and-set found the order in a different status.
    #[error("Status conflict for order {order_id}: expected {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// Product attributes failed validation.
    #[error("Invalid product: {0}")]
    InvalidProduct(#[from] ProductError),

    /// The unit of work was malformed and nothing was attempted.
    #[error("Invalid unit of work: {0}")]
    InvalidWork(String),

    /// A stored record could not be mapped back to a domain value.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
