//! Fulfillment error types.

use common::{OrderId, ProductId};
use domain::{OrderError, OrderStatus, ProductError};
use store::StoreError;
use thiserror::Error;

/// Where an insufficient-stock condition was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockCheck {
    /// The up-front availability check, before anything was written.
    Validation,
    /// The guarded decrement during commit. Another order took the stock
    /// after validation passed.
    Commit,
}

impl std::fmt::Display for StockCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockCheck::Validation => f.write_str("validation"),
            StockCheck::Commit => f.write_str("commit"),
        }
    }
}

/// Errors that can occur during fulfillment operations.
///
/// None of these are retried inside the core. A failed reservation
/// guarantees that no stock moved and no order was written.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Not enough stock to cover the requested quantity.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available} (detected at {detected_at})"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
        detected_at: StockCheck,
    },

    /// The order cannot move from its current status to the requested one.
    #[error("Invalid status transition for order {order_id}: cannot move from {from} to {to}")]
    InvalidStatusTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Returning stock would push it past the largest representable quantity.
    #[error(
        "Stock overflow for product {product_id}: adding {requested} to {available} exceeds the stock limit"
    )]
    StockOverflow {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Stock quantities must be positive.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Product validation error.
    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    /// Order validation error.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// The store failed or aborted the unit of work.
    #[error("Persistence failure: {0}")]
    Persistence(#[source] StoreError),
}

impl From<StoreError> for FulfillmentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProductNotFound(id) => FulfillmentError::ProductNotFound(id),
            StoreError::OrderNotFound(id) => FulfillmentError::OrderNotFound(id),
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => FulfillmentError::InsufficientStock {
                product_id,
                requested,
                available,
                detected_at: StockCheck::Commit,
            },
            StoreError::StockOverflow {
                product_id,
                requested,
                available,
            } => FulfillmentError::StockOverflow {
                product_id,
                requested,
                available,
            },
            StoreError::InvalidProduct(e) => FulfillmentError::Product(e),
            other => FulfillmentError::Persistence(other),
        }
    }
}

impl FulfillmentError {
    /// Short machine-readable label, used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::ProductNotFound(_) => "product_not_found",
            FulfillmentError::OrderNotFound(_) => "order_not_found",
            FulfillmentError::InsufficientStock { .. } => "insufficient_stock",
            FulfillmentError::InvalidStatusTransition { .. } => "invalid_status_transition",
            FulfillmentError::StockOverflow { .. } => "stock_overflow",
            FulfillmentError::InvalidQuantity { .. } => "invalid_quantity",
            FulfillmentError::Product(_) => "invalid_product",
            FulfillmentError::Order(_) => "invalid_order",
            FulfillmentError::Persistence(_) => "persistence",
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
