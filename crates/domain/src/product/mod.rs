//! Product aggregate and related types.

mod aggregate;

pub use aggregate::{NewProduct, Product, ProductPatch};

use thiserror::Error;

/// Errors raised when building or patching a product.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    /// Product name must not be blank.
    #[error("Product name must not be empty")]
    EmptyName,

    /// Invalid price.
    #[error("Invalid price: {cents} cents (must be greater than 0)")]
    InvalidPrice { cents: i64 },
}
