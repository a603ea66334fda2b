use async_trait::async_trait;
use domain::{NewProduct, Order, Product, ProductPatch};

use crate::unit_of_work::{Committed, UnitOfWork};
use crate::{OrderId, ProductId, Result, StoreError};

/// Core trait for store implementations.
///
/// A store owns every persisted product and order. All implementations must
/// be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Retrieves a product by id.
    ///
    /// Returns None if the product doesn't exist.
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// Retrieves the known products among `ids`.
    ///
    /// Unknown ids are skipped; the result order is unspecified.
    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Retrieves every product, oldest first.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Persists a new product under a freshly issued id.
    async fn create_product(&self, attrs: NewProduct) -> Result<Product>;

    /// Applies a patch to a product's descriptive attributes.
    async fn update_product(&self, id: &ProductId, patch: ProductPatch) -> Result<Product>;

    /// Removes a product.
    async fn delete_product(&self, id: &ProductId) -> Result<()>;

    /// Retrieves an order by id.
    ///
    /// Returns None if the order doesn't exist.
    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Retrieves every order, oldest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Commits a unit of work.
    ///
    /// Items are applied in order, atomically: either all succeed or none
    /// are visible. A stock decrement never drives stock below zero, and a
    /// status change only applies if the order is in the expected status.
    async fn commit(&self, work: UnitOfWork) -> Result<Committed>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Removes stock from a single product as its own unit of work.
    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<Product> {
        let committed = self
            .commit(UnitOfWork::new().decrement_stock(id.clone(), quantity))
            .await?;
        committed
            .product(id)
            .cloned()
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))
    }

    /// Returns stock to a single product as its own unit of work.
    async fn increment_stock(&self, id: &ProductId, quantity: u32) -> Result<Product> {
        let committed = self
            .commit(UnitOfWork::new().increment_stock(id.clone(), quantity))
            .await?;
        committed
            .product(id)
            .cloned()
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
