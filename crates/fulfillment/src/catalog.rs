//! Product catalog operations.

use common::ProductId;
use domain::{NewProduct, Product, ProductPatch};
use store::Store;

use crate::error::{FulfillmentError, Result};
use crate::ledger::StockLedger;

/// Service for managing products.
///
/// Plain CRUD passes straight through to the store. Restocking goes through
/// the [`StockLedger`], the only path that changes stock.
pub struct ProductService<S: Store> {
    store: S,
    ledger: StockLedger<S>,
}

impl<S: Store + Clone> ProductService<S> {
    /// Creates a new product service.
    pub fn new(store: S) -> Self {
        let ledger = StockLedger::new(store.clone());
        Self { store, ledger }
    }

    /// Creates a product after validating its attributes.
    #[tracing::instrument(skip(self, attrs), fields(name = %attrs.name))]
    pub async fn create_product(&self, attrs: NewProduct) -> Result<Product> {
        attrs.validate()?;
        let product = self.store.create_product(attrs).await?;
        tracing::info!(product_id = %product.id(), "product created");
        Ok(product)
    }

    /// Lists every product.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    /// Gets a product by id.
    pub async fn get_product(&self, id: &ProductId) -> Result<Product> {
        self.ledger
            .find_by_id(id)
            .await?
            .ok_or_else(|| FulfillmentError::ProductNotFound(id.clone()))
    }

    /// Updates a product's descriptive attributes.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_product(&self, id: &ProductId, patch: ProductPatch) -> Result<Product> {
        Ok(self.store.update_product(id, patch).await?)
    }

    /// Deletes a product.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<()> {
        self.store.delete_product(id).await?;
        tracing::info!("product deleted");
        Ok(())
    }

    /// Adds stock to a product.
    #[tracing::instrument(skip(self))]
    pub async fn restock_product(&self, id: &ProductId, quantity: u32) -> Result<Product> {
        self.ledger.increment(id, quantity).await
    }
}
