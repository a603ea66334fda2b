//! Product stock ledger.

use common::ProductId;
use domain::Product;
use store::{Store, StoreExt, UnitOfWork};

use crate::error::{FulfillmentError, Result};

/// The single authority over product stock quantities.
///
/// Standalone mutations commit as their own unit of work. Reservations and
/// restitutions that must land together with an order write are staged onto
/// a caller's [`UnitOfWork`] instead, so the caller decides the atomicity
/// boundary.
#[derive(Clone)]
pub struct StockLedger<S: Store> {
    store: S,
}

impl<S: Store> StockLedger<S> {
    /// Creates a new ledger over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Looks up a product with its current stock.
    pub async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self.store.find_product(id).await?)
    }

    /// Looks up every known product among `ids`. Unknown ids are skipped.
    pub async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        Ok(self.store.find_products(ids).await?)
    }

    /// Removes `quantity` units from a product's stock.
    ///
    /// Fails without changing anything if fewer than `quantity` units remain.
    #[tracing::instrument(skip(self))]
    pub async fn decrement(&self, id: &ProductId, quantity: u32) -> Result<Product> {
        ensure_positive(id, quantity)?;
        Ok(self.store.decrement_stock(id, quantity).await?)
    }

    /// Returns `quantity` units to a product's stock.
    #[tracing::instrument(skip(self))]
    pub async fn increment(&self, id: &ProductId, quantity: u32) -> Result<Product> {
        ensure_positive(id, quantity)?;
        Ok(self.store.increment_stock(id, quantity).await?)
    }

    /// Stages a guarded decrement onto `work`.
    pub fn stage_reservation(
        &self,
        work: UnitOfWork,
        id: &ProductId,
        quantity: u32,
    ) -> Result<UnitOfWork> {
        ensure_positive(id, quantity)?;
        Ok(work.decrement_stock(id.clone(), quantity))
    }

    /// Stages an increment onto `work`.
    pub fn stage_restitution(
        &self,
        work: UnitOfWork,
        id: &ProductId,
        quantity: u32,
    ) -> Result<UnitOfWork> {
        ensure_positive(id, quantity)?;
        Ok(work.increment_stock(id.clone(), quantity))
    }
}

fn ensure_positive(id: &ProductId, quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(FulfillmentError::InvalidQuantity {
            product_id: id.clone(),
            quantity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StockCheck;
    use domain::{Money, NewProduct};
    use store::{InMemoryStore, WorkItem};

    async fn setup(stock: u32) -> (StockLedger<InMemoryStore>, Product) {
        let store = InMemoryStore::new();
        let product = store
            .create_product(NewProduct::new(
                "Keyboard",
                "Peripherals",
                "Mechanical keyboard",
                Money::from_dollars(80),
                stock,
            ))
            .await
            .unwrap();
        (StockLedger::new(store), product)
    }

    #[tokio::test]
    async fn test_decrement_reduces_stock() {
        let (ledger, product) = setup(10).await;

        let updated = ledger.decrement(product.id(), 4).await.unwrap();
        assert_eq!(updated.stock_quantity(), 6);

        let found = ledger.find_by_id(product.id()).await.unwrap().unwrap();
        assert_eq!(found.stock_quantity(), 6);
    }

    #[tokio::test]
    async fn test_decrement_to_exactly_zero() {
        let (ledger, product) = setup(3).await;

        let updated = ledger.decrement(product.id(), 3).await.unwrap();
        assert_eq!(updated.stock_quantity(), 0);
    }

    #[tokio::test]
    async fn test_decrement_beyond_stock_fails_unchanged() {
        let (ledger, product) = setup(2).await;

        let result = ledger.decrement(product.id(), 3).await;
        assert!(matches!(
            result,
            Err(FulfillmentError::InsufficientStock {
                requested: 3,
                available: 2,
                detected_at: StockCheck::Commit,
                ..
            })
        ));

        let found = ledger.find_by_id(product.id()).await.unwrap().unwrap();
        assert_eq!(found.stock_quantity(), 2);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected() {
        let (ledger, product) = setup(2).await;

        assert!(matches!(
            ledger.decrement(product.id(), 0).await,
            Err(FulfillmentError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            ledger.increment(product.id(), 0).await,
            Err(FulfillmentError::InvalidQuantity { quantity: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (ledger, _) = setup(2).await;
        let missing = ProductId::new("missing");

        assert!(ledger.find_by_id(&missing).await.unwrap().is_none());
        assert!(matches!(
            ledger.increment(&missing, 1).await,
            Err(FulfillmentError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_increment_then_decrement_restores_stock() {
        let (ledger, product) = setup(5).await;

        ledger.increment(product.id(), 7).await.unwrap();
        let restored = ledger.decrement(product.id(), 7).await.unwrap();
        assert_eq!(restored.stock_quantity(), 5);
    }

    #[tokio::test]
    async fn test_increment_past_stock_limit_fails_unchanged() {
        let (ledger, product) = setup(u32::MAX - 1).await;

        let result = ledger.increment(product.id(), 2).await;
        assert!(matches!(
            result,
            Err(FulfillmentError::StockOverflow {
                requested: 2,
                available: 4_294_967_294,
                ..
            })
        ));

        let found = ledger.find_by_id(product.id()).await.unwrap().unwrap();
        assert_eq!(found.stock_quantity(), u32::MAX - 1);

        let topped_up = ledger.increment(product.id(), 1).await.unwrap();
        assert_eq!(topped_up.stock_quantity(), u32::MAX);
    }

    #[tokio::test]
    async fn test_staging_only_builds_work() {
        let (ledger, product) = setup(5).await;

        let work = ledger
            .stage_reservation(UnitOfWork::new(), product.id(), 2)
            .unwrap();
        let work = ledger.stage_restitution(work, product.id(), 1).unwrap();

        assert_eq!(work.len(), 2);
        assert!(matches!(
            work.items()[0],
            WorkItem::DecrementStock { quantity: 2, .. }
        ));

        // nothing moved until the work is committed
        let found = ledger.find_by_id(product.id()).await.unwrap().unwrap();
        assert_eq!(found.stock_quantity(), 5);
    }
}
