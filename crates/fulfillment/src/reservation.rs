//! Inventory reservation transaction.

use std::collections::HashMap;

use common::ProductId;
use domain::{Order, OrderDraft, OrderLine, Product};
use store::{Store, StoreError, UnitOfWork};

use crate::error::{FulfillmentError, Result, StockCheck};
use crate::ledger::StockLedger;

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLineRequest {
    /// Creates a new line request.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Creates orders while reserving their stock.
///
/// Runs in two phases. Validation checks every requested line against a
/// snapshot of the products without writing anything. The commit phase then
/// stages one guarded decrement per line plus the order insert on a single
/// [`UnitOfWork`], so either every decrement and the order land, or nothing
/// does.
pub struct InventoryReservation<S: Store> {
    store: S,
    ledger: StockLedger<S>,
}

impl<S: Store + Clone> InventoryReservation<S> {
    /// Creates a new reservation transaction over the given store.
    pub fn new(store: S) -> Self {
        let ledger = StockLedger::new(store.clone());
        Self { store, ledger }
    }

    /// Validates the requested lines, reserves their stock and persists a
    /// new pending order.
    ///
    /// On any failure no stock has moved and no order exists.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn create_order(&self, lines: Vec<OrderLineRequest>) -> Result<Order> {
        let start = std::time::Instant::now();
        let result = self.reserve(&lines).await;
        metrics::histogram!("order_reservation_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id(),
                    total = %order.total(),
                    "order created"
                );
            }
            Err(e) => {
                metrics::counter!("order_reservation_failures_total", "reason" => e.kind())
                    .increment(1);
                tracing::warn!(error = %e, "order reservation failed");
            }
        }

        result
    }

    async fn reserve(&self, lines: &[OrderLineRequest]) -> Result<Order> {
        // 1. Shape checks, before any lookup
        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(FulfillmentError::InvalidQuantity {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            });
        }

        // 2. Validate every line against one snapshot of the products
        let demand = aggregate_demand(lines);
        let ids: Vec<ProductId> = demand.iter().map(|(id, _)| id.clone()).collect();
        let products: HashMap<ProductId, Product> = self
            .ledger
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id().clone(), p))
            .collect();

        for (product_id, requested) in &demand {
            let product = products
                .get(product_id)
                .ok_or_else(|| FulfillmentError::ProductNotFound(product_id.clone()))?;
            if !product.has_stock_for(*requested) {
                return Err(FulfillmentError::InsufficientStock {
                    product_id: product_id.clone(),
                    requested: *requested,
                    available: product.stock_quantity(),
                    detected_at: StockCheck::Validation,
                });
            }
        }

        // 3. Price each line from the validated snapshot
        let mut draft = OrderDraft::new();
        let mut work = UnitOfWork::new();
        for line in lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| FulfillmentError::ProductNotFound(line.product_id.clone()))?;
            draft = draft.with_line(OrderLine::for_product(product, line.quantity))?;
            work = self
                .ledger
                .stage_reservation(work, &line.product_id, line.quantity)?;
        }

        tracing::debug!(
            lines = draft.lines().len(),
            total = %draft.total(),
            "reservation validated"
        );

        // 4. Commit every decrement and the order together
        let committed = self.store.commit(work.insert_order(draft)).await?;
        committed.into_order().ok_or_else(|| {
            FulfillmentError::Persistence(StoreError::CorruptRecord(
                "commit did not return the inserted order".to_string(),
            ))
        })
    }
}

/// Sums requested quantities per product, in first-appearance order.
fn aggregate_demand(lines: &[OrderLineRequest]) -> Vec<(ProductId, u32)> {
    let mut demand: Vec<(ProductId, u32)> = Vec::new();
    for line in lines {
        match demand.iter_mut().find(|(id, _)| *id == line.product_id) {
            // u32::MAX already exceeds any stock level
            Some((_, quantity)) => *quantity = quantity.saturating_add(line.quantity),
            None => demand.push((line.product_id.clone(), line.quantity)),
        }
    }
    demand
}
