//! Order lifecycle manager.

use common::OrderId;
use domain::{Order, OrderStatus};
use store::{Store, StoreError, UnitOfWork};

use crate::error::{FulfillmentError, Result};
use crate::ledger::StockLedger;

/// Applies status transitions to persisted orders.
///
/// Legality is decided by the order status machine before anything is
/// written. Cancelling a pending order returns its reserved stock in the
/// same unit of work as the status change, and the status change itself is
/// a compare-and-set, so two concurrent cancellations cannot both restitute.
pub struct OrderLifecycle<S: Store> {
    store: S,
    ledger: StockLedger<S>,
}

impl<S: Store + Clone> OrderLifecycle<S> {
    /// Creates a new lifecycle manager over the given store.
    pub fn new(store: S) -> Self {
        let ledger = StockLedger::new(store.clone());
        Self { store, ledger }
    }

    /// Moves an order to `next`.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, order_id: &OrderId, next: OrderStatus) -> Result<Order> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))?;

        let current = order.status();
        if !current.can_transition_to(next) {
            return Err(FulfillmentError::InvalidStatusTransition {
                order_id: order_id.clone(),
                from: current,
                to: next,
            });
        }

        let mut work = UnitOfWork::new();
        let mut restituted = 0u64;
        if next.releases_stock() {
            for (product_id, quantity) in order.reserved_quantities() {
                work = self.ledger.stage_restitution(work, &product_id, quantity)?;
                restituted += u64::from(quantity);
            }
        }
        let work = work.set_order_status(order_id.clone(), current, next);

        let committed = match self.store.commit(work).await {
            Ok(committed) => committed,
            Err(StoreError::StatusConflict { actual, .. }) => {
                tracing::warn!(%actual, "order status changed concurrently");
                return Err(FulfillmentError::InvalidStatusTransition {
                    order_id: order_id.clone(),
                    from: actual,
                    to: next,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let updated = committed
            .into_order()
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.clone()))?;

        metrics::counter!("order_status_transitions_total", "to" => next.as_str()).increment(1);
        if restituted > 0 {
            metrics::counter!("stock_restituted_units_total").increment(restituted);
            tracing::info!(units = restituted, "reserved stock returned");
        }
        tracing::info!(from = %current, to = %next, "order status updated");

        Ok(updated)
    }
}
