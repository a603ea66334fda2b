//! Order service: the entry point for order operations.

use common::OrderId;
use domain::{Order, OrderStatus};
use store::Store;

use crate::error::{FulfillmentError, Result};
use crate::lifecycle::OrderLifecycle;
use crate::reservation::{InventoryReservation, OrderLineRequest};

/// Service for creating, reading and transitioning orders.
pub struct OrderService<S: Store> {
    store: S,
    reservation: InventoryReservation<S>,
    lifecycle: OrderLifecycle<S>,
}

impl<S: Store + Clone> OrderService<S> {
    /// Creates a new order service.
    pub fn new(store: S) -> Self {
        Self {
            reservation: InventoryReservation::new(store.clone()),
            lifecycle: OrderLifecycle::new(store.clone()),
            store,
        }
    }

    /// Creates an order, reserving stock for every line.
    pub async fn create_order(&self, lines: Vec<OrderLineRequest>) -> Result<Order> {
        self.reservation.create_order(lines).await
    }

    /// Lists every order, oldest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }

    /// Gets an order by id.
    pub async fn get_order(&self, id: &OrderId) -> Result<Order> {
        self.store
            .find_order(id)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(id.clone()))
    }

    /// Moves an order to a new status.
    pub async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order> {
        self.lifecycle.update_status(id, status).await
    }
}
