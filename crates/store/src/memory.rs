use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{NewProduct, Order, OrderDraft, OrderStatus, Product, ProductPatch};
use tokio::sync::RwLock;

use crate::{
    OrderId, ProductId, Result, StoreError,
    store::Store,
    unit_of_work::{Committed, UnitOfWork, WorkItem, validate_work},
};

#[derive(Debug, Default)]
struct MemoryState {
    products: Vec<Product>,
    orders: Vec<Order>,
}

impl MemoryState {
    fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id() == id)
    }

    fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id() == id)
    }
}

/// Changes staged by a commit that are published only once every item succeeded.
struct Staged<'a> {
    base: &'a MemoryState,
    at: DateTime<Utc>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    inserted: Vec<Order>,
    committed: Committed,
}

impl<'a> Staged<'a> {
    fn new(base: &'a MemoryState, at: DateTime<Utc>) -> Self {
        Self {
            base,
            at,
            products: HashMap::new(),
            orders: HashMap::new(),
            inserted: Vec::new(),
            committed: Committed::default(),
        }
    }

    fn product(&self, id: &ProductId) -> Result<&Product> {
        self.products
            .get(id)
            .or_else(|| self.base.product(id))
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))
    }

    fn order(&self, id: &OrderId) -> Result<&Order> {
        self.orders
            .get(id)
            .or_else(|| self.base.order(id))
            .ok_or_else(|| StoreError::OrderNotFound(id.clone()))
    }

    fn stage_product(&mut self, product: Product) {
        self.committed.record_product(product.clone());
        self.products.insert(product.id().clone(), product);
    }

    fn apply(&mut self, item: WorkItem) -> Result<()> {
        match item {
            WorkItem::DecrementStock {
                product_id,
                quantity,
            } => {
                let current = self.product(&product_id)?;
                let available = current.stock_quantity();
                if available < quantity {
                    return Err(StoreError::InsufficientStock {
                        product_id,
                        requested: quantity,
                        available,
                    });
                }
                let updated = current.with_stock(available - quantity, self.at);
                self.stage_product(updated);
            }
            WorkItem::IncrementStock {
                product_id,
                quantity,
            } => {
                let current = self.product(&product_id)?;
                let available = current.stock_quantity();
                let Some(stock) = available.checked_add(quantity) else {
                    return Err(StoreError::StockOverflow {
                        product_id,
                        requested: quantity,
                        available,
                    });
                };
                let updated = current.with_stock(stock, self.at);
                self.stage_product(updated);
            }
            WorkItem::InsertOrder(draft) => {
                let order = self.place(draft);
                self.committed.orders.push(order.clone());
                self.inserted.push(order);
            }
            WorkItem::SetOrderStatus {
                order_id,
                expected,
                next,
            } => {
                let current = self.order(&order_id)?;
                if current.status() != expected {
                    return Err(StoreError::StatusConflict {
                        order_id,
                        expected,
                        actual: current.status(),
                    });
                }
                let updated = with_status(current, next, self.at)?;
                self.committed.orders.push(updated.clone());
                self.orders.insert(order_id, updated);
            }
        }
        Ok(())
    }

    fn place(&self, draft: OrderDraft) -> Order {
        draft.place(OrderId::generate(), self.at)
    }
}

fn with_status(order: &Order, status: OrderStatus, at: DateTime<Utc>) -> Result<Order> {
    Order::restore(
        order.id().clone(),
        order.to_lines(),
        status,
        order.created_at(),
        at,
    )
    .map_err(|e| StoreError::CorruptRecord(e.to_string()))
}

/// In-memory store implementation for testing.
///
/// This implementation keeps all products and orders in memory and provides
/// the same interface as the PostgreSQL implementation. A commit holds the
/// write lock for its whole duration, so units of work are serialized.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of products stored.
    pub async fn product_count(&self) -> usize {
        self.state.read().await.products.len()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all products and orders.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.products.clear();
        state.orders.clear();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.product(id).cloned())
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .iter()
            .filter(|p| ids.contains(p.id()))
            .cloned()
            .collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.read().await.products.clone())
    }

    async fn create_product(&self, attrs: NewProduct) -> Result<Product> {
        let product = Product::create(ProductId::generate(), attrs, Utc::now())?;
        self.state.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: &ProductId, patch: ProductPatch) -> Result<Product> {
        let mut state = self.state.write().await;
        let slot = state
            .products
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))?;
        let updated = slot.patched(patch, Utc::now())?;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete_product(&self, id: &ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.products.len();
        state.products.retain(|p| p.id() != id);
        if state.products.len() == before {
            return Err(StoreError::ProductNotFound(id.clone()));
        }
        Ok(())
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.order(id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.state.read().await.orders.clone())
    }

    async fn commit(&self, work: UnitOfWork) -> Result<Committed> {
        validate_work(&work).map_err(|e| StoreError::InvalidWork(e.message))?;

        let start = std::time::Instant::now();
        let mut state = self.state.write().await;

        let (products, orders, inserted, committed) = {
            let mut staged = Staged::new(&state, Utc::now());
            for item in work.into_items() {
                if let Err(e) = staged.apply(item) {
                    metrics::counter!("store_commit_rollbacks_total", "backend" => "memory")
                        .increment(1);
                    tracing::debug!(error = %e, "unit of work rolled back");
                    return Err(e);
                }
            }
            (
                staged.products,
                staged.orders,
                staged.inserted,
                staged.committed,
            )
        };

        // Publish: every item succeeded
        for product in state.products.iter_mut() {
            if let Some(updated) = products.get(product.id()) {
                *product = updated.clone();
            }
        }
        for order in state.orders.iter_mut() {
            if let Some(updated) = orders.get(order.id()) {
                *order = updated.clone();
            }
        }
        state.orders.extend(inserted);

        metrics::histogram!("store_commit_duration_seconds", "backend" => "memory")
            .record(start.elapsed().as_secs_f64());
        Ok(committed)
    }
}
