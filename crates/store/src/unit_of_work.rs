//! Explicit unit-of-work values.

use domain::{Order, OrderDraft, OrderStatus, Product};

use crate::{OrderId, ProductId};

/// A single mutation inside a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Remove `quantity` units from a product's stock, failing if fewer remain.
    DecrementStock {
        product_id: ProductId,
        quantity: u32,
    },

    /// Return `quantity` units to a product's stock.
    IncrementStock {
        product_id: ProductId,
        quantity: u32,
    },

    /// Persist a drafted order as a new pending order.
    InsertOrder(OrderDraft),

    /// Move an order to `next`, only if it is currently in `expected`.
    SetOrderStatus {
        order_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    },
}

/// An ordered batch of mutations that commit together or not at all.
///
/// Built by value and handed to [`Store::commit`](crate::Store::commit),
/// which makes the atomicity boundary visible at the call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitOfWork {
    items: Vec<WorkItem>,
}

impl UnitOfWork {
    /// Creates an empty unit of work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a guarded stock decrement.
    pub fn decrement_stock(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.items.push(WorkItem::DecrementStock {
            product_id,
            quantity,
        });
        self
    }

    /// Adds an unconditional stock increment.
    pub fn increment_stock(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.items.push(WorkItem::IncrementStock {
            product_id,
            quantity,
        });
        self
    }

    /// Adds the insertion of a new order.
    pub fn insert_order(mut self, draft: OrderDraft) -> Self {
        self.items.push(WorkItem::InsertOrder(draft));
        self
    }

    /// Adds a compare-and-set of an order's status.
    pub fn set_order_status(
        mut self,
        order_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Self {
        self.items.push(WorkItem::SetOrderStatus {
            order_id,
            expected,
            next,
        });
        self
    }

    /// Returns the queued items in execution order.
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Returns the number of queued items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the unit of work, returning its items.
    pub fn into_items(self) -> Vec<WorkItem> {
        self.items
    }
}

/// What a successful commit produced.
#[derive(Debug, Clone, Default)]
pub struct Committed {
    /// Orders inserted or updated, in work order.
    pub orders: Vec<Order>,

    /// Final state of every product whose stock moved, in first-touch order.
    pub products: Vec<Product>,
}

impl Committed {
    /// Returns the first order the commit inserted or updated.
    pub fn order(&self) -> Option<&Order> {
        self.orders.first()
    }

    /// Consumes the result, returning the first order.
    pub fn into_order(self) -> Option<Order> {
        self.orders.into_iter().next()
    }

    /// Returns the committed state of a product, if its stock moved.
    pub fn product(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id() == product_id)
    }

    /// Records a product's latest state, replacing an earlier entry for it.
    pub(crate) fn record_product(&mut self, product: Product) {
        match self.products.iter_mut().find(|p| p.id() == product.id()) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }
}

/// Error returned when a unit of work is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkValidationError {
    pub message: String,
}

impl std::fmt::Display for WorkValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unit of work validation error: {}", self.message)
    }
}

impl std::error::Error for WorkValidationError {}

/// Validates a unit of work before any of it is applied.
pub fn validate_work(work: &UnitOfWork) -> std::result::Result<(), WorkValidationError> {
    if work.is_empty() {
        return Err(WorkValidationError {
            message: "Cannot commit an empty unit of work".to_string(),
        });
    }

    let mut inserts = 0;
    for item in work.items() {
        match item {
            WorkItem::DecrementStock {
                product_id,
                quantity,
            }
            | WorkItem::IncrementStock {
                product_id,
                quantity,
            } if *quantity == 0 => {
                return Err(WorkValidationError {
                    message: format!("Stock change for product {product_id} must be positive"),
                });
            }
            WorkItem::InsertOrder(_) => inserts += 1,
            _ => {}
        }
    }

    // Stores report a single inserted order id back to the caller
    if inserts > 1 {
        return Err(WorkValidationError {
            message: "At most one order can be inserted per unit of work".to_string(),
        });
    }

    Ok(())
}
