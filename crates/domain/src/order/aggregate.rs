//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};

use super::{OrderError, OrderLine, OrderStatus};
use crate::money::Money;

/// An order that has been priced but not yet committed.
///
/// Lines can only be added while drafting; each addition consumes the draft
/// and returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDraft {
    lines: Vec<OrderLine>,
    total: Money,
}

impl OrderDraft {
    /// Creates an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a draft with `line` appended.
    pub fn with_line(mut self, line: OrderLine) -> Result<Self, OrderError> {
        if line.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: line.quantity,
            });
        }

        if !line.unit_price.is_positive() {
            return Err(OrderError::InvalidPrice {
                cents: line.unit_price.cents(),
            });
        }

        self.total = line
            .line_total()
            .and_then(|line_total| self.total.checked_add(line_total))
            .ok_or_else(|| OrderError::TotalOverflow {
                product_id: line.product_id.clone(),
            })?;
        self.lines.push(line);
        Ok(self)
    }

    /// Returns the drafted lines.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the total of all drafted lines.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns true if no line has been added.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Materializes the draft as a pending order under a store-issued id.
    pub fn place(self, id: OrderId, at: DateTime<Utc>) -> Order {
        Order {
            id,
            lines: self.lines,
            total: self.total,
            status: OrderStatus::Pending,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Order aggregate root.
///
/// A priced, itemized order. The line sequence is fixed at placement and the
/// total is always the sum of the line totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    lines: Vec<OrderLine>,
    total: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

// Query methods
impl Order {
    /// Rebuilds an order from stored data. The total is recomputed from the lines.
    pub fn restore(
        id: OrderId,
        lines: Vec<OrderLine>,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let mut total = Money::zero();
        for line in &lines {
            total = line
                .line_total()
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| OrderError::TotalOverflow {
                    product_id: line.product_id.clone(),
                })?;
        }

        Ok(Self {
            id,
            lines,
            total,
            status,
            created_at,
            updated_at,
        })
    }

    /// Returns the order ID.
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Returns the lines as a read-only slice.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns an owned copy of the lines.
    pub fn to_lines(&self) -> Vec<OrderLine> {
        self.lines.clone()
    }

    /// Returns the number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the order total.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the quantity reserved per product, merging repeated lines.
    ///
    /// Products are listed in the order they first appear.
    pub fn reserved_quantities(&self) -> Vec<(ProductId, u32)> {
        let mut merged: Vec<(ProductId, u32)> = Vec::new();
        for line in &self.lines {
            match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, quantity)) => *quantity = quantity.saturating_add(line.quantity),
                None => merged.push((line.product_id.clone(), line.quantity)),
            }
        }
        merged
    }
}

// Transition methods (return new values)
impl Order {
    /// Returns a copy of the order moved to `next`.
    ///
    /// Fails if the status machine has no edge from the current status.
    pub fn transition(&self, next: OrderStatus, at: DateTime<Utc>) -> Result<Self, OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }

        Ok(Self {
            status: next,
            updated_at: at,
            ..self.clone()
        })
    }
}
