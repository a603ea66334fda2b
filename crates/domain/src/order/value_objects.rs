//! Value objects for the order domain.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::product::Product;

/// A line in an order.
///
/// Carries a copy of the product data it was priced from, so later product
/// edits never change an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product identifier.
    pub product_id: ProductId,

    /// Product name at the time the order was placed.
    pub product_name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit captured when the order was placed.
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Creates a line priced from the product's current data.
    pub fn for_product(product: &Product, quantity: u32) -> Self {
        Self::new(
            product.id().clone(),
            product.name(),
            quantity,
            product.price(),
        )
    }

    /// Returns the total price for this line (quantity * unit_price), or
    /// None if it does not fit in a money amount.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let line = OrderLine::new("prod-1", "Widget", 3, Money::from_dollars(50));
        assert_eq!(line.line_total(), Some(Money::from_dollars(150)));

        let huge = OrderLine::new("prod-1", "Yacht", 3, Money::from_cents(i64::MAX / 2));
        assert_eq!(huge.line_total(), None);
    }

    #[test]
    fn test_line_serialization() {
        let line = OrderLine::new("prod-1", "Widget", 2, Money::from_cents(999));
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["product_id"], "prod-1");
        assert_eq!(json["unit_price"], 999);

        let back: OrderLine = serde_json::from_value(json).unwrap();
        assert_eq!(back, line);
    }
}
