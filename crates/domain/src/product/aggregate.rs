//! Product value type.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

use super::ProductError;

/// Attributes of a product that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: Money,
    pub stock_quantity: u32,
}

impl NewProduct {
    /// Creates product attributes, leaving validation to [`NewProduct::validate`].
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock_quantity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: description.into(),
            price,
            stock_quantity,
        }
    }

    /// Checks the product invariants: a non-blank name and a positive price.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() {
            return Err(ProductError::EmptyName);
        }
        if !self.price.is_positive() {
            return Err(ProductError::InvalidPrice {
                cents: self.price.cents(),
            });
        }
        Ok(())
    }
}

/// Partial update of a product's descriptive attributes.
///
/// Stock is not part of a patch; it only moves through the stock ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
}

impl ProductPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.price.is_none()
    }
}

/// A persisted product.
///
/// Immutable once constructed; every change yields a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    category: String,
    description: String,
    price: Money,
    stock_quantity: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Materializes a product from validated attributes and a store-issued id.
    pub fn create(
        id: ProductId,
        attrs: NewProduct,
        at: DateTime<Utc>,
    ) -> Result<Self, ProductError> {
        attrs.validate()?;
        Ok(Self::restore(id, attrs, at, at))
    }

    /// Rebuilds a product from stored data without re-validating it.
    pub fn restore(
        id: ProductId,
        attrs: NewProduct,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: attrs.name,
            category: attrs.category,
            description: attrs.description,
            price: attrs.price,
            stock_quantity: attrs.stock_quantity,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &ProductId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if at least `quantity` units are available.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.stock_quantity >= quantity
    }

    /// Returns a copy with the patch applied, re-checking the invariants.
    pub fn patched(&self, patch: ProductPatch, at: DateTime<Utc>) -> Result<Self, ProductError> {
        let attrs = NewProduct {
            name: patch.name.unwrap_or_else(|| self.name.clone()),
            category: patch.category.unwrap_or_else(|| self.category.clone()),
            description: patch.description.unwrap_or_else(|| self.description.clone()),
            price: patch.price.unwrap_or(self.price),
            stock_quantity: self.stock_quantity,
        };
        attrs.validate()?;
        Ok(Self::restore(self.id.clone(), attrs, self.created_at, at))
    }

    /// Returns a copy carrying a new stock level.
    ///
    /// Stores call this to materialize ledger mutations they have already
    /// checked; nothing else should.
    pub fn with_stock(&self, stock_quantity: u32, at: DateTime<Utc>) -> Self {
        Self {
            stock_quantity,
            updated_at: at,
            ..self.clone()
        }
    }
}
