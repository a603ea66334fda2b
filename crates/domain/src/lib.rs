//! Domain layer for the order fulfillment system.
//!
//! This crate provides the value types the fulfillment core works with:
//! - `Money` amounts in integer cents
//! - the `Product` aggregate and its creation/patch inputs
//! - the `Order` aggregate, its line items and the status state machine

pub mod money;
pub mod order;
pub mod product;

pub use common::{OrderId, ProductId};
pub use money::Money;
pub use order::{Order, OrderDraft, OrderError, OrderLine, OrderStatus};
pub use product::{NewProduct, Product, ProductError, ProductPatch};
