//! Order fulfillment core.
//!
//! Turns requested line items into priced orders while reserving stock, and
//! drives orders through their status lifecycle:
//! 1. [`StockLedger`] is the only path through which stock moves
//! 2. [`InventoryReservation`] validates every line, then commits all stock
//!    decrements and the new order as one unit of work
//! 3. [`OrderLifecycle`] applies status transitions, returning reserved stock
//!    in the same unit of work when an order is cancelled

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod reservation;
pub mod service;

pub use catalog::ProductService;
pub use error::{FulfillmentError, Result, StockCheck};
pub use ledger::StockLedger;
pub use lifecycle::OrderLifecycle;
pub use reservation::{InventoryReservation, OrderLineRequest};
pub use service::OrderService;
