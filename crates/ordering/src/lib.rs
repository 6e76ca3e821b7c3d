//! Ordering domain module — the order creation transaction.
//!
//! This crate contains the business rules for creating a sales order against
//! the customer directory and the stock-tracked catalog: reference
//! validation, availability checking, price snapshotting, persistence and
//! the conditional stock decrement, as one all-or-nothing unit. Storage and
//! HTTP live elsewhere; collaborators are reached through the port traits in
//! [`ports`].

pub mod error;
pub mod order;
pub mod ports;
pub mod request;
pub mod service;

pub use error::{OrderError, StorageFault};
pub use order::{Order, OrderLineItem};
pub use ports::{CustomerDirectory, OrderStore, ProductCatalog};
pub use request::{OrderRequest, RequestedItem};
pub use service::OrderService;
