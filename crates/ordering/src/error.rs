//! Failure taxonomy of the order creation transaction.

use thiserror::Error;

use orderdesk_core::{CustomerId, ProductId};

/// Storage-layer fault reported by a collaborator contract.
///
/// Deliberately opaque: the transaction does not branch on what went wrong
/// inside a store, only on the fact that it did.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct StorageFault(#[from] anyhow::Error);

impl StorageFault {
    pub fn new(err: impl Into<anyhow::Error>) -> Self {
        Self(err.into())
    }

    pub fn msg(msg: impl Into<String>) -> Self {
        Self(anyhow::Error::msg(msg.into()))
    }
}

/// Terminal failure of one order creation attempt.
///
/// Offending identifiers are carried as structured payloads so callers can
/// render messages or codes independently. None of these are retried
/// internally; retrying (e.g. on `StockRaceLost`) is the caller's policy.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No customer with the given identifier exists; order not created.
    #[error("customer {0} does not exist")]
    CustomerNotFound(CustomerId),

    /// No products were requested; order not created.
    #[error("cannot create an order without products")]
    EmptyOrder,

    /// One or more requested product identifiers are not in the catalog.
    /// Each missing id is reported once. No stock was touched.
    #[error("{} requested product(s) are not in the catalog", .ids.len())]
    ProductsNotFound { ids: Vec<ProductId> },

    /// One or more requested quantities exceed availability at validation
    /// time. Each offending id is reported once. No stock was touched.
    #[error("{} requested product(s) exceed available stock", .ids.len())]
    InsufficientStock { ids: Vec<ProductId> },

    /// A concurrent order consumed the stock between validation and the
    /// conditional decrement. The order has been discarded.
    #[error("stock reservation lost to a concurrent order")]
    StockRaceLost,

    /// A collaborator could not durably complete its part of the
    /// transaction; nothing remains visible.
    #[error("order could not be durably recorded")]
    PersistenceFailure(#[from] StorageFault),
}
