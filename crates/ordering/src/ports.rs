//! Collaborator contracts consumed by the order creation transaction.
//!
//! The transaction owns these traits; storage backends implement them. All
//! of them are narrow by design: lookup by identifier, one conditional
//! mutation, one create/read/discard store.

use std::sync::Arc;

use async_trait::async_trait;

use orderdesk_catalog::{DecrementOutcome, ProductSnapshot, StockDecrement};
use orderdesk_core::{CustomerId, OrderId, ProductId};
use orderdesk_customers::Customer;

use crate::error::StorageFault;
use crate::order::{Order, OrderLineItem};

/// Customer directory: resolve a customer by identifier.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StorageFault>;
}

/// Product catalog: batch snapshot reads and the conditional stock mutation.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Batch lookup. Returns only the matches; absence is inferred by the
    /// caller from the difference with the requested set.
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, StorageFault>;

    /// Conditional batch decrement: each entry applies only while current
    /// stock still covers it, and the batch is all-or-nothing. Returns
    /// `Conflict` (with nothing applied) when any product falls short at
    /// write time.
    async fn decrement_quantities(
        &self,
        decrements: &[StockDecrement],
    ) -> Result<DecrementOutcome, StorageFault>;
}

/// Order store: persist a fully-formed order and read it back.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist the order atomically and return it with its assigned
    /// identifier and timestamp.
    async fn create(
        &self,
        customer_id: CustomerId,
        line_items: Vec<OrderLineItem>,
    ) -> Result<Order, StorageFault>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StorageFault>;

    /// Remove an order whose stock reservation was lost, as if it had never
    /// been created. Removing an already-absent order is not an error.
    async fn discard(&self, id: OrderId) -> Result<(), StorageFault>;
}

#[async_trait]
impl<T: CustomerDirectory + ?Sized> CustomerDirectory for Arc<T> {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StorageFault> {
        (**self).find_by_id(id).await
    }
}

#[async_trait]
impl<T: ProductCatalog + ?Sized> ProductCatalog for Arc<T> {
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, StorageFault> {
        (**self).find_by_ids(ids).await
    }

    async fn decrement_quantities(
        &self,
        decrements: &[StockDecrement],
    ) -> Result<DecrementOutcome, StorageFault> {
        (**self).decrement_quantities(decrements).await
    }
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn create(
        &self,
        customer_id: CustomerId,
        line_items: Vec<OrderLineItem>,
    ) -> Result<Order, StorageFault> {
        (**self).create(customer_id, line_items).await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StorageFault> {
        (**self).find_by_id(id).await
    }

    async fn discard(&self, id: OrderId) -> Result<(), StorageFault> {
        (**self).discard(id).await
    }
}
