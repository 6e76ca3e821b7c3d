//! In-memory collaborator implementations.
//!
//! One store implements all three contracts over a single lock, which makes
//! the conditional decrement trivially atomic. Intended for tests/dev; not
//! optimized for performance.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use orderdesk_catalog::{DecrementOutcome, Product, ProductSnapshot, StockDecrement};
use orderdesk_core::{CustomerId, OrderId, ProductId};
use orderdesk_customers::Customer;
use orderdesk_ordering::{
    CustomerDirectory, Order, OrderLineItem, OrderStore, ProductCatalog, StorageFault,
};

#[derive(Debug, Default)]
struct MemoryState {
    customers: HashMap<CustomerId, Customer>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory customer directory, product catalog and order store in one.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_customer(&self, customer: Customer) {
        let mut state = self.state.write().unwrap();
        state.customers.insert(customer.id, customer);
    }

    pub fn insert_product(&self, product: Product) {
        let mut state = self.state.write().unwrap();
        state.products.insert(product.id, product);
    }

    /// Current stock for a product.
    pub fn product_quantity(&self, id: ProductId) -> Option<i64> {
        let state = self.state.read().unwrap();
        state.products.get(&id).map(|p| p.available_quantity)
    }

    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryStore {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StorageFault> {
        let state = self.state.read().unwrap();
        Ok(state.customers.get(&id).cloned())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, StorageFault> {
        let state = self.state.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).map(Product::snapshot))
            .collect())
    }

    async fn decrement_quantities(
        &self,
        decrements: &[StockDecrement],
    ) -> Result<DecrementOutcome, StorageFault> {
        let mut state = self.state.write().unwrap();

        // Verify the whole batch against current stock before touching any
        // of it: the batch is all-or-nothing.
        let covered = decrements.iter().all(|d| {
            state
                .products
                .get(&d.product_id)
                .is_some_and(|p| p.available_quantity >= d.quantity)
        });
        if !covered {
            return Ok(DecrementOutcome::Conflict);
        }

        // Subtract from current stock, not a caller-provided absolute, so a
        // stale snapshot can never restore concurrently-consumed units.
        for d in decrements {
            if let Some(product) = state.products.get_mut(&d.product_id) {
                product.available_quantity -= d.quantity;
            }
        }
        Ok(DecrementOutcome::Applied)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn create(
        &self,
        customer_id: CustomerId,
        line_items: Vec<OrderLineItem>,
    ) -> Result<Order, StorageFault> {
        let order = Order {
            id: OrderId::new(),
            customer_id,
            line_items,
            created_at: Utc::now(),
        };
        let mut state = self.state.write().unwrap();
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StorageFault> {
        let state = self.state.read().unwrap();
        Ok(state.orders.get(&id).cloned())
    }

    async fn discard(&self, id: OrderId) -> Result<(), StorageFault> {
        let mut state = self.state.write().unwrap();
        state.orders.remove(&id);
        Ok(())
    }
}
