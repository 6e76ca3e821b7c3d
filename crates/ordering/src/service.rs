//! The order creation transaction.

use std::collections::{HashMap, HashSet};

use tracing::instrument;

use orderdesk_catalog::{DecrementOutcome, ProductSnapshot, StockDecrement};
use orderdesk_core::{OrderId, ProductId};

use crate::error::OrderError;
use crate::order::{Order, OrderLineItem};
use crate::ports::{CustomerDirectory, OrderStore, ProductCatalog};
use crate::request::{OrderRequest, RequestedItem};

/// Creates sales orders against the customer directory, the product catalog
/// and the order store.
///
/// Collaborators are injected at construction so tests can substitute
/// fakes. One instance serves many concurrent invocations; serialization of
/// competing orders is delegated entirely to the catalog's conditional
/// decrement.
pub struct OrderService<C, P, O> {
    customers: C,
    catalog: P,
    orders: O,
}

impl<C, P, O> OrderService<C, P, O>
where
    C: CustomerDirectory,
    P: ProductCatalog,
    O: OrderStore,
{
    pub fn new(customers: C, catalog: P, orders: O) -> Self {
        Self {
            customers,
            catalog,
            orders,
        }
    }

    /// Create an order, all-or-nothing.
    ///
    /// Validates the customer, resolves one catalog snapshot, checks
    /// availability against it, persists the order with prices fixed from
    /// that same snapshot, then conditionally decrements stock. A decrement
    /// conflict discards the just-created order and surfaces as
    /// [`OrderError::StockRaceLost`]; every earlier failure leaves the
    /// system untouched.
    #[instrument(
        skip_all,
        fields(customer_id = %request.customer_id(), item_count = request.items().len())
    )]
    pub async fn create_order(&self, request: OrderRequest) -> Result<Order, OrderError> {
        let customer = self
            .customers
            .find_by_id(request.customer_id())
            .await?
            .ok_or(OrderError::CustomerNotFound(request.customer_id()))?;

        if request.items().is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        // One snapshot read serves existence, availability and pricing.
        let requested_ids = distinct_ids(request.items());
        let snapshots = self.catalog.find_by_ids(&requested_ids).await?;
        let by_id: HashMap<ProductId, ProductSnapshot> =
            snapshots.into_iter().map(|s| (s.id, s)).collect();

        let missing: Vec<ProductId> = requested_ids
            .iter()
            .copied()
            .filter(|id| !by_id.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(OrderError::ProductsNotFound { ids: missing });
        }

        // Duplicate ids in one request count against stock in aggregate.
        let totals = aggregate_quantities(request.items());
        let short: Vec<ProductId> = requested_ids
            .iter()
            .copied()
            .filter(|id| totals[id] > by_id[id].available_quantity)
            .collect();
        if !short.is_empty() {
            return Err(OrderError::InsufficientStock { ids: short });
        }

        // Prices are fixed here, from the snapshot the availability check
        // was judged against. Line items stay per-occurrence.
        let line_items: Vec<OrderLineItem> = request
            .items()
            .iter()
            .map(|item| OrderLineItem {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: by_id[&item.product_id].unit_price,
            })
            .collect();

        let order = self.orders.create(customer.id, line_items).await?;

        let decrements: Vec<StockDecrement> = requested_ids
            .iter()
            .copied()
            .map(|id| StockDecrement {
                product_id: id,
                quantity: totals[&id],
            })
            .collect();

        match self.catalog.decrement_quantities(&decrements).await {
            Ok(DecrementOutcome::Applied) => {
                tracing::info!(order_id = %order.id, "order created");
                Ok(order)
            }
            Ok(DecrementOutcome::Conflict) => {
                self.discard_unreserved(order.id).await?;
                Err(OrderError::StockRaceLost)
            }
            Err(fault) => {
                self.discard_unreserved(order.id).await?;
                Err(OrderError::PersistenceFailure(fault))
            }
        }
    }

    /// Compensation: an order must not remain visible without its stock
    /// actually reserved.
    async fn discard_unreserved(&self, id: OrderId) -> Result<(), OrderError> {
        tracing::warn!(order_id = %id, "stock decrement did not apply, discarding order");
        self.orders
            .discard(id)
            .await
            .map_err(OrderError::PersistenceFailure)
    }
}

/// Distinct product ids in first-occurrence order.
fn distinct_ids(items: &[RequestedItem]) -> Vec<ProductId> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.product_id))
        .map(|item| item.product_id)
        .collect()
}

/// Total requested quantity per product (duplicates summed).
fn aggregate_quantities(items: &[RequestedItem]) -> HashMap<ProductId, i64> {
    let mut totals = HashMap::new();
    for item in items {
        *totals.entry(item.product_id).or_insert(0) += item.quantity;
    }
    totals
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use orderdesk_catalog::Product;
    use orderdesk_core::CustomerId;
    use orderdesk_customers::Customer;

    use super::*;
    use crate::error::StorageFault;

    #[derive(Default)]
    struct FakeDirectory {
        customers: HashMap<CustomerId, Customer>,
    }

    impl FakeDirectory {
        fn with_customer(customer: Customer) -> Self {
            let mut customers = HashMap::new();
            customers.insert(customer.id, customer);
            Self { customers }
        }
    }

    #[async_trait]
    impl CustomerDirectory for FakeDirectory {
        async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StorageFault> {
            Ok(self.customers.get(&id).cloned())
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        products: Mutex<HashMap<ProductId, Product>>,
        lookups: AtomicUsize,
        conflict_on_decrement: bool,
        fail_decrement: bool,
    }

    impl FakeCatalog {
        fn with_products(products: Vec<Product>) -> Self {
            Self {
                products: Mutex::new(products.into_iter().map(|p| (p.id, p)).collect()),
                ..Self::default()
            }
        }

        fn quantity(&self, id: ProductId) -> i64 {
            self.products.lock().unwrap()[&id].available_quantity
        }
    }

    #[async_trait]
    impl ProductCatalog for FakeCatalog {
        async fn find_by_ids(
            &self,
            ids: &[ProductId],
        ) -> Result<Vec<ProductSnapshot>, StorageFault> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let products = self.products.lock().unwrap();
            Ok(ids
                .iter()
                .filter_map(|id| products.get(id).map(Product::snapshot))
                .collect())
        }

        async fn decrement_quantities(
            &self,
            decrements: &[StockDecrement],
        ) -> Result<DecrementOutcome, StorageFault> {
            if self.fail_decrement {
                return Err(StorageFault::msg("catalog store unavailable"));
            }
            if self.conflict_on_decrement {
                return Ok(DecrementOutcome::Conflict);
            }
            let mut products = self.products.lock().unwrap();
            let covered = decrements.iter().all(|d| {
                products
                    .get(&d.product_id)
                    .is_some_and(|p| p.available_quantity >= d.quantity)
            });
            if !covered {
                return Ok(DecrementOutcome::Conflict);
            }
            for d in decrements {
                products.get_mut(&d.product_id).unwrap().available_quantity -= d.quantity;
            }
            Ok(DecrementOutcome::Applied)
        }
    }

    #[derive(Default)]
    struct FakeOrders {
        orders: Mutex<HashMap<OrderId, Order>>,
        fail_create: bool,
    }

    impl FakeOrders {
        fn count(&self) -> usize {
            self.orders.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OrderStore for FakeOrders {
        async fn create(
            &self,
            customer_id: CustomerId,
            line_items: Vec<OrderLineItem>,
        ) -> Result<Order, StorageFault> {
            if self.fail_create {
                return Err(StorageFault::msg("order store unavailable"));
            }
            let order = Order {
                id: OrderId::new(),
                customer_id,
                line_items,
                created_at: Utc::now(),
            };
            self.orders.lock().unwrap().insert(order.id, order.clone());
            Ok(order)
        }

        async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StorageFault> {
            Ok(self.orders.lock().unwrap().get(&id).cloned())
        }

        async fn discard(&self, id: OrderId) -> Result<(), StorageFault> {
            self.orders.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    fn test_customer() -> Customer {
        Customer::new(CustomerId::new(), "Test Customer", "customer@example.com")
    }

    fn test_product(id: ProductId, quantity: i64, unit_price: u64) -> Product {
        Product {
            id,
            sku: format!("SKU-{id}"),
            name: "Test Product".to_string(),
            available_quantity: quantity,
            unit_price,
        }
    }

    fn service(
        directory: FakeDirectory,
        catalog: FakeCatalog,
        orders: FakeOrders,
    ) -> (
        OrderService<Arc<FakeDirectory>, Arc<FakeCatalog>, Arc<FakeOrders>>,
        Arc<FakeCatalog>,
        Arc<FakeOrders>,
    ) {
        let catalog = Arc::new(catalog);
        let orders = Arc::new(orders);
        let svc = OrderService::new(Arc::new(directory), catalog.clone(), orders.clone());
        (svc, catalog, orders)
    }

    fn request(customer_id: CustomerId, items: &[(ProductId, i64)]) -> OrderRequest {
        OrderRequest::new(
            customer_id,
            items
                .iter()
                .map(|&(product_id, quantity)| RequestedItem { product_id, quantity })
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn creates_order_with_snapshot_prices_and_decrements_stock() {
        let customer = test_customer();
        let p1 = ProductId::new();
        let p2 = ProductId::new();
        let (svc, catalog, orders) = service(
            FakeDirectory::with_customer(customer.clone()),
            FakeCatalog::with_products(vec![
                test_product(p1, 10, 500),
                test_product(p2, 2, 300),
            ]),
            FakeOrders::default(),
        );

        let order = svc
            .create_order(request(customer.id, &[(p1, 3), (p2, 2)]))
            .await
            .unwrap();

        assert_eq!(order.customer_id, customer.id);
        assert_eq!(
            order.line_items,
            vec![
                OrderLineItem { product_id: p1, quantity: 3, unit_price: 500 },
                OrderLineItem { product_id: p2, quantity: 2, unit_price: 300 },
            ]
        );
        assert_eq!(catalog.quantity(p1), 7);
        assert_eq!(catalog.quantity(p2), 0);
        assert!(orders.find_by_id(order.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_customer_is_rejected_before_any_catalog_read() {
        let p1 = ProductId::new();
        let (svc, catalog, orders) = service(
            FakeDirectory::default(),
            FakeCatalog::with_products(vec![test_product(p1, 10, 500)]),
            FakeOrders::default(),
        );

        let missing_customer = CustomerId::new();
        let err = svc
            .create_order(request(missing_customer, &[(p1, 1)]))
            .await
            .unwrap_err();

        match err {
            OrderError::CustomerNotFound(id) => assert_eq!(id, missing_customer),
            _ => panic!("Expected CustomerNotFound"),
        }
        assert_eq!(catalog.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(catalog.quantity(p1), 10);
        assert_eq!(orders.count(), 0);
    }

    #[tokio::test]
    async fn empty_request_is_rejected_without_mutation() {
        let customer = test_customer();
        let (svc, _catalog, orders) = service(
            FakeDirectory::with_customer(customer.clone()),
            FakeCatalog::default(),
            FakeOrders::default(),
        );

        let err = svc.create_order(request(customer.id, &[])).await.unwrap_err();

        assert!(matches!(err, OrderError::EmptyOrder));
        assert_eq!(orders.count(), 0);
    }

    #[tokio::test]
    async fn missing_products_are_each_listed_once() {
        let customer = test_customer();
        let p1 = ProductId::new();
        let p3 = ProductId::new();
        let p4 = ProductId::new();
        let (svc, catalog, orders) = service(
            FakeDirectory::with_customer(customer.clone()),
            FakeCatalog::with_products(vec![test_product(p1, 10, 500)]),
            FakeOrders::default(),
        );

        let err = svc
            .create_order(request(customer.id, &[(p1, 1), (p3, 1), (p3, 2), (p4, 1)]))
            .await
            .unwrap_err();

        match err {
            OrderError::ProductsNotFound { ids } => assert_eq!(ids, vec![p3, p4]),
            _ => panic!("Expected ProductsNotFound"),
        }
        // Valid items in the same request must not have been reserved.
        assert_eq!(catalog.quantity(p1), 10);
        assert_eq!(orders.count(), 0);
    }

    #[tokio::test]
    async fn insufficient_stock_lists_offenders_and_leaves_stock_untouched() {
        let customer = test_customer();
        let p1 = ProductId::new();
        let p2 = ProductId::new();
        let (svc, catalog, orders) = service(
            FakeDirectory::with_customer(customer.clone()),
            FakeCatalog::with_products(vec![
                test_product(p1, 10, 500),
                test_product(p2, 2, 300),
            ]),
            FakeOrders::default(),
        );

        let err = svc
            .create_order(request(customer.id, &[(p1, 3), (p2, 5)]))
            .await
            .unwrap_err();

        match err {
            OrderError::InsufficientStock { ids } => assert_eq!(ids, vec![p2]),
            _ => panic!("Expected InsufficientStock"),
        }
        assert_eq!(catalog.quantity(p1), 10);
        assert_eq!(catalog.quantity(p2), 2);
        assert_eq!(orders.count(), 0);
    }

    #[tokio::test]
    async fn duplicate_product_ids_are_summed_before_the_availability_check() {
        let customer = test_customer();
        let p1 = ProductId::new();
        let (svc, _catalog, _orders) = service(
            FakeDirectory::with_customer(customer.clone()),
            FakeCatalog::with_products(vec![test_product(p1, 10, 500)]),
            FakeOrders::default(),
        );

        // 6 + 5 exceeds the 10 in stock even though each occurrence fits.
        let err = svc
            .create_order(request(customer.id, &[(p1, 6), (p1, 5)]))
            .await
            .unwrap_err();

        match err {
            OrderError::InsufficientStock { ids } => assert_eq!(ids, vec![p1]),
            _ => panic!("Expected InsufficientStock"),
        }
    }

    #[tokio::test]
    async fn duplicate_product_ids_decrement_in_aggregate_with_per_occurrence_lines() {
        let customer = test_customer();
        let p1 = ProductId::new();
        let (svc, catalog, _orders) = service(
            FakeDirectory::with_customer(customer.clone()),
            FakeCatalog::with_products(vec![test_product(p1, 10, 500)]),
            FakeOrders::default(),
        );

        let order = svc
            .create_order(request(customer.id, &[(p1, 6), (p1, 4)]))
            .await
            .unwrap();

        assert_eq!(order.line_items.len(), 2);
        assert_eq!(catalog.quantity(p1), 0);
    }

    #[tokio::test]
    async fn lost_decrement_race_discards_the_order() {
        let customer = test_customer();
        let p1 = ProductId::new();
        let (svc, _catalog, orders) = service(
            FakeDirectory::with_customer(customer.clone()),
            FakeCatalog {
                conflict_on_decrement: true,
                ..FakeCatalog::with_products(vec![test_product(p1, 1, 500)])
            },
            FakeOrders::default(),
        );

        let err = svc
            .create_order(request(customer.id, &[(p1, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::StockRaceLost));
        assert_eq!(orders.count(), 0);
    }

    #[tokio::test]
    async fn order_store_fault_surfaces_as_persistence_failure() {
        let customer = test_customer();
        let p1 = ProductId::new();
        let (svc, catalog, _orders) = service(
            FakeDirectory::with_customer(customer.clone()),
            FakeCatalog::with_products(vec![test_product(p1, 10, 500)]),
            FakeOrders { fail_create: true, ..FakeOrders::default() },
        );

        let err = svc
            .create_order(request(customer.id, &[(p1, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::PersistenceFailure(_)));
        assert_eq!(catalog.quantity(p1), 10);
    }

    #[tokio::test]
    async fn decrement_fault_discards_the_order_and_reports_persistence_failure() {
        let customer = test_customer();
        let p1 = ProductId::new();
        let (svc, _catalog, orders) = service(
            FakeDirectory::with_customer(customer.clone()),
            FakeCatalog {
                fail_decrement: true,
                ..FakeCatalog::with_products(vec![test_product(p1, 10, 500)])
            },
            FakeOrders::default(),
        );

        let err = svc
            .create_order(request(customer.id, &[(p1, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::PersistenceFailure(_)));
        assert_eq!(orders.count(), 0);
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        fn product_pool(ids: &[ProductId], quantities: &[i64]) -> Vec<Product> {
            ids.iter()
                .zip(quantities)
                .map(|(&id, &quantity)| test_product(id, quantity, 100))
                .collect()
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Aggregation never loses or invents quantity.
            #[test]
            fn aggregate_quantities_preserves_the_total(
                quantities in proptest::collection::vec(1i64..100, 1..20),
                indices in proptest::collection::vec(0usize..4, 1..20),
            ) {
                let ids: Vec<ProductId> = (0..4).map(|_| ProductId::new()).collect();
                let items: Vec<RequestedItem> = quantities
                    .iter()
                    .zip(&indices)
                    .map(|(&quantity, &idx)| RequestedItem {
                        product_id: ids[idx],
                        quantity,
                    })
                    .collect();

                let totals = aggregate_quantities(&items);
                let raw_total: i64 = items.iter().map(|i| i.quantity).sum();
                let aggregated_total: i64 = totals.values().sum();
                prop_assert_eq!(raw_total, aggregated_total);
                for item in &items {
                    prop_assert!(totals[&item.product_id] >= item.quantity);
                }
            }

            /// Distinct ids keep first-occurrence order and contain no duplicates.
            #[test]
            fn distinct_ids_are_unique_and_ordered(
                indices in proptest::collection::vec(0usize..4, 1..20),
            ) {
                let ids: Vec<ProductId> = (0..4).map(|_| ProductId::new()).collect();
                let items: Vec<RequestedItem> = indices
                    .iter()
                    .map(|&idx| RequestedItem { product_id: ids[idx], quantity: 1 })
                    .collect();

                let distinct = distinct_ids(&items);
                let unique: HashSet<ProductId> = distinct.iter().copied().collect();
                prop_assert_eq!(unique.len(), distinct.len());
                // First occurrence in the request decides the position.
                let mut seen = HashSet::new();
                let expected: Vec<ProductId> = items
                    .iter()
                    .filter(|i| seen.insert(i.product_id))
                    .map(|i| i.product_id)
                    .collect();
                prop_assert_eq!(distinct, expected);
            }

            /// The transaction succeeds exactly when every aggregate total is
            /// covered, decrements by exactly the totals on success, and
            /// leaves stock untouched on failure.
            #[test]
            fn stock_moves_by_exactly_the_aggregate_or_not_at_all(
                stock in proptest::collection::vec(0i64..20, 3),
                requested in proptest::collection::vec((0usize..3, 1i64..10), 1..8),
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let ids: Vec<ProductId> = (0..3).map(|_| ProductId::new()).collect();
                    let customer = test_customer();
                    let (svc, catalog, orders) = service(
                        FakeDirectory::with_customer(customer.clone()),
                        FakeCatalog::with_products(product_pool(&ids, &stock)),
                        FakeOrders::default(),
                    );

                    let items: Vec<(ProductId, i64)> = requested
                        .iter()
                        .map(|&(idx, quantity)| (ids[idx], quantity))
                        .collect();
                    let req = request(customer.id, &items);
                    let totals = aggregate_quantities(req.items());
                    let fits = ids
                        .iter()
                        .enumerate()
                        .all(|(idx, id)| totals.get(id).copied().unwrap_or(0) <= stock[idx]);

                    let outcome = svc.create_order(req).await;

                    for (idx, id) in ids.iter().enumerate() {
                        let expected = if fits {
                            stock[idx] - totals.get(id).copied().unwrap_or(0)
                        } else {
                            stock[idx]
                        };
                        prop_assert_eq!(catalog.quantity(*id), expected);
                    }
                    prop_assert_eq!(outcome.is_ok(), fits);
                    prop_assert_eq!(orders.count(), usize::from(fits));
                    Ok(())
                })?;
            }
        }
    }
}
