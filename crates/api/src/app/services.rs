use std::sync::Arc;

use sqlx::PgPool;

use orderdesk_core::OrderId;
use orderdesk_infra::{
    InMemoryStore, PostgresCustomerDirectory, PostgresOrderStore, PostgresProductCatalog,
};
use orderdesk_ordering::{Order, OrderError, OrderRequest, OrderService, OrderStore, StorageFault};

type MemoryOrderService = OrderService<Arc<InMemoryStore>, Arc<InMemoryStore>, Arc<InMemoryStore>>;
type PostgresOrderService =
    OrderService<PostgresCustomerDirectory, PostgresProductCatalog, PostgresOrderStore>;

/// Backend wiring for the HTTP layer.
pub enum AppServices {
    InMemory {
        service: MemoryOrderService,
        store: Arc<InMemoryStore>,
    },
    Postgres {
        service: PostgresOrderService,
        orders: PostgresOrderStore,
    },
}

impl AppServices {
    /// In-memory wiring (dev/test). The store handle stays available to the
    /// caller for seeding and inspection.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        let service = OrderService::new(store.clone(), store.clone(), store.clone());
        AppServices::InMemory { service, store }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let service = OrderService::new(
            PostgresCustomerDirectory::new(pool.clone()),
            PostgresProductCatalog::new(pool.clone()),
            PostgresOrderStore::new(pool.clone()),
        );
        AppServices::Postgres {
            service,
            orders: PostgresOrderStore::new(pool),
        }
    }

    /// Select the backend from the environment, defaulting to in-memory.
    pub async fn build() -> Self {
        let use_persistent = std::env::var("USE_PERSISTENT_STORES")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        if use_persistent {
            let database_url = std::env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");
            let pool = PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to Postgres");
            return Self::postgres(pool);
        }

        tracing::info!("using in-memory stores");
        Self::in_memory(Arc::new(InMemoryStore::new()))
    }

    pub async fn create_order(&self, request: OrderRequest) -> Result<Order, OrderError> {
        match self {
            AppServices::InMemory { service, .. } => service.create_order(request).await,
            AppServices::Postgres { service, .. } => service.create_order(request).await,
        }
    }

    pub async fn find_order(&self, id: OrderId) -> Result<Option<Order>, StorageFault> {
        match self {
            AppServices::InMemory { store, .. } => store.find_by_id(id).await,
            AppServices::Postgres { orders, .. } => orders.find_by_id(id).await,
        }
    }
}
