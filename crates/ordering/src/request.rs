use serde::{Deserialize, Serialize};

use orderdesk_core::{CustomerId, DomainError, DomainResult, ProductId};

/// One requested product/quantity pair.
///
/// The same product id may appear more than once across a request; the
/// transaction counts duplicates against stock in aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Validated input to the order creation transaction.
///
/// Quantities are checked at construction, so the transaction only ever
/// sees well-formed requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    customer_id: CustomerId,
    items: Vec<RequestedItem>,
}

impl OrderRequest {
    pub fn new(customer_id: CustomerId, items: Vec<RequestedItem>) -> DomainResult<Self> {
        for item in &items {
            if item.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
        }
        Ok(Self { customer_id, items })
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn items(&self) -> &[RequestedItem] {
        &self.items
    }
}
