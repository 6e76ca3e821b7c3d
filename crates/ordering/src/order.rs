use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderdesk_core::{CustomerId, OrderId, ProductId};

/// One product entry within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unit price captured from the catalog snapshot at validation time,
    /// in the smallest currency unit (e.g., cents). Never re-read after.
    pub unit_price: u64,
}

impl OrderLineItem {
    /// Line total in the smallest currency unit.
    pub fn total(&self) -> u64 {
        self.unit_price * self.quantity as u64
    }
}

/// A persisted sales order.
///
/// Created exactly once per successful transaction and never mutated by the
/// ordering core afterwards. Identifier and timestamp are assigned by the
/// order store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub line_items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Order total in the smallest currency unit.
    pub fn total(&self) -> u64 {
        self.line_items.iter().map(OrderLineItem::total).sum()
    }
}
