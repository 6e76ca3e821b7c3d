use serde::{Deserialize, Serialize};

use orderdesk_core::ProductId;

/// Catalog record for a stock-tracked product.
///
/// `available_quantity` is the currently unreserved stock and never goes
/// negative. Price is in the smallest currency unit (e.g., cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub available_quantity: i64,
    pub unit_price: u64,
}

impl Product {
    /// Capture the facts the ordering core judges a request against.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            available_quantity: self.available_quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Point-in-time view of a product as read by one order transaction.
///
/// Taken once per transaction and reused for the availability check, the
/// price snapshot, and the decrement computation. Never re-read mid-flight.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub available_quantity: i64,
    pub unit_price: u64,
}

/// One entry of a conditional stock decrement batch.
///
/// Implementations of the mutation contract must subtract `quantity` from
/// *current* stock, and only while current stock still covers it. Applying a
/// snapshot-derived absolute value instead could restore stock a concurrent
/// order already consumed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDecrement {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Result of a conditional stock decrement batch.
///
/// `Conflict` means at least one product no longer covered its decrement at
/// write time; the whole batch must have been left unapplied.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum DecrementOutcome {
    Applied,
    Conflict,
}
