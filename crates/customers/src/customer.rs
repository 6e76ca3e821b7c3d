use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderdesk_core::CustomerId;

/// Directory record for a customer.
///
/// Read-only to the ordering core: existence is the only fact the order
/// transaction relies on, the rest is carried for display and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            registered_at: Utc::now(),
        }
    }
}
