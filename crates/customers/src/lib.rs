//! Customers domain module (the customer directory as seen by ordering).
//!
//! Customer management itself lives outside this system; ordering only ever
//! resolves customers by identifier through the directory contract.

pub mod customer;

pub use customer::Customer;
