//! Product catalog domain module.
//!
//! This crate contains the catalog record the ordering core reads from, the
//! snapshot it validates against, and the types of the conditional stock
//! mutation contract. Catalog management itself lives outside this system.

pub mod product;

pub use product::{DecrementOutcome, Product, ProductSnapshot, StockDecrement};
