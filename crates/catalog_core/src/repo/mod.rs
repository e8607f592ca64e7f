//! Repository layer for the product catalog.
//!
//! # Responsibility
//! - Define the product data-access contract.
//! - Keep SQL and JSON document details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate products before any SQL mutation.
//! - Missing rows are reported as `None`/zero counts, not errors, except for
//!   `edit` which needs an existing target.

pub mod id_gen;
pub mod product_repo;
