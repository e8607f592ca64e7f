//! Catalog domain model.
//!
//! # Responsibility
//! - Define the product document shape stored by the catalog.
//! - Keep runtime schema enforcement next to the typed record.
//!
//! # Invariants
//! - Every product is identified by one opaque, immutable `ProductId`.
//! - Deletion is a hard delete; the model carries no tombstone state.

pub mod product;
