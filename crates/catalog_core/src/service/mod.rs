//! Catalog use-case services.
//!
//! # Responsibility
//! - Wrap repository calls into use-case level APIs with logging.
//! - Keep callers decoupled from storage details.

pub mod product_service;
