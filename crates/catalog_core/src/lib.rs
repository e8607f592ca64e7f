//! Product catalog core.
//! Schema-checked product records over an embedded SQLite document store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;

pub use config::{CatalogConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::product::{
    is_valid_product_id, NewProduct, Product, ProductId, ProductLinks, ProductPatch, ProductTag,
    ProductUrls, ProductUser, ProductValidationError,
};
pub use repo::id_gen::{IdGenerator, UuidIdGenerator};
pub use repo::product_repo::{
    DeleteOutcome, ErrorKind, ProductListQuery, ProductRepository, RepoError, RepoResult,
    SqliteProductRepository, DEFAULT_LIST_LIMIT,
};
pub use seed::{ImportSummary, SeedError};
pub use service::product_service::ProductService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
