//! Product use-case service.
//!
//! # Responsibility
//! - Provide the create/list/get/edit/destroy entry points for callers.
//! - Apply the configured default page size to list queries.
//! - Emit metadata-only log events for every operation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - Errors propagate unchanged; no retry or local recovery.
//! - Logs carry ids and counts, never product content.

use crate::model::product::{NewProduct, Product, ProductPatch};
use crate::repo::product_repo::{
    DeleteOutcome, ProductListQuery, ProductRepository, RepoError, RepoResult, DEFAULT_LIST_LIMIT,
};
use crate::seed::{self, ImportSummary, SeedError};
use log::{debug, info, warn};
use std::path::Path;

/// Use-case facade over a product repository.
pub struct ProductService<R: ProductRepository> {
    repo: R,
    default_limit: u32,
}

impl<R: ProductRepository> ProductService<R> {
    /// Creates a service paging lists by `DEFAULT_LIST_LIMIT`.
    pub fn new(repo: R) -> Self {
        Self::with_default_limit(repo, DEFAULT_LIST_LIMIT)
    }

    /// Creates a service with a custom default page size; `0` keeps the
    /// built-in default.
    pub fn with_default_limit(repo: R, default_limit: u32) -> Self {
        let default_limit = if default_limit == 0 {
            DEFAULT_LIST_LIMIT
        } else {
            default_limit
        };
        Self {
            repo,
            default_limit,
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Creates a product, generating its id when `fields.id` is `None`.
    pub fn create(&self, fields: NewProduct) -> RepoResult<Product> {
        let result = self.repo.create_product(fields);
        match &result {
            Ok(product) => info!(
                "event=product_create module=service status=ok id={} tags={}",
                product.id,
                product.tags.len()
            ),
            Err(err) => log_failure("product_create", None, err),
        }
        result
    }

    /// Lists one page of products, filling in the default page size.
    pub fn list(&self, mut query: ProductListQuery) -> RepoResult<Vec<Product>> {
        if matches!(query.limit, None | Some(0)) {
            query.limit = Some(self.default_limit);
        }

        let result = self.repo.list_products(&query);
        match &result {
            Ok(products) => debug!(
                "event=product_list module=service status=ok offset={} limit={} tagged={} count={}",
                query.offset,
                query.effective_limit(),
                query.tag.is_some(),
                products.len()
            ),
            Err(err) => log_failure("product_list", None, err),
        }
        result
    }

    /// Gets one product; `Ok(None)` when no product has `id`.
    pub fn get(&self, id: &str) -> RepoResult<Option<Product>> {
        let result = self.repo.get_product(id);
        match &result {
            Ok(found) => debug!(
                "event=product_get module=service status=ok id={id} found={}",
                found.is_some()
            ),
            Err(err) => log_failure("product_get", Some(id), err),
        }
        result
    }

    /// Overwrites the fields present in `change` and returns the result.
    pub fn edit(&self, id: &str, change: ProductPatch) -> RepoResult<Product> {
        let result = self.repo.edit_product(id, change);
        match &result {
            Ok(_) => info!("event=product_edit module=service status=ok id={id}"),
            Err(err) => log_failure("product_edit", Some(id), err),
        }
        result
    }

    /// Removes a product; a missing id yields `deleted_count == 0`.
    pub fn destroy(&self, id: &str) -> RepoResult<DeleteOutcome> {
        let result = self.repo.destroy_product(id);
        match &result {
            Ok(outcome) => info!(
                "event=product_destroy module=service status=ok id={id} deleted_count={}",
                outcome.deleted_count
            ),
            Err(err) => log_failure("product_destroy", Some(id), err),
        }
        result
    }

    /// Imports a seed file of product documents, keeping their ids.
    pub fn import_seed(&self, path: impl AsRef<Path>) -> Result<ImportSummary, SeedError> {
        let path = path.as_ref();
        let result =
            seed::load_seed_file(path).and_then(|products| seed::import_products(&self.repo, products));
        match &result {
            Ok(summary) => info!(
                "event=seed_import module=service status=ok path={} inserted={} skipped={}",
                path.display(),
                summary.inserted,
                summary.skipped
            ),
            Err(err) => warn!(
                "event=seed_import module=service status=error path={} error={err}",
                path.display()
            ),
        }
        result
    }
}

fn log_failure(event: &str, id: Option<&str>, err: &RepoError) {
    warn!(
        "event={event} module=service status=error id={} error_kind={} error={err}",
        id.unwrap_or("-"),
        err.kind().as_str()
    );
}
