//! Seed data import for the product catalog.
//!
//! # Responsibility
//! - Parse a JSON array of product documents from disk.
//! - Insert them through a `ProductRepository`, keeping their ids.
//!
//! # Invariants
//! - Every document is validated before the first insert; one bad document
//!   aborts the import with nothing written.
//! - Documents whose id already exists are skipped, so importing the same
//!   file twice is a no-op the second time.

use crate::model::product::{NewProduct, ProductValidationError};
use crate::repo::product_repo::{ProductRepository, RepoError};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Counts reported by a finished import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub enum SeedError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid {
        index: usize,
        source: ProductValidationError,
    },
    Repo {
        index: usize,
        source: RepoError,
    },
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read seed file `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "seed file is not a product array: {err}"),
            Self::Invalid { index, source } => write!(f, "seed product #{index}: {source}"),
            Self::Repo { index, source } => {
                write!(f, "failed to import seed product #{index}: {source}")
            }
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { source, .. } => Some(source),
            Self::Repo { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for SeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Reads and parses a seed file.
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<NewProduct>, SeedError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_seed_documents(&raw)
}

/// Parses a JSON array of product documents.
///
/// Unknown keys are ignored and `_id` is accepted as an alias of `id`.
pub fn parse_seed_documents(raw: &str) -> Result<Vec<NewProduct>, SeedError> {
    Ok(serde_json::from_str(raw)?)
}

/// Inserts `products` through `repo`, skipping ids that already exist.
pub fn import_products<R: ProductRepository + ?Sized>(
    repo: &R,
    products: Vec<NewProduct>,
) -> Result<ImportSummary, SeedError> {
    for (index, product) in products.iter().enumerate() {
        product
            .validate()
            .map_err(|source| SeedError::Invalid { index, source })?;
    }

    let mut summary = ImportSummary::default();
    for (index, product) in products.into_iter().enumerate() {
        if let Some(id) = product.id.as_deref() {
            let existing = repo
                .get_product(id)
                .map_err(|source| SeedError::Repo { index, source })?;
            if existing.is_some() {
                debug!("event=seed_import module=seed status=skip id={id}");
                summary.skipped += 1;
                continue;
            }
        }

        match repo.create_product(product) {
            Ok(_) => summary.inserted += 1,
            Err(RepoError::DuplicateId(_)) => summary.skipped += 1,
            Err(source) => return Err(SeedError::Repo { index, source }),
        }
    }

    Ok(summary)
}
