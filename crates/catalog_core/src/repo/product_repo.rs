//! Product repository contract and SQLite document-store implementation.
//!
//! # Responsibility
//! - Provide create/list/get/edit/destroy over the `products` table.
//! - Store each product as one JSON document keyed by its id.
//!
//! # Invariants
//! - `create`/`edit` validate the full product before writing.
//! - Read paths reject documents that no longer satisfy the schema.
//! - `list` orders by ascending id (byte order) before applying
//!   offset/limit.
//! - `edit` is read-modify-write without a transaction; the last write wins.

use crate::db::DbError;
use crate::model::product::{
    is_valid_product_id, NewProduct, Product, ProductId, ProductPatch, ProductValidationError,
};
use crate::repo::id_gen::{IdGenerator, UuidIdGenerator};
use rusqlite::ffi;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Page size used when a list query does not set a positive limit.
pub const DEFAULT_LIST_LIMIT: u32 = 25;

const PRODUCT_SELECT_SQL: &str = "SELECT id, document FROM products";

pub type RepoResult<T> = Result<T, RepoError>;

/// Coarse classification callers use to choose a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input violates the product schema.
    Validation,
    /// `edit` target does not exist.
    NotFound,
    /// The store could not complete the request.
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Storage => "storage",
        }
    }
}

/// Repository error for product persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(ProductValidationError),
    NotFound(ProductId),
    /// Lookup id is outside the shape the store accepts.
    InvalidId(String),
    /// Create collided with an existing primary key.
    DuplicateId(ProductId),
    Db(DbError),
    Serialization(serde_json::Error),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidId(_)
            | Self::DuplicateId(_)
            | Self::Db(_)
            | Self::Serialization(_)
            | Self::InvalidData(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => ErrorKind::Storage,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "product not found: {id}"),
            Self::InvalidId(id) => write!(f, "malformed product id `{id}`"),
            Self::DuplicateId(id) => write!(f, "product id already exists: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "failed to encode product document: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted product data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProductValidationError> for RepoError {
    fn from(value: ProductValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Filter and pagination options for listing products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductListQuery {
    /// Number of matching products to skip.
    pub offset: u32,
    /// Maximum products to return. `None` or `0` means `DEFAULT_LIST_LIMIT`.
    pub limit: Option<u32>,
    /// Exact, case-sensitive tag title filter.
    pub tag: Option<String>,
}

impl ProductListQuery {
    /// Query matching products tagged with `title`.
    pub fn with_tag(title: impl Into<String>) -> Self {
        Self {
            tag: Some(title.into()),
            ..Self::default()
        }
    }

    /// Query for one page of all products.
    pub fn page(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: Some(limit),
            tag: None,
        }
    }

    pub fn effective_limit(&self) -> u32 {
        normalize_list_limit(self.limit)
    }
}

/// Normalizes a requested page size; zero and unset fall back to the default.
pub fn normalize_list_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => DEFAULT_LIST_LIMIT,
        Some(value) => value,
    }
}

/// Acknowledgment returned by `destroy_product`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Rows removed: `0` or `1`.
    pub deleted_count: usize,
}

impl DeleteOutcome {
    pub fn deleted(&self) -> bool {
        self.deleted_count > 0
    }
}

/// Repository interface for product CRUD.
pub trait ProductRepository {
    /// Validates and persists a new product, generating its id when absent.
    fn create_product(&self, fields: NewProduct) -> RepoResult<Product>;
    /// Lists products by ascending id with optional tag filter.
    fn list_products(&self, query: &ProductListQuery) -> RepoResult<Vec<Product>>;
    /// Gets one product; `Ok(None)` when the id is unused.
    fn get_product(&self, id: &str) -> RepoResult<Option<Product>>;
    /// Applies `change` to an existing product and re-persists it.
    fn edit_product(&self, id: &str, change: ProductPatch) -> RepoResult<Product>;
    /// Hard-deletes at most one product.
    fn destroy_product(&self, id: &str) -> RepoResult<DeleteOutcome>;
}

/// SQLite-backed product repository.
///
/// Borrows a migrated connection; holds no state besides the id generator.
pub struct SqliteProductRepository<'conn, G: IdGenerator = UuidIdGenerator> {
    conn: &'conn Connection,
    ids: G,
}

impl<'conn> SqliteProductRepository<'conn> {
    /// Constructs a repository using random UUID ids.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_id_generator(conn, UuidIdGenerator)
    }
}

impl<'conn, G: IdGenerator> SqliteProductRepository<'conn, G> {
    /// Constructs a repository that draws new ids from `ids`.
    ///
    /// # Errors
    /// - `MissingRequiredTable`/`MissingRequiredColumn` when `conn` was not
    ///   opened through `crate::db`.
    pub fn with_id_generator(conn: &'conn Connection, ids: G) -> RepoResult<Self> {
        ensure_product_connection_ready(conn)?;
        Ok(Self { conn, ids })
    }
}

impl<G: IdGenerator> ProductRepository for SqliteProductRepository<'_, G> {
    fn create_product(&self, mut fields: NewProduct) -> RepoResult<Product> {
        let id = fields.id.take().unwrap_or_else(|| self.ids.next_id());
        let product = fields.into_product(id)?;
        let document = serde_json::to_string(&product)?;

        match self.conn.execute(
            "INSERT INTO products (id, document) VALUES (?1, ?2);",
            params![product.id.as_str(), document],
        ) {
            Ok(_) => Ok(product),
            Err(err) if is_primary_key_violation(&err) => Err(RepoError::DuplicateId(product.id)),
            Err(err) => Err(err.into()),
        }
    }

    fn list_products(&self, query: &ProductListQuery) -> RepoResult<Vec<Product>> {
        let mut sql = format!("{PRODUCT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(tag) = query.tag.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM json_each(products.document, '$.tags') AS tag
                    WHERE json_extract(tag.value, '$.title') = ?
                )",
            );
            bind_values.push(Value::Text(tag.clone()));
        }

        sql.push_str(" ORDER BY id ASC LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(query.effective_limit())));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row)?);
        }

        Ok(products)
    }

    fn get_product(&self, id: &str) -> RepoResult<Option<Product>> {
        ensure_lookup_id(id)?;

        let mut stmt = self
            .conn
            .prepare(&format!("{PRODUCT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_product_row(row)?));
        }

        Ok(None)
    }

    fn edit_product(&self, id: &str, change: ProductPatch) -> RepoResult<Product> {
        let mut product = self
            .get_product(id)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;

        change.apply_to(&mut product);
        product.validate()?;
        let document = serde_json::to_string(&product)?;

        let changed = self.conn.execute(
            "UPDATE products
             SET
                document = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![document, product.id.as_str()],
        )?;

        // Row deleted between read and write.
        if changed == 0 {
            return Err(RepoError::NotFound(product.id));
        }

        Ok(product)
    }

    fn destroy_product(&self, id: &str) -> RepoResult<DeleteOutcome> {
        ensure_lookup_id(id)?;

        let deleted_count = self
            .conn
            .execute("DELETE FROM products WHERE id = ?1;", [id])?;

        Ok(DeleteOutcome { deleted_count })
    }
}

fn parse_product_row(row: &Row<'_>) -> RepoResult<Product> {
    let id: String = row.get("id")?;
    let document: String = row.get("document")?;

    let product: Product = serde_json::from_str(&document).map_err(|err| {
        RepoError::InvalidData(format!("undecodable document for product `{id}`: {err}"))
    })?;
    if product.id != id {
        return Err(RepoError::InvalidData(format!(
            "document id `{}` does not match row id `{id}`",
            product.id
        )));
    }
    product.validate().map_err(|err| {
        RepoError::InvalidData(format!("product `{id}` violates schema: {err}"))
    })?;

    Ok(product)
}

fn ensure_lookup_id(id: &str) -> RepoResult<()> {
    if is_valid_product_id(id) {
        Ok(())
    } else {
        Err(RepoError::InvalidId(id.to_string()))
    }
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn ensure_product_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, "products")? {
        return Err(RepoError::MissingRequiredTable("products"));
    }

    for column in ["id", "document"] {
        if !table_has_column(conn, "products", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "products",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
