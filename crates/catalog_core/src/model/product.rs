//! Product document model, schema validation and typed patches.
//!
//! # Responsibility
//! - Declare the statically typed product document.
//! - Enforce required-field rules in a validation step separate from typing.
//! - Describe partial updates as an explicit patch object.
//!
//! # Invariants
//! - `id` is assigned once; `ProductPatch` has no way to change it.
//! - Required strings are non-empty in every persisted state.
//! - Every tag carries a non-empty `title`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static PRODUCT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid product id regex"));

/// Opaque product identifier.
///
/// Generated ids are hex strings, imported ids keep their original form.
pub type ProductId = String;

/// Returns whether `value` is an id the catalog store accepts.
pub fn is_valid_product_id(value: &str) -> bool {
    PRODUCT_ID_RE.is_match(value)
}

/// Schema violation found while validating a product document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductValidationError {
    /// A required field is absent, null or an empty string.
    MissingField(&'static str),
    /// Tag at `index` has no title.
    MissingTagTitle { index: usize },
    /// Caller-supplied id does not match the accepted id shape.
    InvalidId(String),
}

impl ProductValidationError {
    /// Dotted path of the offending field, e.g. `urls.thumb`.
    pub fn field_path(&self) -> String {
        match self {
            Self::MissingField(path) => (*path).to_string(),
            Self::MissingTagTitle { index } => format!("tags[{index}].title"),
            Self::InvalidId(_) => "id".to_string(),
        }
    }
}

impl Display for ProductValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(_) | Self::MissingTagTitle { .. } => {
                write!(f, "product field `{}` is required", self.field_path())
            }
            Self::InvalidId(value) => write!(
                f,
                "invalid product id `{value}`; expected 1-128 characters of [A-Za-z0-9_-]"
            ),
        }
    }
}

impl Error for ProductValidationError {}

/// Image URLs of a product in three renditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUrls {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub regular: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub small: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thumb: String,
}

impl ProductUrls {
    fn validate(&self) -> Result<(), ProductValidationError> {
        require(&self.regular, "urls.regular")?;
        require(&self.small, "urls.small")?;
        require(&self.thumb, "urls.thumb")
    }
}

/// Canonical links of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLinks {
    /// API link; serialized as `self`.
    #[serde(rename = "self", default, deserialize_with = "null_as_empty")]
    pub self_link: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub html: String,
}

impl ProductLinks {
    fn validate(&self) -> Result<(), ProductValidationError> {
        require(&self.self_link, "links.self")?;
        require(&self.html, "links.html")
    }
}

/// Author of the product image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUser {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
}

impl ProductUser {
    fn validate(&self) -> Result<(), ProductValidationError> {
        require(&self.id, "user.id")?;
        require(&self.first_name, "user.first_name")?;
        require(&self.username, "user.username")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTag {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
}

impl ProductTag {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Persisted product document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Accepts the legacy `_id` key when reading documents.
    #[serde(alias = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub alt_description: Option<String>,
    pub likes: i64,
    pub urls: ProductUrls,
    pub links: ProductLinks,
    pub user: ProductUser,
    #[serde(default)]
    pub tags: Vec<ProductTag>,
}

impl Product {
    /// Validates schema rules that the type system does not encode.
    ///
    /// # Errors
    /// - `InvalidId` when `id` is outside the accepted shape.
    /// - `MissingField`/`MissingTagTitle` for empty required strings.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        validate_id(&self.id)?;
        self.urls.validate()?;
        self.links.validate()?;
        self.user.validate()?;
        validate_tags(&self.tags)
    }

    /// Returns whether any tag title equals `title` exactly.
    pub fn has_tag(&self, title: &str) -> bool {
        self.tags.iter().any(|tag| tag.title == title)
    }
}

/// Candidate attributes for creating a product.
///
/// Required fields are optional here so that a missing value surfaces as a
/// `ProductValidationError` instead of a construction failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewProduct {
    /// Caller-chosen id; generated on create when `None`.
    #[serde(alias = "_id")]
    pub id: Option<ProductId>,
    pub description: Option<String>,
    pub alt_description: Option<String>,
    pub likes: Option<i64>,
    pub urls: Option<ProductUrls>,
    pub links: Option<ProductLinks>,
    pub user: Option<ProductUser>,
    pub tags: Vec<ProductTag>,
}

impl NewProduct {
    /// Checks the candidate without consuming it.
    ///
    /// A present `id` must have the accepted shape; an absent one is fine.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if let Some(id) = self.id.as_deref() {
            validate_id(id)?;
        }
        if self.likes.is_none() {
            return Err(ProductValidationError::MissingField("likes"));
        }
        self.urls
            .as_ref()
            .ok_or(ProductValidationError::MissingField("urls"))?
            .validate()?;
        self.links
            .as_ref()
            .ok_or(ProductValidationError::MissingField("links"))?
            .validate()?;
        self.user
            .as_ref()
            .ok_or(ProductValidationError::MissingField("user"))?
            .validate()?;
        validate_tags(&self.tags)
    }

    /// Builds the persisted shape using `id`, ignoring `self.id`.
    pub fn into_product(self, id: ProductId) -> Result<Product, ProductValidationError> {
        let product = Product {
            id,
            description: self.description,
            alt_description: self.alt_description,
            likes: self
                .likes
                .ok_or(ProductValidationError::MissingField("likes"))?,
            urls: self.urls.ok_or(ProductValidationError::MissingField("urls"))?,
            links: self
                .links
                .ok_or(ProductValidationError::MissingField("links"))?,
            user: self.user.ok_or(ProductValidationError::MissingField("user"))?,
            tags: self.tags,
        };
        product.validate()?;
        Ok(product)
    }
}

impl From<Product> for NewProduct {
    fn from(value: Product) -> Self {
        Self {
            id: Some(value.id),
            description: value.description,
            alt_description: value.alt_description,
            likes: Some(value.likes),
            urls: Some(value.urls),
            links: Some(value.links),
            user: Some(value.user),
            tags: value.tags,
        }
    }
}

/// Shallow, top-level partial update for a product.
///
/// `None` leaves a field untouched. Optional text fields use a nested
/// option: `Some(None)` clears the field. Nested records are replaced
/// wholesale. There is no `id` member; an `id` key in JSON input is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    #[serde(deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub alt_description: Option<Option<String>>,
    #[serde(deserialize_with = "required")]
    pub likes: Option<i64>,
    #[serde(deserialize_with = "required")]
    pub urls: Option<ProductUrls>,
    #[serde(deserialize_with = "required")]
    pub links: Option<ProductLinks>,
    #[serde(deserialize_with = "required")]
    pub user: Option<ProductUser>,
    #[serde(deserialize_with = "required")]
    pub tags: Option<Vec<ProductTag>>,
}

impl ProductPatch {
    /// Returns `true` when no field would be overwritten.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overwrites every present field on `product`.
    ///
    /// The result is not validated here; callers re-validate before
    /// persisting.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(alt_description) = self.alt_description {
            product.alt_description = alt_description;
        }
        if let Some(likes) = self.likes {
            product.likes = likes;
        }
        if let Some(urls) = self.urls {
            product.urls = urls;
        }
        if let Some(links) = self.links {
            product.links = links;
        }
        if let Some(user) = self.user {
            product.user = user;
        }
        if let Some(tags) = self.tags {
            product.tags = tags;
        }
    }
}

fn validate_id(id: &str) -> Result<(), ProductValidationError> {
    if is_valid_product_id(id) {
        Ok(())
    } else {
        Err(ProductValidationError::InvalidId(id.to_string()))
    }
}

fn validate_tags(tags: &[ProductTag]) -> Result<(), ProductValidationError> {
    match tags.iter().position(|tag| tag.title.is_empty()) {
        Some(index) => Err(ProductValidationError::MissingTagTitle { index }),
        None => Ok(()),
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ProductValidationError> {
    if value.is_empty() {
        return Err(ProductValidationError::MissingField(field));
    }
    Ok(())
}

// Null and missing required strings both become "" so validation reports them.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn required<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<T>::deserialize(deserializer)? {
        Some(value) => Ok(Some(value)),
        None => Err(de::Error::custom("required product field cannot be null")),
    }
}
