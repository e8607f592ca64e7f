//! Product id generation strategies.

use crate::model::product::ProductId;
use uuid::Uuid;

/// Source of fresh product ids, injected into repositories.
///
/// Implementations must return ids accepted by
/// [`is_valid_product_id`](crate::model::product::is_valid_product_id) with
/// negligible collision probability. No ordering is required.
pub trait IdGenerator {
    fn next_id(&self) -> ProductId;
}

/// Random UUID v4 ids in 32-character lowercase hex form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> ProductId {
        Uuid::new_v4().simple().to_string()
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for &G {
    fn next_id(&self) -> ProductId {
        (**self).next_id()
    }
}
