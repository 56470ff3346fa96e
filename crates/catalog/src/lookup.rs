use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use invoiceforge_core::{CustomerId, ProductId, RequestContext};

use crate::customer::Customer;
use crate::product::ProductSnapshot;

/// Kind of record a lookup targeted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecordKind {
    Customer,
    Product,
}

impl core::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordKind::Customer => f.write_str("customer"),
            RecordKind::Product => f.write_str("product"),
        }
    }
}

/// Catalog lookup failure.
///
/// `NotFound` is recoverable: the referencing field is left unresolved and the
/// rest of the edit continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: i64 },

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

impl LookupError {
    pub fn customer_not_found(id: CustomerId) -> Self {
        Self::NotFound {
            kind: RecordKind::Customer,
            id: id.get(),
        }
    }

    pub fn product_not_found(id: ProductId) -> Self {
        Self::NotFound {
            kind: RecordKind::Product,
            id: id.get(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}

/// Read-only access to customer and product records.
///
/// Implementations talk to whatever owns the catalog (remote API, database).
/// The core never caches the results; every selection is a fresh lookup.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn lookup_customer(
        &self,
        ctx: &RequestContext,
        id: CustomerId,
    ) -> Result<Customer, LookupError>;

    async fn lookup_product(
        &self,
        ctx: &RequestContext,
        id: ProductId,
    ) -> Result<ProductSnapshot, LookupError>;
}

#[async_trait]
impl<C> CatalogLookup for Arc<C>
where
    C: CatalogLookup + ?Sized,
{
    async fn lookup_customer(
        &self,
        ctx: &RequestContext,
        id: CustomerId,
    ) -> Result<Customer, LookupError> {
        (**self).lookup_customer(ctx, id).await
    }

    async fn lookup_product(
        &self,
        ctx: &RequestContext,
        id: ProductId,
    ) -> Result<ProductSnapshot, LookupError> {
        (**self).lookup_product(ctx, id).await
    }
}
