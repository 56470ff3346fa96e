use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use invoiceforge_core::{CustomerId, DomainError, DomainResult, ProductId, RequestContext, TenantId};

use crate::customer::Customer;
use crate::lookup::{CatalogLookup, LookupError};
use crate::product::{CatalogProduct, ProductSnapshot};

/// In-memory, tenant-scoped catalog.
///
/// Intended for tests/dev. Records of one tenant are invisible to another.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    customers: RwLock<HashMap<(TenantId, CustomerId), Customer>>,
    products: RwLock<HashMap<(TenantId, ProductId), CatalogProduct>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a customer record.
    pub fn upsert_customer(&self, tenant_id: TenantId, customer: Customer) -> DomainResult<()> {
        customer.validate()?;
        let mut customers = self
            .customers
            .write()
            .map_err(|_| DomainError::invariant("lock poisoned"))?;
        customers.insert((tenant_id, customer.id), customer);
        Ok(())
    }

    /// Insert or replace a product record.
    ///
    /// Replacing a product never touches line items that already copied it.
    pub fn upsert_product(&self, tenant_id: TenantId, product: CatalogProduct) -> DomainResult<()> {
        product.validate()?;
        let mut products = self
            .products
            .write()
            .map_err(|_| DomainError::invariant("lock poisoned"))?;
        products.insert((tenant_id, product.id), product);
        Ok(())
    }

    pub fn remove_product(&self, tenant_id: TenantId, id: ProductId) -> bool {
        match self.products.write() {
            Ok(mut products) => products.remove(&(tenant_id, id)).is_some(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn lookup_customer(
        &self,
        ctx: &RequestContext,
        id: CustomerId,
    ) -> Result<Customer, LookupError> {
        let customers = self
            .customers
            .read()
            .map_err(|_| LookupError::Unavailable("lock poisoned".to_string()))?;
        let found = customers.get(&(ctx.tenant_id(), id)).cloned();
        if found.is_none() {
            tracing::debug!(
                tenant_id = %ctx.tenant_id(),
                customer_id = %id,
                "customer lookup missed"
            );
        }
        found.ok_or_else(|| LookupError::customer_not_found(id))
    }

    async fn lookup_product(
        &self,
        ctx: &RequestContext,
        id: ProductId,
    ) -> Result<ProductSnapshot, LookupError> {
        let products = self
            .products
            .read()
            .map_err(|_| LookupError::Unavailable("lock poisoned".to_string()))?;
        let found = products.get(&(ctx.tenant_id(), id)).map(CatalogProduct::snapshot);
        if found.is_none() {
            tracing::debug!(
                tenant_id = %ctx.tenant_id(),
                product_id = %id,
                "product lookup missed"
            );
        }
        found.ok_or_else(|| LookupError::product_not_found(id))
    }
}
