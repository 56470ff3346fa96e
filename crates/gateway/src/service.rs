//! Invoice actions as an editing session invokes them.
//!
//! Every action:
//! 1. runs local checks synchronously (validation, paid lock, lifecycle rule)
//! 2. only then calls a collaborator, at most once, without retrying
//! 3. returns a single outcome; the caller applies it to its [`Invoice`]
//!
//! Writes against one invoice are exclusive: while a save, status change,
//! delivery or delete is outstanding, another write on the same invoice is
//! refused with [`ServiceError::WriteInFlight`].

use std::collections::HashSet;
use std::sync::Mutex;

use invoiceforge_catalog::{CatalogLookup, Customer, ProductSnapshot};
use invoiceforge_core::{
    CustomerId, ExpectedVersion, InvoiceId, ProductId, RequestContext, ValidationErrors,
};
use invoiceforge_invoicing::{EngineConfig, Invoice, InvoiceStatus, InvoiceView};

use crate::document::{DeliveryReceipt, Document};
use crate::error::ServiceError;
use crate::gateway::{InvoiceFilter, InvoiceGateway, InvoiceSummary};

/// Invoices with a write currently outstanding.
#[derive(Debug, Default)]
struct InFlightWrites {
    ids: Mutex<HashSet<InvoiceId>>,
}

impl InFlightWrites {
    fn acquire(&self, id: InvoiceId) -> Result<WriteGuard<'_>, ServiceError> {
        let mut ids = self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !ids.insert(id) {
            tracing::debug!(invoice_id = %id, "write refused; another is in flight");
            return Err(ServiceError::WriteInFlight(id));
        }
        Ok(WriteGuard { writes: self, id })
    }

    fn release(&self, id: InvoiceId) {
        let mut ids = self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.remove(&id);
    }
}

/// Released on completion or when the action's future is dropped.
struct WriteGuard<'a> {
    writes: &'a InFlightWrites,
    id: InvoiceId,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.writes.release(self.id);
    }
}

pub struct InvoiceService<G, C> {
    gateway: G,
    catalog: C,
    config: EngineConfig,
    in_flight: InFlightWrites,
}

impl<G, C> InvoiceService<G, C>
where
    G: InvoiceGateway,
    C: CatalogLookup,
{
    pub fn new(gateway: G, catalog: C, config: EngineConfig) -> Self {
        Self {
            gateway,
            catalog,
            config,
            in_flight: InFlightWrites::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// A fresh draft dated `today`, using the configured defaults.
    pub fn new_draft(&self, today: chrono::NaiveDate) -> Invoice {
        Invoice::new_draft(&self.config, today)
    }

    pub async fn resolve_customer(
        &self,
        ctx: &RequestContext,
        id: CustomerId,
    ) -> Result<Customer, ServiceError> {
        self.catalog
            .lookup_customer(ctx, id)
            .await
            .map_err(|err| ServiceError::lookup("customer_id", err))
    }

    pub async fn resolve_product(
        &self,
        ctx: &RequestContext,
        id: ProductId,
    ) -> Result<ProductSnapshot, ServiceError> {
        self.catalog
            .lookup_product(ctx, id)
            .await
            .map_err(|err| ServiceError::lookup("product_id", err))
    }

    /// Look up `product_id` and copy it into the line at `index`.
    ///
    /// If the product cannot be resolved the line keeps its manual values,
    /// loses any previous product link, and the error is returned.
    ///
    /// The invoice stays borrowed until the lookup completes. A session that
    /// must keep editing meanwhile calls [`Self::resolve_product`] and then
    /// applies the snapshot with [`Invoice::select_product`].
    pub async fn select_product(
        &self,
        ctx: &RequestContext,
        invoice: &mut Invoice,
        index: usize,
        product_id: ProductId,
    ) -> Result<(), ServiceError> {
        // Refuse paid invoices and bad indices before going to the catalog.
        invoice.clear_product(index)?;

        let snapshot = self
            .catalog
            .lookup_product(ctx, product_id)
            .await
            .map_err(|err| ServiceError::lookup(format!("items[{index}].product_id"), err))?;

        invoice.select_product(index, product_id, &snapshot)?;
        tracing::debug!(product_id = %product_id, index, "product copied into line");
        Ok(())
    }

    /// Validate locally, then create or update through the gateway.
    ///
    /// Nothing is sent when validation fails. Apply the result with
    /// [`Invoice::mark_saved`].
    pub async fn save(
        &self,
        ctx: &RequestContext,
        invoice: &Invoice,
    ) -> Result<InvoiceView, ServiceError> {
        let submission = invoice.prepare_submission(&self.config).map_err(|err| {
            tracing::debug!(error = %err, "save refused locally");
            ServiceError::from(err)
        })?;

        match invoice.persisted() {
            None => {
                let view = self.gateway.create_invoice(ctx, submission).await?;
                tracing::info!(
                    invoice_id = %view.id,
                    invoice_number = %view.invoice_number,
                    "invoice saved"
                );
                Ok(view)
            }
            Some(persisted) => {
                let _guard = self.in_flight.acquire(persisted.id)?;
                let view = self
                    .gateway
                    .update_invoice(
                        ctx,
                        persisted.id,
                        submission,
                        ExpectedVersion::Exact(persisted.version),
                    )
                    .await?;
                tracing::info!(invoice_id = %view.id, version = view.version, "invoice saved");
                Ok(view)
            }
        }
    }

    /// Check the lifecycle rule locally, then ask the gateway to apply it.
    ///
    /// Apply the result with [`Invoice::mark_status`].
    pub async fn change_status(
        &self,
        ctx: &RequestContext,
        invoice: &Invoice,
        target: InvoiceStatus,
    ) -> Result<InvoiceView, ServiceError> {
        let id = invoice.id().ok_or_else(|| {
            ServiceError::Validation(ValidationErrors::single(
                "status",
                "invoice must be saved before its status can change",
            ))
        })?;
        let transition = invoice.request_status(target, self.config.transition_policy)?;

        let _guard = self.in_flight.acquire(id)?;
        let view = self.gateway.set_status(ctx, id, target).await?;

        tracing::info!(
            invoice_id = %id,
            from = %transition.from,
            to = %view.status,
            "invoice status changed"
        );
        if transition.enters_paid() {
            tracing::debug!(invoice_id = %id, "invoice paid; content is read-only");
        }
        Ok(view)
    }

    pub async fn load(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<InvoiceView, ServiceError> {
        Ok(self.gateway.get_invoice(ctx, id).await?)
    }

    /// Load a persisted invoice into a new editing session.
    pub async fn open(&self, ctx: &RequestContext, id: InvoiceId) -> Result<Invoice, ServiceError> {
        let view = self.load(ctx, id).await?;
        Ok(Invoice::from_view(&view))
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceSummary>, ServiceError> {
        Ok(self.gateway.list_invoices(ctx, filter).await?)
    }

    /// Document rendering never changes invoice state.
    pub async fn download(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<Document, ServiceError> {
        Ok(self.gateway.request_document(ctx, id).await?)
    }

    /// Deliver the invoice to its customer. A delivered draft becomes `sent`.
    ///
    /// Apply `receipt.invoice` with [`Invoice::mark_status`].
    pub async fn deliver(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<DeliveryReceipt, ServiceError> {
        let _guard = self.in_flight.acquire(id)?;
        let receipt = self.gateway.request_delivery(ctx, id).await.map_err(|err| {
            tracing::warn!(invoice_id = %id, error = %err, "delivery failed");
            ServiceError::from(err)
        })?;
        Ok(receipt)
    }

    /// Delete the invoice, whatever its status.
    pub async fn delete(&self, ctx: &RequestContext, id: InvoiceId) -> Result<(), ServiceError> {
        let _guard = self.in_flight.acquire(id)?;
        self.gateway.delete_invoice(ctx, id).await?;
        tracing::info!(invoice_id = %id, "invoice deleted");
        Ok(())
    }
}
