use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use invoiceforge_core::{CustomerId, ExpectedVersion, InvoiceId, RequestContext};
use invoiceforge_invoicing::{InvoiceStatus, InvoiceSubmission, InvoiceView};

use crate::document::{DeliveryReceipt, Document};
use crate::error::GatewayError;

/// Largest page a listing returns.
pub const MAX_PAGE_SIZE: usize = 100;

/// Listing criteria. Results are newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    /// Case-insensitive substring of the invoice number.
    pub search: Option<String>,
    pub skip: usize,
    pub limit: usize,
}

impl Default for InvoiceFilter {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            skip: 0,
            limit: MAX_PAGE_SIZE,
        }
    }
}

impl InvoiceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn page(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }

    /// `limit` clamped to `1..=MAX_PAGE_SIZE`.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn matches(&self, view: &InvoiceView) -> bool {
        if self.status.is_some_and(|status| status != view.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => view
                .invoice_number
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
            _ => true,
        }
    }
}

/// One row of an invoice listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub customer_id: CustomerId,
    /// `None` when the customer can no longer be resolved.
    pub customer_name: Option<String>,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl InvoiceSummary {
    pub fn from_view(view: &InvoiceView, customer_name: Option<String>) -> Self {
        Self {
            id: view.id,
            invoice_number: view.invoice_number.clone(),
            customer_id: view.content.customer_id,
            customer_name,
            status: view.status,
            issue_date: view.content.issue_date,
            due_date: view.content.due_date,
            currency: view.content.currency.clone(),
            total: view.totals.total,
            created_at: view.created_at,
        }
    }
}

/// Persistence collaborator for invoices.
///
/// Implementations must:
/// - scope every call to `ctx`'s tenant
/// - serialize writes per invoice, so a status change and a content update
///   never interleave
/// - apply each write atomically (all of it or none of it)
#[async_trait]
pub trait InvoiceGateway: Send + Sync {
    /// Persist a new invoice in `draft`, assigning its id and number.
    async fn create_invoice(
        &self,
        ctx: &RequestContext,
        submission: InvoiceSubmission,
    ) -> Result<InvoiceView, GatewayError>;

    async fn get_invoice(&self, ctx: &RequestContext, id: InvoiceId)
        -> Result<InvoiceView, GatewayError>;

    async fn list_invoices(
        &self,
        ctx: &RequestContext,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceSummary>, GatewayError>;

    /// Replace header fields and items. A stale `expected` version is a conflict.
    async fn update_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
        submission: InvoiceSubmission,
        expected: ExpectedVersion,
    ) -> Result<InvoiceView, GatewayError>;

    async fn set_status(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
        target: InvoiceStatus,
    ) -> Result<InvoiceView, GatewayError>;

    /// Remove an invoice regardless of status.
    async fn delete_invoice(&self, ctx: &RequestContext, id: InvoiceId) -> Result<(), GatewayError>;

    async fn request_document(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<Document, GatewayError>;

    /// Deliver to the customer. The receipt carries the invoice as stored
    /// afterwards, including any status change the delivery caused.
    async fn request_delivery(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<DeliveryReceipt, GatewayError>;
}

#[async_trait]
impl<G> InvoiceGateway for Arc<G>
where
    G: InvoiceGateway + ?Sized,
{
    async fn create_invoice(
        &self,
        ctx: &RequestContext,
        submission: InvoiceSubmission,
    ) -> Result<InvoiceView, GatewayError> {
        (**self).create_invoice(ctx, submission).await
    }

    async fn get_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<InvoiceView, GatewayError> {
        (**self).get_invoice(ctx, id).await
    }

    async fn list_invoices(
        &self,
        ctx: &RequestContext,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceSummary>, GatewayError> {
        (**self).list_invoices(ctx, filter).await
    }

    async fn update_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
        submission: InvoiceSubmission,
        expected: ExpectedVersion,
    ) -> Result<InvoiceView, GatewayError> {
        (**self).update_invoice(ctx, id, submission, expected).await
    }

    async fn set_status(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
        target: InvoiceStatus,
    ) -> Result<InvoiceView, GatewayError> {
        (**self).set_status(ctx, id, target).await
    }

    async fn delete_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<(), GatewayError> {
        (**self).delete_invoice(ctx, id).await
    }

    async fn request_document(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<Document, GatewayError> {
        (**self).request_document(ctx, id).await
    }

    async fn request_delivery(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<DeliveryReceipt, GatewayError> {
        (**self).request_delivery(ctx, id).await
    }
}
