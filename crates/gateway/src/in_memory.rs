//! In-memory, event-sourced invoice gateway.
//!
//! Every invoice is a stream of [`AuditEntry`]s keyed by tenant and invoice id.
//! Each write follows the same pipeline:
//!
//! ```text
//! load stream -> rehydrate InvoiceRecord -> check expected version
//!   -> handle command -> append events (all or nothing)
//! ```
//!
//! One async mutex guards all streams, so writes to the same invoice are
//! serialized and never interleave. Catalog lookups happen before the lock is
//! taken.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use tokio::sync::Mutex;

use invoiceforge_catalog::{CatalogLookup, Customer};
use invoiceforge_core::{
    Aggregate, AggregateRoot, CustomerId, ExpectedVersion, InvoiceId, RequestContext, TenantId,
};
use invoiceforge_events::EventEnvelope;
use invoiceforge_invoicing::{
    AGGREGATE_TYPE, ChangeStatus, CreateInvoice, DeleteInvoice, EngineConfig, InvoiceCommand,
    InvoiceEvent, InvoiceRecord, InvoiceStatus, InvoiceSubmission, InvoiceView, UpdateInvoice,
    format_money, line_amount,
};

use crate::document::{DeliveryReceipt, Document};
use crate::error::GatewayError;
use crate::gateway::{InvoiceFilter, InvoiceGateway, InvoiceSummary};

/// One committed event in an invoice's audit stream.
pub type AuditEntry = EventEnvelope<InvoiceId, InvoiceEvent>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    invoice_id: InvoiceId,
}

#[derive(Debug, Default)]
struct State {
    streams: HashMap<StreamKey, Vec<AuditEntry>>,
    last_id: i64,
    /// Last issued sequence per tenant and issue year.
    numbering: HashMap<(TenantId, i32), u32>,
    outbox: Vec<DeliveryReceipt>,
}

impl State {
    fn rehydrate(&self, key: StreamKey) -> Result<InvoiceRecord, GatewayError> {
        let stream = self
            .streams
            .get(&key)
            .ok_or(GatewayError::NotFound(key.invoice_id))?;
        Ok(InvoiceRecord::replay(
            key.invoice_id,
            stream.iter().map(|entry| entry.payload()),
        ))
    }

    fn view(&self, key: StreamKey) -> Result<InvoiceView, GatewayError> {
        self.rehydrate(key)?
            .view()
            .ok_or(GatewayError::NotFound(key.invoice_id))
    }

    /// Run `command` against an existing stream and append what it decides.
    fn execute(
        &mut self,
        key: StreamKey,
        command: InvoiceCommand,
        expected: ExpectedVersion,
    ) -> Result<InvoiceRecord, GatewayError> {
        let id = key.invoice_id;
        let mut record = self.rehydrate(key)?;

        expected.check(record.version())?;
        let events = record
            .handle(&command)
            .map_err(|err| GatewayError::from_domain(id, err))?;

        let stream = self
            .streams
            .get_mut(&key)
            .ok_or(GatewayError::NotFound(id))?;
        for event in events {
            let entry =
                AuditEntry::next(key.tenant_id, id, AGGREGATE_TYPE, record.version(), event);
            record.apply(entry.payload());
            stream.push(entry);
        }

        Ok(record)
    }
}

/// In-memory [`InvoiceGateway`], for tests and local development.
///
/// Documents are rendered as JSON; deliveries are recorded in an outbox
/// instead of being sent.
pub struct InMemoryInvoiceGateway<C> {
    catalog: C,
    config: EngineConfig,
    state: Mutex<State>,
    failing_documents: AtomicUsize,
    failing_deliveries: AtomicUsize,
}

impl<C> InMemoryInvoiceGateway<C>
where
    C: CatalogLookup,
{
    pub fn new(catalog: C, config: EngineConfig) -> Self {
        Self {
            catalog,
            config,
            state: Mutex::new(State::default()),
            failing_documents: AtomicUsize::new(0),
            failing_deliveries: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` document requests fail.
    pub fn fail_next_documents(&self, count: usize) {
        self.failing_documents.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` delivery requests fail after the recipient check.
    pub fn fail_next_deliveries(&self, count: usize) {
        self.failing_deliveries.store(count, Ordering::SeqCst);
    }

    /// Audit stream of one invoice, oldest first. Kept after deletion.
    pub async fn history(&self, ctx: &RequestContext, id: InvoiceId) -> Vec<AuditEntry> {
        let state = self.state.lock().await;
        state
            .streams
            .get(&key(ctx, id))
            .cloned()
            .unwrap_or_default()
    }

    /// Every delivery made so far, oldest first.
    pub async fn deliveries(&self) -> Vec<DeliveryReceipt> {
        self.state.lock().await.outbox.clone()
    }

    async fn ensure_customer(
        &self,
        ctx: &RequestContext,
        id: CustomerId,
    ) -> Result<Customer, GatewayError> {
        self.catalog.lookup_customer(ctx, id).await.map_err(|err| {
            tracing::debug!(
                tenant_id = %ctx.tenant_id(),
                customer_id = %id,
                error = %err,
                "customer check failed"
            );
            GatewayError::from(err)
        })
    }

    fn render(
        &self,
        view: &InvoiceView,
        customer: Option<&Customer>,
    ) -> Result<Document, GatewayError> {
        let precision = self.config.display_precision;
        let currency = view.content.currency.as_str();

        let items: Vec<serde_json::Value> = view
            .content
            .items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "description": item.description,
                    "quantity": item.quantity.normalize().to_string(),
                    "unit_price": format_money(item.unit_price, currency, precision),
                    "tax_rate_percent": item.tax_rate_percent.normalize().to_string(),
                    "amount": format_money(line_amount(item), currency, precision),
                })
            })
            .collect();

        let body = serde_json::json!({
            "invoice_number": view.invoice_number,
            "status": view.status,
            "template": view.content.template,
            "customer": customer.map(|c| serde_json::json!({
                "name": c.name,
                "email": c.email,
                "address": c.address,
            })),
            "issue_date": view.content.issue_date,
            "due_date": view.content.due_date,
            "items": items,
            "subtotal": format_money(view.totals.subtotal, currency, precision),
            "tax_total": format_money(view.totals.tax_total, currency, precision),
            "total": format_money(view.totals.total, currency, precision),
            "notes": view.content.notes,
            "terms": view.content.terms,
        });

        let bytes = serde_json::to_vec_pretty(&body)
            .map_err(|err| GatewayError::Document(err.to_string()))?;

        Ok(Document {
            content_type: "application/json".to_string(),
            file_name: format!("invoice_{}.json", view.invoice_number),
            bytes,
        })
    }
}

fn key(ctx: &RequestContext, invoice_id: InvoiceId) -> StreamKey {
    StreamKey {
        tenant_id: ctx.tenant_id(),
        invoice_id,
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl<C> InvoiceGateway for InMemoryInvoiceGateway<C>
where
    C: CatalogLookup,
{
    async fn create_invoice(
        &self,
        ctx: &RequestContext,
        submission: InvoiceSubmission,
    ) -> Result<InvoiceView, GatewayError> {
        self.ensure_customer(ctx, submission.customer_id).await?;

        let tenant_id = ctx.tenant_id();
        let year = submission.issue_date.year();
        let mut state = self.state.lock().await;

        // Number and id are only consumed once the record accepts the create.
        let seq = state.numbering.get(&(tenant_id, year)).copied().unwrap_or(0) + 1;
        let id = InvoiceId::new(state.last_id + 1)?;
        let invoice_number = format!("INV-{year}-{seq:04}");

        let mut record = InvoiceRecord::empty(id);
        let events = record
            .handle(&InvoiceCommand::CreateInvoice(CreateInvoice {
                tenant_id,
                invoice_id: id,
                invoice_number,
                content: submission,
                due_date_policy: self.config.due_date_policy,
                occurred_at: Utc::now(),
            }))
            .map_err(|err| GatewayError::from_domain(id, err))?;

        let mut stream = Vec::with_capacity(events.len());
        for event in events {
            let entry = AuditEntry::next(tenant_id, id, AGGREGATE_TYPE, record.version(), event);
            record.apply(entry.payload());
            stream.push(entry);
        }

        let view = record
            .view()
            .ok_or_else(|| GatewayError::Store("created invoice has no view".to_string()))?;

        state.last_id = id.get();
        state.numbering.insert((tenant_id, year), seq);
        state.streams.insert(key(ctx, id), stream);

        tracing::info!(
            tenant_id = %tenant_id,
            invoice_id = %id,
            invoice_number = %view.invoice_number,
            items = view.content.items.len(),
            "invoice created"
        );
        Ok(view)
    }

    async fn get_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<InvoiceView, GatewayError> {
        self.state.lock().await.view(key(ctx, id))
    }

    async fn list_invoices(
        &self,
        ctx: &RequestContext,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceSummary>, GatewayError> {
        let tenant_id = ctx.tenant_id();
        let mut views: Vec<InvoiceView> = {
            let state = self.state.lock().await;
            state
                .streams
                .keys()
                .filter(|k| k.tenant_id == tenant_id)
                .filter_map(|k| state.view(*k).ok())
                .filter(|view| filter.matches(view))
                .collect()
        };

        views.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut summaries = Vec::new();
        for view in views
            .iter()
            .skip(filter.skip)
            .take(filter.effective_limit())
        {
            let lookup = self
                .catalog
                .lookup_customer(ctx, view.content.customer_id)
                .await;
            let customer_name = match lookup {
                Ok(customer) => Some(customer.name),
                Err(err) => {
                    tracing::debug!(
                        invoice_id = %view.id,
                        error = %err,
                        "listing without customer name"
                    );
                    None
                }
            };
            summaries.push(InvoiceSummary::from_view(view, customer_name));
        }
        Ok(summaries)
    }

    async fn update_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
        submission: InvoiceSubmission,
        expected: ExpectedVersion,
    ) -> Result<InvoiceView, GatewayError> {
        self.ensure_customer(ctx, submission.customer_id).await?;

        let mut state = self.state.lock().await;
        let record = state.execute(
            key(ctx, id),
            InvoiceCommand::UpdateInvoice(UpdateInvoice {
                tenant_id: ctx.tenant_id(),
                invoice_id: id,
                content: submission,
                due_date_policy: self.config.due_date_policy,
                occurred_at: Utc::now(),
            }),
            expected,
        )?;

        tracing::info!(
            tenant_id = %ctx.tenant_id(),
            invoice_id = %id,
            version = record.version(),
            "invoice updated"
        );
        record.view().ok_or(GatewayError::NotFound(id))
    }

    async fn set_status(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
        target: InvoiceStatus,
    ) -> Result<InvoiceView, GatewayError> {
        let mut state = self.state.lock().await;
        let record = state.execute(
            key(ctx, id),
            InvoiceCommand::ChangeStatus(ChangeStatus {
                tenant_id: ctx.tenant_id(),
                invoice_id: id,
                target,
                policy: self.config.transition_policy,
                occurred_at: Utc::now(),
            }),
            ExpectedVersion::Any,
        )?;

        tracing::info!(
            tenant_id = %ctx.tenant_id(),
            invoice_id = %id,
            to = %target,
            "invoice status changed"
        );
        record.view().ok_or(GatewayError::NotFound(id))
    }

    async fn delete_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.execute(
            key(ctx, id),
            InvoiceCommand::DeleteInvoice(DeleteInvoice {
                tenant_id: ctx.tenant_id(),
                invoice_id: id,
                occurred_at: Utc::now(),
            }),
            ExpectedVersion::Any,
        )?;

        tracing::info!(tenant_id = %ctx.tenant_id(), invoice_id = %id, "invoice deleted");
        Ok(())
    }

    async fn request_document(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<Document, GatewayError> {
        let view = self.get_invoice(ctx, id).await?;
        let customer = self
            .catalog
            .lookup_customer(ctx, view.content.customer_id)
            .await
            .ok();

        if take_failure(&self.failing_documents) {
            tracing::warn!(invoice_id = %id, "document renderer unavailable");
            return Err(GatewayError::Document("renderer unavailable".to_string()));
        }
        self.render(&view, customer.as_ref())
    }

    async fn request_delivery(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<DeliveryReceipt, GatewayError> {
        let view = self.get_invoice(ctx, id).await?;
        let customer = self.ensure_customer(ctx, view.content.customer_id).await?;
        let recipient = customer
            .delivery_address()
            .ok_or_else(|| GatewayError::Delivery("customer has no email address".to_string()))?
            .to_string();
        let document = self.render(&view, Some(&customer))?;

        if take_failure(&self.failing_deliveries) {
            tracing::warn!(invoice_id = %id, "mail transport unavailable");
            return Err(GatewayError::Delivery("mail transport unavailable".to_string()));
        }

        let mut state = self.state.lock().await;
        let stream_key = key(ctx, id);
        let current = state.view(stream_key)?;
        let after = if current.status == InvoiceStatus::Draft {
            let record = state.execute(
                stream_key,
                InvoiceCommand::ChangeStatus(ChangeStatus {
                    tenant_id: ctx.tenant_id(),
                    invoice_id: id,
                    target: InvoiceStatus::Sent,
                    policy: self.config.transition_policy,
                    occurred_at: Utc::now(),
                }),
                ExpectedVersion::Exact(current.version),
            )?;
            record.view().ok_or(GatewayError::NotFound(id))?
        } else {
            current
        };

        let receipt = DeliveryReceipt {
            invoice_id: id,
            invoice_number: after.invoice_number.clone(),
            recipient,
            file_name: document.file_name,
            delivered_at: Utc::now(),
            invoice: after,
        };
        state.outbox.push(receipt.clone());

        tracing::info!(
            invoice_id = %id,
            status = %receipt.status_after(),
            version = receipt.invoice.version,
            "invoice delivered"
        );
        Ok(receipt)
    }
}
