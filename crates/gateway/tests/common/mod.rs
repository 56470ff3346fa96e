#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::Notify;

use invoiceforge_catalog::{CatalogProduct, Customer, InMemoryCatalog};
use invoiceforge_core::{
    CustomerId, ExpectedVersion, InvoiceId, ProductId, RequestContext, TenantId, UserId,
};
use invoiceforge_gateway::{
    DeliveryReceipt, Document, GatewayError, InMemoryInvoiceGateway, InvoiceFilter, InvoiceGateway,
    InvoiceService, InvoiceSummary,
};
use invoiceforge_invoicing::{
    EngineConfig, Invoice, InvoiceStatus, InvoiceSubmission, InvoiceView, LineItem,
};

pub type Store = InMemoryInvoiceGateway<Arc<InMemoryCatalog>>;
pub type Service = InvoiceService<Arc<SpyGateway<Arc<Store>>>, Arc<InMemoryCatalog>>;

/// Wraps a gateway to count calls and optionally hold status changes open.
pub struct SpyGateway<G> {
    inner: G,
    calls: AtomicUsize,
    status_gate: Mutex<Option<Arc<Notify>>>,
}

impl<G> SpyGateway<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            status_gate: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Status changes wait until the returned gate is notified.
    pub fn hold_status_changes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.status_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn release_status_changes(&self) {
        *self.status_gate.lock().unwrap() = None;
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<G: InvoiceGateway> InvoiceGateway for SpyGateway<G> {
    async fn create_invoice(
        &self,
        ctx: &RequestContext,
        submission: InvoiceSubmission,
    ) -> Result<InvoiceView, GatewayError> {
        self.record_call();
        self.inner.create_invoice(ctx, submission).await
    }

    async fn get_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<InvoiceView, GatewayError> {
        self.record_call();
        self.inner.get_invoice(ctx, id).await
    }

    async fn list_invoices(
        &self,
        ctx: &RequestContext,
        filter: &InvoiceFilter,
    ) -> Result<Vec<InvoiceSummary>, GatewayError> {
        self.record_call();
        self.inner.list_invoices(ctx, filter).await
    }

    async fn update_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
        submission: InvoiceSubmission,
        expected: ExpectedVersion,
    ) -> Result<InvoiceView, GatewayError> {
        self.record_call();
        self.inner.update_invoice(ctx, id, submission, expected).await
    }

    async fn set_status(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
        target: InvoiceStatus,
    ) -> Result<InvoiceView, GatewayError> {
        self.record_call();
        let gate = self.status_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.inner.set_status(ctx, id, target).await
    }

    async fn delete_invoice(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<(), GatewayError> {
        self.record_call();
        self.inner.delete_invoice(ctx, id).await
    }

    async fn request_document(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<Document, GatewayError> {
        self.record_call();
        self.inner.request_document(ctx, id).await
    }

    async fn request_delivery(
        &self,
        ctx: &RequestContext,
        id: InvoiceId,
    ) -> Result<DeliveryReceipt, GatewayError> {
        self.record_call();
        self.inner.request_delivery(ctx, id).await
    }
}

pub struct Fixture {
    pub ctx: RequestContext,
    pub catalog: Arc<InMemoryCatalog>,
    pub store: Arc<Store>,
    pub spy: Arc<SpyGateway<Arc<Store>>>,
    pub service: Service,
}

pub fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn customer_with_email() -> CustomerId {
    CustomerId::new(1).unwrap()
}

pub fn customer_without_email() -> CustomerId {
    CustomerId::new(2).unwrap()
}

pub fn widget() -> ProductId {
    ProductId::new(10).unwrap()
}

pub fn seed(catalog: &InMemoryCatalog, tenant_id: TenantId) {
    catalog
        .upsert_customer(
            tenant_id,
            Customer::new(customer_with_email(), "Acme Ltd").with_email("billing@acme.test"),
        )
        .unwrap();
    catalog
        .upsert_customer(tenant_id, Customer::new(customer_without_email(), "Walk-in"))
        .unwrap();
    catalog
        .upsert_product(
            tenant_id,
            CatalogProduct::new(widget(), "Widget", dec(25)).with_tax_rate(dec(10)),
        )
        .unwrap();
}

pub fn fixture() -> Fixture {
    fixture_with(EngineConfig::default())
}

pub fn fixture_with(config: EngineConfig) -> Fixture {
    invoiceforge_observability::init();

    let ctx = RequestContext::new(TenantId::new(), UserId::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    seed(&catalog, ctx.tenant_id());

    let store = Arc::new(InMemoryInvoiceGateway::new(catalog.clone(), config.clone()));
    let spy = Arc::new(SpyGateway::new(store.clone()));
    let service = InvoiceService::new(spy.clone(), catalog.clone(), config);

    Fixture {
        ctx,
        catalog,
        store,
        spy,
        service,
    }
}

/// The worked example: [{2, 50, 10%}, {1, 20, 0%}] for the customer with email.
pub fn example_invoice(config: &EngineConfig) -> Invoice {
    let mut invoice = Invoice::new_draft(config, date(2024, 3, 1));
    invoice.set_customer(Some(customer_with_email())).unwrap();
    invoice
        .edit_item(0, |item| *item = LineItem::new("Design", dec(2), dec(50), dec(10)))
        .unwrap();
    invoice
        .add_item(LineItem::new("Hosting", dec(1), dec(20), dec(0)))
        .unwrap();
    invoice
}

/// Save `invoice` and apply the result, returning the persisted id.
pub async fn save(fx: &Fixture, invoice: &mut Invoice) -> InvoiceId {
    let view = fx.service.save(&fx.ctx, invoice).await.unwrap();
    invoice.mark_saved(&view);
    view.id
}
