//! Persistence boundary and session orchestration for invoices.
//!
//! [`InvoiceGateway`] is the async collaborator that stores invoices and
//! applies status changes atomically. [`InvoiceService`] is what an editing
//! surface calls: it validates locally before any collaborator call, keeps at
//! most one write in flight per invoice and never retries on its own.

pub mod document;
pub mod error;
pub mod gateway;
pub mod in_memory;
pub mod service;

pub use document::{DeliveryReceipt, Document};
pub use error::{GatewayError, ServiceError};
pub use gateway::{InvoiceFilter, InvoiceGateway, InvoiceSummary, MAX_PAGE_SIZE};
pub use in_memory::{AuditEntry, InMemoryInvoiceGateway};
pub use service::InvoiceService;
