//! Invoice computation and lifecycle engine.
//!
//! This crate holds the business rules for invoices: line items, totals,
//! validation, the status lifecycle and the persisted record. It is pure,
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod calculation;
pub mod config;
pub mod invoice;
pub mod lifecycle;
pub mod line_item;
pub mod record;
pub mod submission;
pub mod validation;

pub use calculation::{
    AmountOverflow, Billable, Totals, checked_totals, compute_totals, format_money, line_amount,
    line_tax, round_for_display,
};
pub use config::{DueDatePolicy, EngineConfig};
pub use invoice::{Invoice, PersistedRef, Template};
pub use lifecycle::{
    InvoiceStatus, StatusTransition, TransitionAction, TransitionPolicy, available_transitions,
    evaluate,
};
pub use line_item::LineItem;
pub use record::{
    AGGREGATE_TYPE, ChangeStatus, CreateInvoice, DeleteInvoice, InvoiceCommand, InvoiceCreated,
    InvoiceDeleted, InvoiceEvent, InvoiceRecord, InvoiceStatusChanged, InvoiceUpdated,
    InvoiceView, UpdateInvoice,
};
pub use submission::{InvoiceSubmission, SubmittedLineItem};
pub use validation::{DATE_FORMAT, parse_date};
