//! Persisted invoice record (event-sourced).
//!
//! This is the aggregate a persistence collaborator keeps per invoice: it
//! decides every write against the current stream state and evolves through
//! [`InvoiceEvent`]s. The editing-side [`crate::Invoice`] never touches it
//! directly; it only sees the [`InvoiceView`] projected from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invoiceforge_core::{Aggregate, AggregateRoot, DomainError, InvoiceId, TenantId};
use invoiceforge_events::Event;

use crate::calculation::Totals;
use crate::config::DueDatePolicy;
use crate::lifecycle::{InvoiceStatus, TransitionPolicy};
use crate::submission::InvoiceSubmission;

/// Stream type name used on event envelopes.
pub const AGGREGATE_TYPE: &str = "invoicing.invoice";

/// Read model of a persisted invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceView {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    /// Stream version; pass back as the expected version on update.
    pub version: u64,
    pub content: InvoiceSubmission,
    pub totals: Totals,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate root: InvoiceRecord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRecord {
    id: InvoiceId,
    tenant_id: Option<TenantId>,
    invoice_number: String,
    status: InvoiceStatus,
    content: Option<InvoiceSubmission>,
    paid_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl InvoiceRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            tenant_id: None,
            invoice_number: String::new(),
            status: InvoiceStatus::Draft,
            content: None,
            paid_at: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    /// Rebuild from a stream of events.
    pub fn replay<'a, I>(id: InvoiceId, events: I) -> Self
    where
        I: IntoIterator<Item = &'a InvoiceEvent>,
    {
        let mut record = Self::empty(id);
        for event in events {
            record.apply(event);
        }
        record
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn content(&self) -> Option<&InvoiceSubmission> {
        self.content.as_ref()
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn is_live(&self) -> bool {
        self.created && !self.deleted
    }

    /// Current read model, or `None` if never created or deleted.
    pub fn view(&self) -> Option<InvoiceView> {
        if !self.is_live() {
            return None;
        }
        let content = self.content.clone()?;
        let created_at = self.created_at?;
        Some(InvoiceView {
            id: self.id,
            invoice_number: self.invoice_number.clone(),
            status: self.status,
            version: self.version,
            totals: content.totals(),
            content,
            paid_at: self.paid_at,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        })
    }
}

impl AggregateRoot for InvoiceRecord {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub content: InvoiceSubmission,
    pub due_date_policy: DueDatePolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInvoice {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub content: InvoiceSubmission,
    pub due_date_policy: DueDatePolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub target: InvoiceStatus,
    pub policy: TransitionPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInvoice {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    UpdateInvoice(UpdateInvoice),
    ChangeStatus(ChangeStatus),
    DeleteInvoice(DeleteInvoice),
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub content: InvoiceSubmission,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceUpdated {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub content: InvoiceSubmission,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceStatusChanged {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub from: InvoiceStatus,
    pub to: InvoiceStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDeleted {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    InvoiceUpdated(InvoiceUpdated),
    InvoiceStatusChanged(InvoiceStatusChanged),
    InvoiceDeleted(InvoiceDeleted),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::InvoiceUpdated(_) => "invoicing.invoice.updated",
            InvoiceEvent::InvoiceStatusChanged(_) => "invoicing.invoice.status_changed",
            InvoiceEvent::InvoiceDeleted(_) => "invoicing.invoice.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::InvoiceUpdated(e) => e.occurred_at,
            InvoiceEvent::InvoiceStatusChanged(e) => e.occurred_at,
            InvoiceEvent::InvoiceDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InvoiceRecord {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.tenant_id = Some(e.tenant_id);
                self.invoice_number = e.invoice_number.clone();
                self.content = Some(e.content.clone());
                self.status = InvoiceStatus::Draft;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            InvoiceEvent::InvoiceUpdated(e) => {
                self.content = Some(e.content.clone());
                self.updated_at = Some(e.occurred_at);
            }
            InvoiceEvent::InvoiceStatusChanged(e) => {
                self.status = e.to;
                // Stamped on each entry into paid; leaving paid keeps the last stamp.
                if e.to == InvoiceStatus::Paid {
                    self.paid_at = Some(e.occurred_at);
                }
                self.updated_at = Some(e.occurred_at);
            }
            InvoiceEvent::InvoiceDeleted(e) => {
                self.deleted = true;
                self.updated_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::UpdateInvoice(cmd) => self.handle_update(cmd),
            InvoiceCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            InvoiceCommand::DeleteInvoice(cmd) => self.handle_delete(cmd),
        }
    }
}

impl InvoiceRecord {
    fn ensure_live(&self, tenant_id: TenantId, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if !self.is_live() {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        if cmd.invoice_number.trim().is_empty() {
            return Err(DomainError::invariant("invoice number must be assigned"));
        }
        cmd.content.check(cmd.due_date_policy)?;

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            invoice_number: cmd.invoice_number.clone(),
            content: cmd.content.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_live(cmd.tenant_id, cmd.invoice_id)?;

        if !self.status.allows_content_edits() {
            return Err(DomainError::read_only("cannot modify paid invoice"));
        }
        cmd.content.check(cmd.due_date_policy)?;

        Ok(vec![InvoiceEvent::InvoiceUpdated(InvoiceUpdated {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            content: cmd.content.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_live(cmd.tenant_id, cmd.invoice_id)?;

        if self.status == cmd.target {
            return Err(DomainError::conflict(format!(
                "invoice is already {}",
                cmd.target
            )));
        }
        if !cmd.policy.permits(self.status, cmd.target) {
            return Err(DomainError::invariant(format!(
                "status transition {} -> {} is not permitted",
                self.status, cmd.target
            )));
        }

        Ok(vec![InvoiceEvent::InvoiceStatusChanged(InvoiceStatusChanged {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            from: self.status,
            to: cmd.target,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_live(cmd.tenant_id, cmd.invoice_id)?;

        Ok(vec![InvoiceEvent::InvoiceDeleted(InvoiceDeleted {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
