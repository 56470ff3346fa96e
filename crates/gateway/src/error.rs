use thiserror::Error;

use invoiceforge_catalog::{LookupError, RecordKind};
use invoiceforge_core::{DomainError, InvoiceId, ValidationErrors};

/// Failure reported by an [`crate::InvoiceGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The submitted content was refused; nothing was committed.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("invoice {0} not found")]
    NotFound(InvoiceId),

    /// A referenced customer could not be resolved.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The write no longer fits the stored state (stale version, same status,
    /// paid invoice, refused transition).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("document generation failed: {0}")]
    Document(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("store failure: {0}")]
    Store(String),
}

impl GatewayError {
    /// Map a decision failure of the invoice record with `id`.
    pub fn from_domain(id: InvoiceId, err: DomainError) -> Self {
        match err {
            DomainError::NotFound => GatewayError::NotFound(id),
            other => GatewayError::from(other),
        }
    }
}

impl From<DomainError> for GatewayError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(errors) => GatewayError::Validation(errors),
            DomainError::InvalidId(msg) => {
                GatewayError::Validation(ValidationErrors::single("id", msg))
            }
            DomainError::Conflict(msg) => GatewayError::Conflict(msg),
            DomainError::ReadOnly(msg) => GatewayError::Conflict(msg),
            DomainError::InvariantViolation(msg) => GatewayError::Conflict(msg),
            DomainError::NotFound => GatewayError::Store("record not found".to_string()),
        }
    }
}

/// The single failure an [`crate::InvoiceService`] action reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Field-scoped validation failure, raised before any collaborator call
    /// when it originates locally.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A referenced record is missing. `field` names the input that stays
    /// unresolved, when there is one.
    #[error("{what} not found")]
    NotFound { field: Option<String>, what: String },

    #[error("conflict: {0}")]
    Conflict(String),

    /// The action is refused by the current state and will not succeed on retry.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("read-only: {0}")]
    ReadOnly(String),

    #[error("a write is already in flight for invoice {0}")]
    WriteInFlight(InvoiceId),

    #[error("document error: {0}")]
    Document(String),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("gateway error: {0}")]
    Gateway(String),
}

impl ServiceError {
    /// Whether repeating the same action later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::Conflict(_)
                | ServiceError::Document(_)
                | ServiceError::Delivery(_)
                | ServiceError::WriteInFlight(_)
        )
    }

    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ServiceError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Lookup failure for a field the operator filled in.
    pub(crate) fn lookup(field: impl Into<String>, err: LookupError) -> Self {
        match err {
            LookupError::NotFound { kind, id } => ServiceError::NotFound {
                field: Some(field.into()),
                what: format!("{kind} {id}"),
            },
            LookupError::Unavailable(msg) => ServiceError::Gateway(msg),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(errors) => ServiceError::Validation(errors),
            DomainError::InvalidId(msg) => {
                ServiceError::Validation(ValidationErrors::single("id", msg))
            }
            DomainError::InvariantViolation(msg) => ServiceError::Rejected(msg),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::ReadOnly(msg) => ServiceError::ReadOnly(msg),
            DomainError::NotFound => ServiceError::NotFound {
                field: None,
                what: "record".to_string(),
            },
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::Validation(errors) => ServiceError::Validation(errors),
            GatewayError::NotFound(id) => ServiceError::NotFound {
                field: None,
                what: format!("invoice {id}"),
            },
            GatewayError::Lookup(err) => {
                // Gateways only resolve customers; products are copied at selection.
                let field = match &err {
                    LookupError::NotFound { kind: RecordKind::Product, .. } => "items",
                    _ => "customer_id",
                };
                ServiceError::lookup(field, err)
            }
            GatewayError::Conflict(msg) => ServiceError::Conflict(msg),
            GatewayError::Document(msg) => ServiceError::Document(msg),
            GatewayError::Delivery(msg) => ServiceError::Delivery(msg),
            GatewayError::Store(msg) => ServiceError::Gateway(msg),
        }
    }
}
