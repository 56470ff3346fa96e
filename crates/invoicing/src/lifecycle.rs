//! Invoice status lifecycle.
//!
//! Transitions are explicit operator actions; nothing here moves an invoice on
//! its own (there is no time-based `overdue`).

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use invoiceforge_core::{DomainError, DomainResult};

/// Invoice status. Wire values are lowercase and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Every status, in the order actions are offered to the operator.
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Header fields and line items may change only outside `paid`.
    pub fn allows_content_edits(self) -> bool {
        self != InvoiceStatus::Paid
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(DomainError::validation(
                "status",
                format!("unknown status '{other}' (expected draft|sent|paid|overdue|cancelled)"),
            )),
        }
    }
}

/// Which status changes an operator may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Any status may move to any other status.
    #[default]
    Unrestricted,
    /// draft → {sent, cancelled}; sent → {paid, overdue, cancelled};
    /// overdue → {paid, cancelled}; paid and cancelled are final.
    Directed,
}

impl TransitionPolicy {
    /// Whether `from → to` is allowed. Moving to the current status never is.
    pub fn permits(self, from: InvoiceStatus, to: InvoiceStatus) -> bool {
        use InvoiceStatus::*;

        if from == to {
            return false;
        }
        match self {
            TransitionPolicy::Unrestricted => true,
            TransitionPolicy::Directed => matches!(
                (from, to),
                (Draft, Sent)
                    | (Draft, Cancelled)
                    | (Sent, Paid)
                    | (Sent, Overdue)
                    | (Sent, Cancelled)
                    | (Overdue, Paid)
                    | (Overdue, Cancelled)
            ),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unrestricted" => Ok(TransitionPolicy::Unrestricted),
            "directed" => Ok(TransitionPolicy::Directed),
            other => Err(DomainError::validation(
                "transition_policy",
                format!("unknown transition policy '{other}'"),
            )),
        }
    }
}

/// An accepted status change, not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: InvoiceStatus,
    pub to: InvoiceStatus,
}

impl StatusTransition {
    pub fn enters_paid(&self) -> bool {
        self.to == InvoiceStatus::Paid
    }
}

/// Decide whether `from → to` may be requested under `policy`.
pub fn evaluate(
    policy: TransitionPolicy,
    from: InvoiceStatus,
    to: InvoiceStatus,
) -> DomainResult<StatusTransition> {
    if from == to {
        return Err(DomainError::validation(
            "status",
            format!("invoice is already {to}"),
        ));
    }
    if !policy.permits(from, to) {
        return Err(DomainError::invariant(format!(
            "status transition {from} -> {to} is not permitted"
        )));
    }
    Ok(StatusTransition { from, to })
}

/// One status button offered to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionAction {
    pub target: InvoiceStatus,
    pub enabled: bool,
}

/// Every status with an enabled flag, for rendering the "mark as" actions.
pub fn available_transitions(
    policy: TransitionPolicy,
    current: InvoiceStatus,
) -> Vec<TransitionAction> {
    InvoiceStatus::ALL
        .iter()
        .map(|&target| TransitionAction {
            target,
            enabled: policy.permits(current, target),
        })
        .collect()
}
