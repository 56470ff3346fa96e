//! Artifacts produced by document and delivery requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invoiceforge_core::InvoiceId;
use invoiceforge_invoicing::{InvoiceStatus, InvoiceView};

/// An opaque rendered invoice. The core never inspects `bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Confirmation that an invoice document was handed to its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub recipient: String,
    pub file_name: String,
    pub delivered_at: DateTime<Utc>,
    /// The invoice as stored after delivery. A delivered draft becomes `sent`
    /// with a new version; apply it with `Invoice::mark_status`.
    pub invoice: InvoiceView,
}

impl DeliveryReceipt {
    pub fn status_after(&self) -> InvoiceStatus {
        self.invoice.status
    }
}
