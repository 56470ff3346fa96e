//! The validated, fully-populated representation handed to persistence.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use invoiceforge_core::{CustomerId, DomainResult, ProductId, ValidationErrors};

use crate::calculation::{Billable, Totals, compute_totals};
use crate::config::DueDatePolicy;
use crate::invoice::Template;
use crate::line_item::LineItem;
use crate::validation;

/// A line item with every numeric field present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedLineItem {
    pub product_id: Option<ProductId>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub tax_rate_percent: Decimal,
}

impl SubmittedLineItem {
    /// Blank fields become zero; validation is expected to have run already.
    pub(crate) fn from_line(item: &LineItem) -> Self {
        Self {
            product_id: item.product_ref,
            description: item.description.trim().to_string(),
            quantity: item.quantity_or_zero(),
            unit_price: item.unit_price_or_zero(),
            tax_rate_percent: item.tax_rate_or_zero(),
        }
    }

    pub fn to_line_item(&self) -> LineItem {
        LineItem {
            product_ref: self.product_id,
            description: self.description.clone(),
            quantity: Some(self.quantity),
            unit_price: Some(self.unit_price),
            tax_rate_percent: Some(self.tax_rate_percent),
        }
    }
}

impl Billable for SubmittedLineItem {
    fn billed_quantity(&self) -> Decimal {
        self.quantity
    }

    fn billed_unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn billed_tax_rate_percent(&self) -> Decimal {
        self.tax_rate_percent
    }
}

/// Header fields and items of an invoice that passed validation.
///
/// Totals are not part of the payload; anyone holding a submission
/// recomputes them with [`InvoiceSubmission::totals`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSubmission {
    pub customer_id: CustomerId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub template: Template,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub items: Vec<SubmittedLineItem>,
}

impl InvoiceSubmission {
    pub fn totals(&self) -> Totals {
        compute_totals(&self.items)
    }

    /// Re-run the content rules, for receivers that cannot trust the sender.
    pub fn check(&self, due_date_policy: DueDatePolicy) -> DomainResult<()> {
        let mut errors = ValidationErrors::new();

        validation::validate_dates(
            Some(self.issue_date),
            Some(self.due_date),
            due_date_policy,
            &mut errors,
        );
        validation::validate_currency(&self.currency, &mut errors);

        let items: Vec<LineItem> = self.items.iter().map(SubmittedLineItem::to_line_item).collect();
        validation::validate_items(&items, &mut errors);

        errors.into_result()
    }
}
