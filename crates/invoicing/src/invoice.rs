//! Invoice aggregate as edited by an operator.
//!
//! An [`Invoice`] is owned by a single editing session. Every mutation goes
//! through a method here so the paid-means-read-only rule cannot be bypassed,
//! and totals are always derived from the items currently present.

use core::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use invoiceforge_catalog::ProductSnapshot;
use invoiceforge_core::{
    CustomerId, DomainError, DomainResult, InvoiceId, ProductId, ValidationErrors,
};

use crate::calculation::{Totals, compute_totals};
use crate::config::EngineConfig;
use crate::lifecycle::{self, InvoiceStatus, StatusTransition, TransitionAction, TransitionPolicy};
use crate::line_item::LineItem;
use crate::record::InvoiceView;
use crate::submission::{InvoiceSubmission, SubmittedLineItem};
use crate::validation;

/// Document layout. Has no effect on totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Classic,
    Modern,
    Minimal,
}

impl Template {
    pub fn as_str(self) -> &'static str {
        match self {
            Template::Classic => "classic",
            Template::Modern => "modern",
            Template::Minimal => "minimal",
        }
    }
}

impl core::fmt::Display for Template {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Template {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(Template::Classic),
            "modern" => Ok(Template::Modern),
            "minimal" => Ok(Template::Minimal),
            other => Err(DomainError::validation(
                "template",
                format!("unknown template '{other}' (expected classic|modern|minimal)"),
            )),
        }
    }
}

/// Identity assigned by persistence once the invoice has been created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRef {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub version: u64,
}

/// Aggregate root: Invoice (editing side).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    persisted: Option<PersistedRef>,
    customer_ref: Option<CustomerId>,
    issue_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    currency: String,
    template: Template,
    notes: Option<String>,
    terms: Option<String>,
    items: Vec<LineItem>,
    status: InvoiceStatus,
}

impl Invoice {
    /// An unsaved draft with the given items and no header fields set.
    pub fn new(items: Vec<LineItem>) -> Self {
        Self {
            persisted: None,
            customer_ref: None,
            issue_date: None,
            due_date: None,
            currency: EngineConfig::default().default_currency,
            template: Template::default(),
            notes: None,
            terms: None,
            items,
            status: InvoiceStatus::Draft,
        }
    }

    /// The form a new invoice opens with: dated today, due after the
    /// configured payment terms, one blank line.
    pub fn new_draft(config: &EngineConfig, today: NaiveDate) -> Self {
        let due = today
            .checked_add_days(Days::new(u64::from(config.default_payment_terms_days)))
            .unwrap_or(today);

        let mut invoice = Self::new(vec![LineItem::blank()]);
        invoice.issue_date = Some(today);
        invoice.due_date = Some(due);
        invoice.currency = config.default_currency.clone();
        invoice
    }

    /// Rebuild an editing session from a persisted invoice.
    pub fn from_view(view: &InvoiceView) -> Self {
        let content = &view.content;
        Self {
            persisted: Some(PersistedRef {
                id: view.id,
                invoice_number: view.invoice_number.clone(),
                version: view.version,
            }),
            customer_ref: Some(content.customer_id),
            issue_date: Some(content.issue_date),
            due_date: Some(content.due_date),
            currency: content.currency.clone(),
            template: content.template,
            notes: content.notes.clone(),
            terms: content.terms.clone(),
            items: content.items.iter().map(SubmittedLineItem::to_line_item).collect(),
            status: view.status,
        }
    }

    pub fn persisted(&self) -> Option<&PersistedRef> {
        self.persisted.as_ref()
    }

    pub fn id(&self) -> Option<InvoiceId> {
        self.persisted.as_ref().map(|p| p.id)
    }

    pub fn customer_ref(&self) -> Option<CustomerId> {
        self.customer_ref
    }

    pub fn issue_date(&self) -> Option<NaiveDate> {
        self.issue_date
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn template(&self) -> Template {
        self.template
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn terms(&self) -> Option<&str> {
        self.terms.as_deref()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    /// False once the invoice is paid; only status and document actions remain.
    pub fn is_editable(&self) -> bool {
        self.status.allows_content_edits()
    }

    /// Totals for the items as they are right now.
    pub fn totals(&self) -> Totals {
        compute_totals(&self.items)
    }

    fn ensure_editable(&self) -> DomainResult<()> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(DomainError::read_only(format!(
                "invoice is {}; content can no longer change",
                self.status
            )))
        }
    }

    fn item_mut(&mut self, index: usize) -> DomainResult<&mut LineItem> {
        let len = self.items.len();
        self.items.get_mut(index).ok_or_else(|| {
            DomainError::validation("items", format!("no line item at index {index} (have {len})"))
        })
    }

    pub fn set_customer(&mut self, customer: Option<CustomerId>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.customer_ref = customer;
        Ok(())
    }

    pub fn set_issue_date(&mut self, date: Option<NaiveDate>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.issue_date = date;
        Ok(())
    }

    pub fn set_due_date(&mut self, date: Option<NaiveDate>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.due_date = date;
        Ok(())
    }

    /// Set the issue date from form text (`YYYY-MM-DD`).
    pub fn set_issue_date_text(&mut self, input: &str) -> DomainResult<()> {
        self.ensure_editable()?;
        self.issue_date = Some(validation::parse_date("issue_date", input)?);
        Ok(())
    }

    /// Set the due date from form text (`YYYY-MM-DD`).
    pub fn set_due_date_text(&mut self, input: &str) -> DomainResult<()> {
        self.ensure_editable()?;
        self.due_date = Some(validation::parse_date("due_date", input)?);
        Ok(())
    }

    pub fn set_currency(&mut self, currency: impl Into<String>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.currency = currency.into().trim().to_ascii_uppercase();
        Ok(())
    }

    pub fn set_template(&mut self, template: Template) -> DomainResult<()> {
        self.ensure_editable()?;
        self.template = template;
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.notes = notes;
        Ok(())
    }

    pub fn set_terms(&mut self, terms: Option<String>) -> DomainResult<()> {
        self.ensure_editable()?;
        self.terms = terms;
        Ok(())
    }

    pub fn add_item(&mut self, item: LineItem) -> DomainResult<()> {
        self.ensure_editable()?;
        self.items.push(item);
        Ok(())
    }

    pub fn add_blank_item(&mut self) -> DomainResult<()> {
        self.add_item(LineItem::blank())
    }

    /// Remove the line at `index`. The last remaining line cannot be removed.
    pub fn remove_item(&mut self, index: usize) -> DomainResult<LineItem> {
        self.ensure_editable()?;
        self.item_mut(index)?;
        if self.items.len() == 1 {
            return Err(DomainError::invariant(
                "an invoice must keep at least one line item",
            ));
        }
        Ok(self.items.remove(index))
    }

    /// Apply a manual edit to one line.
    pub fn edit_item<F>(&mut self, index: usize, edit: F) -> DomainResult<()>
    where
        F: FnOnce(&mut LineItem),
    {
        self.ensure_editable()?;
        edit(self.item_mut(index)?);
        Ok(())
    }

    /// Copy a resolved catalog snapshot into the line at `index`.
    pub fn select_product(
        &mut self,
        index: usize,
        product_id: ProductId,
        snapshot: &ProductSnapshot,
    ) -> DomainResult<()> {
        self.ensure_editable()?;
        self.item_mut(index)?.select_product(product_id, snapshot);
        Ok(())
    }

    pub fn clear_product(&mut self, index: usize) -> DomainResult<()> {
        self.ensure_editable()?;
        self.item_mut(index)?.clear_product();
        Ok(())
    }

    /// Check every rule and, if all pass, produce the submission payload.
    ///
    /// All failures are collected; nothing partial is ever returned.
    pub fn validate(&self, config: &EngineConfig) -> DomainResult<InvoiceSubmission> {
        let mut errors = ValidationErrors::new();

        if self.customer_ref.is_none() {
            errors.push("customer_id", "customer is required");
        }
        validation::validate_dates(
            self.issue_date,
            self.due_date,
            config.due_date_policy,
            &mut errors,
        );
        validation::validate_currency(&self.currency, &mut errors);
        validation::validate_items(&self.items, &mut errors);

        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "invoice failed validation");
            return Err(DomainError::Validation(errors));
        }

        let (Some(customer_id), Some(issue_date), Some(due_date)) =
            (self.customer_ref, self.issue_date, self.due_date)
        else {
            return Err(DomainError::invariant("validated invoice is missing header fields"));
        };

        Ok(InvoiceSubmission {
            customer_id,
            issue_date,
            due_date,
            currency: self.currency.clone(),
            template: self.template,
            notes: non_blank(self.notes.as_deref()),
            terms: non_blank(self.terms.as_deref()),
            items: self.items.iter().map(SubmittedLineItem::from_line).collect(),
        })
    }

    /// Validation for a content write: paid invoices are refused first.
    pub fn prepare_submission(&self, config: &EngineConfig) -> DomainResult<InvoiceSubmission> {
        self.ensure_editable()?;
        self.validate(config)
    }

    /// Decide locally whether moving to `target` may be requested.
    pub fn request_status(
        &self,
        target: InvoiceStatus,
        policy: TransitionPolicy,
    ) -> DomainResult<StatusTransition> {
        lifecycle::evaluate(policy, self.status, target)
    }

    pub fn available_transitions(&self, policy: TransitionPolicy) -> Vec<TransitionAction> {
        lifecycle::available_transitions(policy, self.status)
    }

    /// Adopt identity and status from a successful create or update.
    ///
    /// Local content is kept as edited.
    pub fn mark_saved(&mut self, view: &InvoiceView) {
        self.persisted = Some(PersistedRef {
            id: view.id,
            invoice_number: view.invoice_number.clone(),
            version: view.version,
        });
        self.status = view.status;
    }

    /// Adopt the persisted status after a transition was accepted.
    pub fn mark_status(&mut self, view: &InvoiceView) {
        if let Some(persisted) = self.persisted.as_mut() {
            persisted.version = view.version;
        }
        self.status = view.status;
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::config::DueDatePolicy;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn snapshot(description: &str, price: i64, tax: i64) -> ProductSnapshot {
        ProductSnapshot {
            description: description.to_string(),
            unit_price: dec(price),
            tax_rate_percent: dec(tax),
        }
    }

    fn valid_invoice() -> Invoice {
        let mut invoice = Invoice::new(vec![
            LineItem::new("Design", dec(2), dec(50), dec(10)),
            LineItem::new("Hosting", dec(1), dec(20), dec(0)),
        ]);
        invoice.set_customer(Some(CustomerId::new(7).unwrap())).unwrap();
        invoice.set_issue_date(Some(date(2024, 3, 1))).unwrap();
        invoice.set_due_date(Some(date(2024, 3, 31))).unwrap();
        invoice
    }

    fn view_of(invoice: &Invoice, status: InvoiceStatus, version: u64) -> InvoiceView {
        let content = invoice.validate(&EngineConfig::default()).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        InvoiceView {
            id: InvoiceId::new(11).unwrap(),
            invoice_number: "INV-2024-0001".to_string(),
            status,
            version,
            totals: content.totals(),
            content,
            paid_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn paid_invoice() -> Invoice {
        let mut invoice = valid_invoice();
        let view = view_of(&invoice, InvoiceStatus::Paid, 2);
        invoice.mark_saved(&view);
        invoice
    }

    #[test]
    fn worked_example_totals() {
        let totals = valid_invoice().totals();
        assert_eq!(totals.subtotal, dec(120));
        assert_eq!(totals.tax_total, dec(10));
        assert_eq!(totals.total, dec(130));
    }

    #[test]
    fn new_draft_uses_configured_defaults() {
        let config = EngineConfig {
            default_currency: "EUR".to_string(),
            default_payment_terms_days: 14,
            ..EngineConfig::default()
        };
        let invoice = Invoice::new_draft(&config, date(2024, 12, 25));

        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.issue_date(), Some(date(2024, 12, 25)));
        assert_eq!(invoice.due_date(), Some(date(2025, 1, 8)));
        assert_eq!(invoice.currency(), "EUR");
        assert_eq!(invoice.template(), Template::Classic);
        assert_eq!(invoice.items(), &[LineItem::blank()]);
        assert!(invoice.id().is_none());
        assert!(invoice.is_editable());
    }

    #[test]
    fn removing_the_only_item_is_rejected() {
        let mut invoice = Invoice::new(vec![LineItem::blank()]);
        let err = invoice.remove_item(0).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(invoice.items().len(), 1);

        invoice.add_blank_item().unwrap();
        assert!(invoice.remove_item(1).is_ok());
        assert!(invoice.remove_item(5).is_err());
    }

    #[test]
    fn totals_follow_every_item_mutation() {
        let mut invoice = valid_invoice();
        invoice
            .edit_item(1, |item| item.quantity = Some(dec(3)))
            .unwrap();
        assert_eq!(invoice.totals().subtotal, dec(160));

        invoice.remove_item(0).unwrap();
        assert_eq!(invoice.totals().total, dec(60));

        invoice.edit_item(0, |item| item.unit_price = None).unwrap();
        assert_eq!(invoice.totals(), Totals::zero());
    }

    #[test]
    fn selecting_a_product_touches_only_that_line() {
        let mut invoice = valid_invoice();
        let untouched = invoice.items()[1].clone();

        invoice
            .select_product(0, ProductId::new(3).unwrap(), &snapshot("Widget", 30, 20))
            .unwrap();
        invoice
            .select_product(0, ProductId::new(4).unwrap(), &snapshot("Gadget", 5, 0))
            .unwrap();

        let line = &invoice.items()[0];
        assert_eq!(line.description, "Gadget");
        assert_eq!(line.unit_price, Some(dec(5)));
        assert_eq!(line.tax_rate_percent, Some(dec(0)));
        assert_eq!(line.product_ref, Some(ProductId::new(4).unwrap()));
        assert_eq!(invoice.items()[1], untouched);

        invoice.clear_product(0).unwrap();
        assert_eq!(invoice.items()[0].description, "Gadget");
        assert!(invoice.items()[0].product_ref.is_none());
    }

    #[test]
    fn zero_items_fail_validation_on_items_field() {
        let mut invoice = valid_invoice();
        invoice.items.clear();
        let err = invoice.validate(&EngineConfig::default()).unwrap_err();
        assert!(err.field_errors().unwrap().has_field("items"));
    }

    #[test]
    fn validation_collects_all_field_errors() {
        let mut invoice = Invoice::new(vec![LineItem::default()]);
        invoice.set_currency("eu").unwrap();

        let err = invoice.validate(&EngineConfig::default()).unwrap_err();
        let errors = err.field_errors().unwrap();
        for field in [
            "customer_id",
            "issue_date",
            "due_date",
            "currency",
            "items[0].description",
            "items[0].quantity",
            "items[0].unit_price",
        ] {
            assert!(errors.has_field(field), "missing error for {field}");
        }
    }

    #[test]
    fn due_before_issue_depends_on_policy() {
        let mut invoice = valid_invoice();
        invoice.set_due_date_text("2024-02-01").unwrap();

        let err = invoice.validate(&EngineConfig::default()).unwrap_err();
        assert!(err.field_errors().unwrap().has_field("due_date"));

        let lenient = EngineConfig {
            due_date_policy: DueDatePolicy::Warn,
            ..EngineConfig::default()
        };
        assert!(invoice.validate(&lenient).is_ok());
    }

    #[test]
    fn bad_date_text_leaves_previous_value() {
        let mut invoice = valid_invoice();
        let err = invoice.set_issue_date_text("03/01/2024").unwrap_err();
        assert!(err.field_errors().unwrap().has_field("issue_date"));
        assert_eq!(invoice.issue_date(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn submission_trims_text_and_drops_blank_notes() {
        let mut invoice = valid_invoice();
        invoice.set_notes(Some("   ".to_string())).unwrap();
        invoice.set_terms(Some(" Net 30 ".to_string())).unwrap();
        invoice.edit_item(0, |item| item.description = " Design ".to_string()).unwrap();

        let sub = invoice.validate(&EngineConfig::default()).unwrap();
        assert_eq!(sub.notes, None);
        assert_eq!(sub.terms.as_deref(), Some("Net 30"));
        assert_eq!(sub.items[0].description, "Design");
        assert_eq!(sub.totals(), invoice.totals());
    }

    #[test]
    fn paid_invoice_rejects_content_mutations() {
        let mut invoice = paid_invoice();
        let before = invoice.validate(&EngineConfig::default()).unwrap();

        assert!(!invoice.is_editable());
        assert!(matches!(invoice.set_notes(Some("late".into())), Err(DomainError::ReadOnly(_))));
        assert!(matches!(invoice.add_blank_item(), Err(DomainError::ReadOnly(_))));
        assert!(matches!(invoice.set_customer(None), Err(DomainError::ReadOnly(_))));
        assert!(matches!(
            invoice.edit_item(0, |item| item.quantity = Some(dec(99))),
            Err(DomainError::ReadOnly(_))
        ));
        assert!(matches!(
            invoice.prepare_submission(&EngineConfig::default()),
            Err(DomainError::ReadOnly(_))
        ));

        assert_eq!(invoice.validate(&EngineConfig::default()).unwrap(), before);
    }

    #[test]
    fn paid_invoice_still_offers_status_actions() {
        let invoice = paid_invoice();
        let transition = invoice
            .request_status(InvoiceStatus::Sent, TransitionPolicy::Unrestricted)
            .unwrap();
        assert_eq!(transition.from, InvoiceStatus::Paid);

        assert!(
            invoice
                .request_status(InvoiceStatus::Paid, TransitionPolicy::Unrestricted)
                .is_err()
        );

        let actions = invoice.available_transitions(TransitionPolicy::Unrestricted);
        assert_eq!(actions.len(), 5);
        assert!(actions.iter().all(|a| a.enabled == (a.target != InvoiceStatus::Paid)));
    }

    #[test]
    fn mark_status_keeps_identity_and_bumps_version() {
        let mut invoice = valid_invoice();
        invoice.mark_saved(&view_of(&invoice, InvoiceStatus::Draft, 1));
        invoice.mark_status(&view_of(&invoice, InvoiceStatus::Sent, 2));

        assert_eq!(invoice.status(), InvoiceStatus::Sent);
        let persisted = invoice.persisted().unwrap();
        assert_eq!(persisted.version, 2);
        assert_eq!(persisted.invoice_number, "INV-2024-0001");
    }

    #[test]
    fn from_view_round_trips_content() {
        let invoice = valid_invoice();
        let view = view_of(&invoice, InvoiceStatus::Overdue, 4);
        let reopened = Invoice::from_view(&view);

        assert_eq!(reopened.status(), InvoiceStatus::Overdue);
        assert_eq!(reopened.id(), Some(view.id));
        assert_eq!(reopened.items(), invoice.items());
        assert_eq!(reopened.totals(), invoice.totals());
    }

    #[test]
    fn template_parsing_is_closed() {
        assert_eq!("modern".parse::<Template>().unwrap(), Template::Modern);
        assert!("fancy".parse::<Template>().is_err());
    }
}
