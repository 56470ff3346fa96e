//! Validation rules shared by the editing aggregate and the persisted record.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use invoiceforge_core::{DomainError, DomainResult, ValidationErrors};

use crate::calculation::{self, AmountOverflow};
use crate::config::DueDatePolicy;
use crate::line_item::LineItem;

/// Date format accepted from form input.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn item_field(index: usize, field: &str) -> String {
    format!("items[{index}].{field}")
}

/// Parse a `YYYY-MM-DD` date, scoping failures to `field`.
pub fn parse_date(field: &str, input: &str) -> DomainResult<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "date is required"));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| {
        DomainError::validation(field, format!("'{trimmed}' is not a valid date (YYYY-MM-DD)"))
    })
}

pub(crate) fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

pub(crate) fn validate_currency(currency: &str, errors: &mut ValidationErrors) {
    if !is_currency_code(currency) {
        errors.push("currency", "currency must be a three-letter ISO-4217 code");
    }
}

pub(crate) fn validate_dates(
    issue_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    policy: DueDatePolicy,
    errors: &mut ValidationErrors,
) {
    if issue_date.is_none() {
        errors.push("issue_date", "issue date is required");
    }
    if due_date.is_none() {
        errors.push("due_date", "due date is required");
    }

    let (Some(issue), Some(due)) = (issue_date, due_date) else {
        return;
    };
    if due >= issue {
        return;
    }
    match policy {
        DueDatePolicy::Reject => errors.push("due_date", "due date cannot be before issue date"),
        DueDatePolicy::Warn => {
            tracing::warn!(%issue, %due, "due date precedes issue date");
        }
        DueDatePolicy::Allow => {}
    }
}

pub(crate) fn validate_line(index: usize, item: &LineItem, errors: &mut ValidationErrors) {
    if item.description.trim().is_empty() {
        errors.push(item_field(index, "description"), "description is required");
    }

    match item.quantity {
        None => errors.push(item_field(index, "quantity"), "quantity is required"),
        Some(q) if q <= Decimal::ZERO => {
            errors.push(item_field(index, "quantity"), "quantity must be greater than 0")
        }
        Some(_) => {}
    }

    match item.unit_price {
        None => errors.push(item_field(index, "unit_price"), "unit price is required"),
        Some(p) if p < Decimal::ZERO => {
            errors.push(item_field(index, "unit_price"), "unit price must be 0 or greater")
        }
        Some(_) => {}
    }

    if let Some(rate) = item.tax_rate_percent {
        if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
            errors.push(
                item_field(index, "tax_rate_percent"),
                "tax rate must be between 0 and 100",
            );
        }
    }
}

pub(crate) fn validate_items(items: &[LineItem], errors: &mut ValidationErrors) {
    if items.is_empty() {
        errors.push("items", "at least one line item is required");
    }
    for (index, item) in items.iter().enumerate() {
        validate_line(index, item, errors);
    }

    match calculation::checked_totals(items) {
        Ok(_) => {}
        Err(AmountOverflow::Line(index)) => errors.push(
            item_field(index, "quantity"),
            "line amount exceeds the supported range",
        ),
        Err(AmountOverflow::Sum) => errors.push("items", "invoice total exceeds the supported range"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn parse_date_scopes_errors_to_field() {
        assert_eq!(parse_date("issue_date", " 2024-02-29 ").unwrap(), date("2024-02-29"));

        let err = parse_date("due_date", "2023-02-29").unwrap_err();
        assert!(err.field_errors().unwrap().has_field("due_date"));

        let err = parse_date("issue_date", "").unwrap_err();
        assert!(err.field_errors().unwrap().has_field("issue_date"));
    }

    #[test]
    fn line_rules_report_every_offending_field() {
        let mut item =
            LineItem::new(" ", Decimal::ZERO, Decimal::NEGATIVE_ONE, Decimal::new(101, 0));
        item.quantity = Some(Decimal::ZERO);
        let mut errors = ValidationErrors::new();

        validate_line(2, &item, &mut errors);

        assert!(errors.has_field("items[2].description"));
        assert!(errors.has_field("items[2].quantity"));
        assert!(errors.has_field("items[2].unit_price"));
        assert!(errors.has_field("items[2].tax_rate_percent"));
    }

    #[test]
    fn overflowing_totals_are_refused() {
        let mut line = LineItem::new("Bulk", Decimal::ONE, Decimal::TWO, Decimal::TEN);
        line.quantity = Some(Decimal::MAX / Decimal::TWO);
        let mut errors = ValidationErrors::new();
        validate_items(std::slice::from_ref(&line), &mut errors);
        assert!(errors.has_field("items"));

        line.quantity = Some(Decimal::MAX);
        let fine = LineItem::new("Small", Decimal::ONE, Decimal::ONE, Decimal::ZERO);
        let mut errors = ValidationErrors::new();
        validate_items(&[fine, line], &mut errors);
        assert!(errors.has_field("items[1].quantity"));
        assert!(!errors.has_field("items[0].quantity"));
    }

    #[test]
    fn missing_tax_rate_is_accepted() {
        let mut item = LineItem::new("Support", Decimal::ONE, Decimal::ZERO, Decimal::ZERO);
        item.tax_rate_percent = None;
        let mut errors = ValidationErrors::new();
        validate_line(0, &item, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn due_before_issue_follows_policy() {
        let issue = Some(date("2024-05-10"));
        let due = Some(date("2024-05-01"));

        let mut errors = ValidationErrors::new();
        validate_dates(issue, due, DueDatePolicy::Reject, &mut errors);
        assert!(errors.has_field("due_date"));

        for policy in [DueDatePolicy::Warn, DueDatePolicy::Allow] {
            let mut errors = ValidationErrors::new();
            validate_dates(issue, due, policy, &mut errors);
            assert!(errors.is_empty());
        }
    }

    #[test]
    fn currency_must_be_iso_shaped() {
        assert!(is_currency_code("USD"));
        assert!(!is_currency_code("usd"));
        assert!(!is_currency_code("US"));
    }
}
