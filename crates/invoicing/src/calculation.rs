//! Calculation engine: totals derived from line items.
//!
//! Everything here is pure. Totals are recomputed from the items on every read;
//! nothing caches them, so they can never disagree with the items present.
//! Arithmetic keeps full decimal precision; rounding happens only in the
//! display helpers at the bottom of this module.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::line_item::LineItem;

/// Anything that can be billed as one line.
pub trait Billable {
    fn billed_quantity(&self) -> Decimal;
    fn billed_unit_price(&self) -> Decimal;
    fn billed_tax_rate_percent(&self) -> Decimal;
}

impl Billable for LineItem {
    fn billed_quantity(&self) -> Decimal {
        self.quantity_or_zero()
    }

    fn billed_unit_price(&self) -> Decimal {
        self.unit_price_or_zero()
    }

    fn billed_tax_rate_percent(&self) -> Decimal {
        self.tax_rate_or_zero()
    }
}

/// `quantity * unit_price`, blanks counted as zero.
pub fn line_amount<B: Billable + ?Sized>(item: &B) -> Decimal {
    item.billed_quantity().saturating_mul(item.billed_unit_price())
}

/// `line_amount * (tax_rate_percent / 100)`.
pub fn line_tax<B: Billable + ?Sized>(item: &B) -> Decimal {
    line_amount(item).saturating_mul(item.billed_tax_rate_percent() / Decimal::ONE_HUNDRED)
}

/// Invoice totals at full precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
}

impl Totals {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Same totals rounded for display (half-even at `precision` places).
    pub fn rounded(&self, precision: u32) -> Totals {
        Totals {
            subtotal: round_for_display(self.subtotal, precision),
            tax_total: round_for_display(self.tax_total, precision),
            total: round_for_display(self.total, precision),
        }
    }
}

/// Compute subtotal, tax total and total for `items`.
///
/// Item order does not matter. Incomplete items contribute zero for their
/// blank fields rather than failing.
pub fn compute_totals<'a, B, I>(items: I) -> Totals
where
    B: Billable + 'a,
    I: IntoIterator<Item = &'a B>,
{
    let (subtotal, tax_total) = items.into_iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(subtotal, tax_total), item| {
            (
                subtotal.saturating_add(line_amount(item)),
                tax_total.saturating_add(line_tax(item)),
            )
        },
    );

    Totals {
        subtotal,
        tax_total,
        total: subtotal.saturating_add(tax_total),
    }
}

/// Where an exact total could not be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountOverflow {
    /// Amount or tax of the line at this index.
    Line(usize),
    /// A sum across lines.
    Sum,
}

/// [`compute_totals`] without saturation: fails where [`Decimal`] overflows.
///
/// Submissions use this so persisted totals always satisfy
/// `total == subtotal + tax_total`.
pub fn checked_totals<'a, B, I>(items: I) -> Result<Totals, AmountOverflow>
where
    B: Billable + 'a,
    I: IntoIterator<Item = &'a B>,
{
    let mut subtotal = Decimal::ZERO;
    let mut tax_total = Decimal::ZERO;
    for (index, item) in items.into_iter().enumerate() {
        let amount = item
            .billed_quantity()
            .checked_mul(item.billed_unit_price())
            .ok_or(AmountOverflow::Line(index))?;
        let tax = amount
            .checked_mul(item.billed_tax_rate_percent() / Decimal::ONE_HUNDRED)
            .ok_or(AmountOverflow::Line(index))?;
        subtotal = subtotal.checked_add(amount).ok_or(AmountOverflow::Sum)?;
        tax_total = tax_total.checked_add(tax).ok_or(AmountOverflow::Sum)?;
    }
    let total = subtotal.checked_add(tax_total).ok_or(AmountOverflow::Sum)?;

    Ok(Totals {
        subtotal,
        tax_total,
        total,
    })
}

/// Round `amount` half-even to exactly `precision` decimal places.
pub fn round_for_display(amount: Decimal, precision: u32) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(precision);
    rounded
}

/// Render an amount as `CUR 1,234.50`.
pub fn format_money(amount: Decimal, currency: &str, precision: u32) -> String {
    let rounded = round_for_display(amount, precision);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = rounded.abs().to_string();
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(fraction) => format!("{currency} {sign}{grouped}.{fraction}"),
        None => format!("{currency} {sign}{grouped}"),
    }
}
