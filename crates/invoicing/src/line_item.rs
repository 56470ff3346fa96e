//! Line item: one billable row on an invoice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use invoiceforge_catalog::ProductSnapshot;
use invoiceforge_core::{ProductId, ValueObject};

/// A line item as edited on the invoice form.
///
/// Numeric fields are optional because an in-progress edit may leave them
/// blank; calculation treats a blank as zero and validation rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_ref: Option<ProductId>,
    pub description: String,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub tax_rate_percent: Option<Decimal>,
}

impl ValueObject for LineItem {}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        tax_rate_percent: Decimal,
    ) -> Self {
        Self {
            product_ref: None,
            description: description.into(),
            quantity: Some(quantity),
            unit_price: Some(unit_price),
            tax_rate_percent: Some(tax_rate_percent),
        }
    }

    /// The row a fresh form starts with: quantity 1, price 0, no tax.
    pub fn blank() -> Self {
        Self::new("", Decimal::ONE, Decimal::ZERO, Decimal::ZERO)
    }

    /// A new line pre-filled from a catalog snapshot.
    pub fn from_product(product_id: ProductId, snapshot: &ProductSnapshot) -> Self {
        let mut item = Self::blank();
        item.select_product(product_id, snapshot);
        item
    }

    /// Copy description, price and tax rate from the catalog snapshot.
    ///
    /// This is a one-time copy: later catalog changes never reach this line.
    /// Quantity is the operator's and is kept.
    pub fn select_product(&mut self, product_id: ProductId, snapshot: &ProductSnapshot) {
        self.product_ref = Some(product_id);
        self.description = snapshot.description.clone();
        self.unit_price = Some(snapshot.unit_price);
        self.tax_rate_percent = Some(snapshot.tax_rate_percent);
    }

    /// Drop the product link; manually edited values stay as they are.
    pub fn clear_product(&mut self) {
        self.product_ref = None;
    }

    pub fn quantity_or_zero(&self) -> Decimal {
        self.quantity.unwrap_or(Decimal::ZERO)
    }

    pub fn unit_price_or_zero(&self) -> Decimal {
        self.unit_price.unwrap_or(Decimal::ZERO)
    }

    pub fn tax_rate_or_zero(&self) -> Decimal {
        self.tax_rate_percent.unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(description: &str, price: i64, tax: i64) -> ProductSnapshot {
        ProductSnapshot {
            description: description.to_string(),
            unit_price: Decimal::new(price, 0),
            tax_rate_percent: Decimal::new(tax, 0),
        }
    }

    #[test]
    fn blank_line_matches_new_form_row() {
        let item = LineItem::blank();
        assert_eq!(item.quantity, Some(Decimal::ONE));
        assert_eq!(item.unit_price, Some(Decimal::ZERO));
        assert_eq!(item.tax_rate_percent, Some(Decimal::ZERO));
        assert!(item.description.is_empty());
        assert!(item.product_ref.is_none());
    }

    #[test]
    fn selecting_a_product_overwrites_catalog_fields_but_keeps_quantity() {
        let mut item =
            LineItem::new("hand typed", Decimal::new(3, 0), Decimal::new(9, 0), Decimal::ZERO);
        let product_id = ProductId::new(4).unwrap();

        item.select_product(product_id, &snapshot("Widget", 25, 10));

        assert_eq!(item.product_ref, Some(product_id));
        assert_eq!(item.description, "Widget");
        assert_eq!(item.unit_price, Some(Decimal::new(25, 0)));
        assert_eq!(item.tax_rate_percent, Some(Decimal::new(10, 0)));
        assert_eq!(item.quantity, Some(Decimal::new(3, 0)));
    }

    #[test]
    fn reselecting_leaves_no_residue_from_previous_product() {
        let mut item = LineItem::blank();
        item.select_product(ProductId::new(1).unwrap(), &snapshot("First", 100, 20));
        item.select_product(ProductId::new(2).unwrap(), &snapshot("Second", 5, 0));

        let expected =
            LineItem::from_product(ProductId::new(2).unwrap(), &snapshot("Second", 5, 0));
        assert_eq!(item, expected);
    }

    #[test]
    fn clearing_the_product_keeps_manual_edits() {
        let mut item =
            LineItem::from_product(ProductId::new(1).unwrap(), &snapshot("Widget", 10, 5));
        item.unit_price = Some(Decimal::new(8, 0));

        item.clear_product();

        assert!(item.product_ref.is_none());
        assert_eq!(item.description, "Widget");
        assert_eq!(item.unit_price, Some(Decimal::new(8, 0)));
        assert_eq!(item.tax_rate_percent, Some(Decimal::new(5, 0)));
    }

    #[test]
    fn blank_numbers_read_as_zero() {
        let item = LineItem::default();
        assert_eq!(item.quantity_or_zero(), Decimal::ZERO);
        assert_eq!(item.unit_price_or_zero(), Decimal::ZERO);
        assert_eq!(item.tax_rate_or_zero(), Decimal::ZERO);
    }
}
