use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use invoiceforge_core::{DomainResult, Entity, ProductId, ValidationErrors, ValueObject};

/// Product record as maintained in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub unit: String,
    pub unit_price: Decimal,
    pub tax_rate_percent: Decimal,
}

impl CatalogProduct {
    pub fn new(id: ProductId, name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            sku: None,
            unit: "unit".to_string(),
            unit_price,
            tax_rate_percent: Decimal::ZERO,
        }
    }

    pub fn with_tax_rate(mut self, tax_rate_percent: Decimal) -> Self {
        self.tax_rate_percent = tax_rate_percent;
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    /// The values a line item copies at selection time.
    ///
    /// The line description is the product name; the longer catalog description
    /// stays in the catalog.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            description: self.name.clone(),
            unit_price: self.unit_price,
            tax_rate_percent: self.tax_rate_percent,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.push("name", "name cannot be empty");
        }
        if self.unit_price < Decimal::ZERO {
            errors.push("unit_price", "unit price must be 0 or greater");
        }
        if self.tax_rate_percent < Decimal::ZERO || self.tax_rate_percent > Decimal::ONE_HUNDRED {
            errors.push("tax_rate_percent", "tax rate must be between 0 and 100");
        }
        errors.into_result()
    }
}

impl Entity for CatalogProduct {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Point-in-time copy of the catalog values a line item takes over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub description: String,
    pub unit_price: Decimal,
    pub tax_rate_percent: Decimal,
}

impl ValueObject for ProductSnapshot {}
