//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// A line item or a catalog snapshot has no identity of its own: two line items
/// with the same product reference, description, quantity, price and rate are
/// the same line. Editing one never touches another, because each is an owned
/// value inside its invoice.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct ProductSnapshot {
///     description: String,
///     unit_price: Decimal,
///     tax_rate_percent: Decimal,
/// }
///
/// impl ValueObject for ProductSnapshot {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
