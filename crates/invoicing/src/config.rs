//! Engine configuration.
//!
//! Read once at startup (usually from the environment) and passed by reference
//! into validation, lifecycle evaluation and formatting.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use invoiceforge_core::DomainError;

use crate::lifecycle::TransitionPolicy;

/// Largest scale a `rust_decimal::Decimal` can carry.
const MAX_DISPLAY_PRECISION: u32 = 28;

/// How a due date earlier than the issue date is treated on validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DueDatePolicy {
    /// Field-scoped validation error on `due_date`.
    #[default]
    Reject,
    /// Accept, but log a data-quality warning.
    Warn,
    /// Accept silently.
    Allow,
}

impl FromStr for DueDatePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(DueDatePolicy::Reject),
            "warn" => Ok(DueDatePolicy::Warn),
            "allow" => Ok(DueDatePolicy::Allow),
            other => Err(DomainError::validation(
                "due_date_policy",
                format!("unknown due date policy '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub transition_policy: TransitionPolicy,
    pub due_date_policy: DueDatePolicy,
    /// Decimal places used when rounding amounts for display.
    pub display_precision: u32,
    /// ISO-4217 code given to new invoices.
    pub default_currency: String,
    /// Days between issue date and due date on a new invoice.
    pub default_payment_terms_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::default(),
            due_date_policy: DueDatePolicy::default(),
            display_precision: 2,
            default_currency: "USD".to_string(),
            default_payment_terms_days: 30,
        }
    }
}

impl EngineConfig {
    /// Load from `INVOICEFORGE_*` environment variables.
    ///
    /// Unset variables keep their defaults; invalid ones are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (same keys as [`EngineConfig::from_env`]).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("INVOICEFORGE_TRANSITION_POLICY") {
            match raw.parse::<TransitionPolicy>() {
                Ok(policy) => config.transition_policy = policy,
                Err(err) => tracing::warn!(
                    value = %raw,
                    error = %err,
                    "ignoring INVOICEFORGE_TRANSITION_POLICY"
                ),
            }
        }

        if let Some(raw) = lookup("INVOICEFORGE_DUE_DATE_POLICY") {
            match raw.parse::<DueDatePolicy>() {
                Ok(policy) => config.due_date_policy = policy,
                Err(err) => tracing::warn!(
                    value = %raw,
                    error = %err,
                    "ignoring INVOICEFORGE_DUE_DATE_POLICY"
                ),
            }
        }

        if let Some(raw) = lookup("INVOICEFORGE_DISPLAY_PRECISION") {
            match raw.trim().parse::<u32>() {
                Ok(precision) if precision <= MAX_DISPLAY_PRECISION => {
                    config.display_precision = precision
                }
                _ => tracing::warn!(
                    value = %raw,
                    "ignoring INVOICEFORGE_DISPLAY_PRECISION (expected 0..=28)"
                ),
            }
        }

        if let Some(raw) = lookup("INVOICEFORGE_DEFAULT_CURRENCY") {
            let code = raw.trim().to_ascii_uppercase();
            if crate::validation::is_currency_code(&code) {
                config.default_currency = code;
            } else {
                tracing::warn!(
                    value = %raw,
                    "ignoring INVOICEFORGE_DEFAULT_CURRENCY (expected ISO-4217 code)"
                );
            }
        }

        if let Some(raw) = lookup("INVOICEFORGE_PAYMENT_TERMS_DAYS") {
            match raw.trim().parse::<u32>() {
                Ok(days) => config.default_payment_terms_days = days,
                Err(_) => tracing::warn!(value = %raw, "ignoring INVOICEFORGE_PAYMENT_TERMS_DAYS"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = EngineConfig::from_lookup(|_| None);
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.transition_policy, TransitionPolicy::Unrestricted);
        assert_eq!(config.due_date_policy, DueDatePolicy::Reject);
        assert_eq!(config.display_precision, 2);
        assert_eq!(config.default_currency, "USD");
        assert_eq!(config.default_payment_terms_days, 30);
    }

    #[test]
    fn valid_values_override_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("INVOICEFORGE_TRANSITION_POLICY", "Directed"),
            ("INVOICEFORGE_DUE_DATE_POLICY", "warn"),
            ("INVOICEFORGE_DISPLAY_PRECISION", "3"),
            ("INVOICEFORGE_DEFAULT_CURRENCY", "eur"),
            ("INVOICEFORGE_PAYMENT_TERMS_DAYS", "14"),
        ]));

        assert_eq!(config.transition_policy, TransitionPolicy::Directed);
        assert_eq!(config.due_date_policy, DueDatePolicy::Warn);
        assert_eq!(config.display_precision, 3);
        assert_eq!(config.default_currency, "EUR");
        assert_eq!(config.default_payment_terms_days, 14);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("INVOICEFORGE_TRANSITION_POLICY", "strict"),
            ("INVOICEFORGE_DISPLAY_PRECISION", "40"),
            ("INVOICEFORGE_DEFAULT_CURRENCY", "dollars"),
            ("INVOICEFORGE_PAYMENT_TERMS_DAYS", "-1"),
        ]));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn deserializes_partial_documents() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "transition_policy": "directed" }"#).unwrap();
        assert_eq!(config.transition_policy, TransitionPolicy::Directed);
        assert_eq!(config.display_precision, 2);
    }
}
