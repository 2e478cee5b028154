//! Per-user subscription link and its pricing override.

use chrono::{DateTime, Utc};
use super::currency::{MAX_MONEY, MAX_PERCENT};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// How a user's price is derived from the subscription's base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "pricing_mode_enum", rename_all = "lowercase")]
pub enum PricingMode {
    /// No override; the global markup applies.
    #[default]
    None,
    /// Multiplicative markup on the converted base amount.
    Percent,
    /// Flat fee that replaces the converted base amount.
    Fixed,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::None => "none",
            PricingMode::Percent => "percent",
            PricingMode::Fixed => "fixed",
        }
    }
}

/// Link between a user and a subscription.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSubscription {
    pub user_subscription_id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    pub pricing_mode: PricingMode,
    pub markup_percent: Decimal,
    pub fixed_fee: Decimal,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl UserSubscription {
    pub fn pricing(&self) -> PricingOverride {
        PricingOverride {
            mode: self.pricing_mode,
            markup_percent: self.markup_percent,
            fixed_fee: self.fixed_fee,
        }
    }
}

/// The pricing fields of a [`UserSubscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PricingOverride {
    pub mode: PricingMode,
    pub markup_percent: Decimal,
    pub fixed_fee: Decimal,
}

impl PricingOverride {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn percent(markup_percent: Decimal) -> Self {
        Self {
            mode: PricingMode::Percent,
            markup_percent,
            fixed_fee: Decimal::ZERO,
        }
    }

    pub fn fixed(fixed_fee: Decimal) -> Self {
        Self {
            mode: PricingMode::Fixed,
            markup_percent: Decimal::ZERO,
            fixed_fee,
        }
    }

    /// Apply a partial change.
    ///
    /// Switching modes clears the amounts of the previous mode before the
    /// supplied amounts are applied.
    pub fn merged(
        &self,
        mode: Option<PricingMode>,
        markup_percent: Option<Decimal>,
        fixed_fee: Option<Decimal>,
    ) -> Self {
        let mut next = *self;
        if let Some(mode) = mode.filter(|m| *m != self.mode) {
            next = Self {
                mode,
                ..Self::default()
            };
        }
        if let Some(markup) = markup_percent {
            next.markup_percent = markup;
        }
        if let Some(fee) = fixed_fee {
            next.fixed_fee = fee;
        }
        next
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

impl Validate for PricingOverride {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match self.mode {
            PricingMode::None => {}
            PricingMode::Percent => {
                if self.markup_percent <= Decimal::ZERO {
                    errors.add(
                        "markup_percent",
                        rule("positive", "markup_percent must be > 0 for percent mode"),
                    );
                }
            }
            PricingMode::Fixed => {
                if self.fixed_fee <= Decimal::ZERO {
                    errors.add(
                        "fixed_fee",
                        rule("positive", "fixed_fee must be > 0 for fixed mode"),
                    );
                }
                if !self.markup_percent.is_zero() {
                    errors.add(
                        "markup_percent",
                        rule("zero", "markup_percent must be 0 for fixed mode"),
                    );
                }
            }
        }

        if self.markup_percent >= MAX_PERCENT {
            errors.add(
                "markup_percent",
                rule("range", "markup_percent must be < 10^5"),
            );
        }
        if self.fixed_fee >= MAX_MONEY {
            errors.add("fixed_fee", rule("range", "fixed_fee must be < 10^15"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Input for linking a user to a subscription.
#[derive(Debug, Clone)]
pub struct CreateUserSubscription {
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    pub pricing: PricingOverride,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percent_requires_positive_markup() {
        assert!(PricingOverride::percent(dec!(10)).validate().is_ok());
        let err = PricingOverride::percent(dec!(0)).validate().unwrap_err();
        assert!(err.field_errors().contains_key("markup_percent"));
    }

    #[test]
    fn fixed_requires_positive_fee_and_zero_markup() {
        assert!(PricingOverride::fixed(dec!(500)).validate().is_ok());
        assert!(PricingOverride::fixed(dec!(0)).validate().is_err());

        let mixed = PricingOverride {
            mode: PricingMode::Fixed,
            markup_percent: dec!(5),
            fixed_fee: dec!(500),
        };
        let err = mixed.validate().unwrap_err();
        assert!(err.field_errors().contains_key("markup_percent"));
    }

    #[test]
    fn amounts_are_capped_at_column_precision() {
        let err = PricingOverride::percent(dec!(100000)).validate().unwrap_err();
        assert!(err.field_errors().contains_key("markup_percent"));
        assert!(PricingOverride::percent(dec!(99999.9999)).validate().is_ok());

        let err = PricingOverride::fixed(dec!(1000000000000000))
            .validate()
            .unwrap_err();
        assert!(err.field_errors().contains_key("fixed_fee"));
    }

    #[test]
    fn none_is_always_valid() {
        assert!(PricingOverride::none().validate().is_ok());
    }

    #[test]
    fn switching_mode_resets_previous_amounts() {
        let current = PricingOverride::percent(dec!(10));
        let next = current.merged(Some(PricingMode::Fixed), None, Some(dec!(300)));
        assert_eq!(next, PricingOverride::fixed(dec!(300)));
        assert!(next.validate().is_ok());
    }

    #[test]
    fn same_mode_keeps_unspecified_amounts() {
        let current = PricingOverride::percent(dec!(10));
        let next = current.merged(Some(PricingMode::Percent), None, None);
        assert_eq!(next, current);
    }

    #[test]
    fn pricing_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PricingMode::Percent).unwrap(),
            "\"percent\""
        );
    }
}
