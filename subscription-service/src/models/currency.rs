//! Currency, rate source and money helpers.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency all payments are expressed and stored in.
pub const SETTLEMENT_CURRENCY: Currency = Currency::Rub;

/// Exclusive upper bounds matching the NUMERIC column precision.
pub const MAX_MONEY: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0); // 10^15
pub const MAX_RATE: Decimal = Decimal::from_parts(1_316_134_912, 2_328, 0, false, 0); // 10^13
pub const MAX_PERCENT: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0); // 10^5

/// Supported currencies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "currency_enum", rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Rub,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Rub];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Rub => "RUB",
        }
    }

    /// Whether a subscription may be priced in this currency.
    ///
    /// Catalog prices are USD or EUR only, while rates and payments also allow RUB.
    pub fn is_catalog_currency(&self) -> bool {
        matches!(self, Currency::Usd | Currency::Eur)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "RUB" => Ok(Currency::Rub),
            other => Err(format!("unsupported currency: {}", other)),
        }
    }
}

/// Where a currency rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "rate_source_enum")]
pub enum RateSource {
    /// cifra-bank.ru feed.
    Cifra,
    /// bankffin.kz feed.
    #[serde(rename = "FF")]
    #[sqlx(rename = "FF")]
    Ff,
    /// Entered by an administrator.
    Manual,
}

impl RateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateSource::Cifra => "Cifra",
            RateSource::Ff => "FF",
            RateSource::Manual => "Manual",
        }
    }
}

/// Round a settlement amount to cents, half away from zero.
///
/// The result always carries exactly two decimal places.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Convert a major-unit amount to integer minor units (`round(value * 100)`).
///
/// Saturates at the `i64` bounds instead of failing.
pub fn to_minor_units(value: Decimal) -> i64 {
    let saturated = if value.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    };
    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|scaled| scaled.to_i64())
        .unwrap_or(saturated)
}

/// Convert integer minor units back to an exact 2-dp major amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(12.345)), dec!(12.35));
        assert_eq!(round_money(dec!(12.344)), dec!(12.34));
        assert_eq!(round_money(dec!(-12.345)), dec!(-12.35));
        assert_eq!(round_money(dec!(9000)).to_string(), "9000.00");
    }

    #[test]
    fn minor_units_round_at_cent_boundary() {
        assert_eq!(to_minor_units(dec!(12.345)), 1235);
        assert_eq!(to_minor_units(dec!(12.344)), 1234);
        assert_eq!(to_minor_units(dec!(-8500)), -850_000);
    }

    #[test]
    fn minor_units_saturate_instead_of_failing() {
        assert_eq!(to_minor_units(Decimal::MAX), i64::MAX);
        assert_eq!(to_minor_units(Decimal::MIN), i64::MIN);
    }

    #[test]
    fn from_minor_units_is_exact() {
        assert_eq!(from_minor_units(90_000), dec!(900.00));
        assert_eq!(from_minor_units(-1), dec!(-0.01));
    }

    #[test]
    fn currency_parsing_is_case_insensitive() {
        assert_eq!("usd".parse::<Currency>(), Ok(Currency::Usd));
        assert_eq!("RUB".parse::<Currency>(), Ok(Currency::Rub));
        assert!("GBP".parse::<Currency>().is_err());
    }

    #[test]
    fn only_usd_and_eur_are_catalog_currencies() {
        assert!(Currency::Usd.is_catalog_currency());
        assert!(Currency::Eur.is_catalog_currency());
        assert!(!Currency::Rub.is_catalog_currency());
    }

    #[test]
    fn serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&Currency::Eur).unwrap(), "\"EUR\"");
        assert_eq!(serde_json::to_string(&RateSource::Ff).unwrap(), "\"FF\"");
        let source: RateSource = serde_json::from_str("\"Manual\"").unwrap();
        assert_eq!(source, RateSource::Manual);
    }
}
