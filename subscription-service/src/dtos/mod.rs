//! Request and response bodies for the REST API.

use crate::models::{
    CreateCurrencyRate, CreateSubscription, CreateUser, Currency, PricingMode, PricingOverride,
    RateSource, UpdateCurrencyRate, UpdateSubscription, UpdateUser, MAX_MONEY, MAX_PERCENT,
    MAX_RATE,
};
use crate::services::analytics::all_time_window;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(message.into()))
}

// =========================================================================
// Query strings
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationQuery {
    pub const DEFAULT_LIMIT: i64 = 25;
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// RFC 3339 `from` / `to` bounds, both inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct TimeRangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

fn parse_instant(name: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| bad_request(format!("invalid {} date, use RFC 3339", name)))
}

impl TimeRangeQuery {
    /// Missing bounds fall back to the all-time window.
    pub fn or_all_time(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let (default_from, default_to) = all_time_window(Utc::now());
        let from = match &self.from {
            Some(raw) => parse_instant("from", raw)?,
            None => default_from,
        };
        let to = match &self.to {
            Some(raw) => parse_instant("to", raw)?,
            None => default_to,
        };
        Ok((from, to))
    }

    pub fn required(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => Ok((parse_instant("from", from)?, parse_instant("to", to)?)),
            _ => Err(bad_request("from and to query parameters are required")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CalculateQuery {
    pub due_date: Option<String>,
}

impl CalculateQuery {
    /// Defaults to tomorrow (UTC).
    pub fn due_date(&self) -> Result<NaiveDate, AppError> {
        match &self.due_date {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| bad_request("invalid due_date format, use YYYY-MM-DD")),
            None => Ok(Utc::now().date_naive() + chrono::Duration::days(1)),
        }
    }
}

// =========================================================================
// Users
// =========================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(range(min = 1, message = "tg_id must be positive"))]
    pub tg_id: i64,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub fullname: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl From<CreateUserRequest> for CreateUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            tg_id: req.tg_id,
            username: req.username,
            fullname: req.fullname,
            is_admin: req.is_admin,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(max = 255))]
    pub username: Option<String>,
    #[validate(length(max = 255))]
    pub fullname: Option<String>,
    pub is_admin: Option<bool>,
}

impl From<UpdateUserRequest> for UpdateUser {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            username: req.username,
            fullname: req.fullname,
            is_admin: req.is_admin,
        }
    }
}

// =========================================================================
// Subscriptions
// =========================================================================

fn check_base_price(price: Decimal) -> Result<(), AppError> {
    if price < Decimal::ZERO {
        return Err(bad_request("base_price must be >= 0"));
    }
    if price >= MAX_MONEY {
        return Err(bad_request("base_price must be < 10^15"));
    }
    Ok(())
}

fn check_base_currency(currency: Currency) -> Result<(), AppError> {
    if !currency.is_catalog_currency() {
        return Err(bad_request("base_currency must be USD or EUR"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    #[validate(length(min = 1, max = 255, message = "service_name is required"))]
    pub service_name: String,
    pub icon_url: Option<String>,
    pub base_price: Decimal,
    pub base_currency: Currency,
    #[validate(range(min = 1, message = "period_days must be > 0"))]
    pub period_days: i32,
}

impl CreateSubscriptionRequest {
    pub fn into_input(self) -> Result<CreateSubscription, AppError> {
        self.validate()?;
        check_base_price(self.base_price)?;
        check_base_currency(self.base_currency)?;
        Ok(CreateSubscription {
            service_name: self.service_name,
            icon_url: self.icon_url,
            base_price: self.base_price,
            base_currency: self.base_currency,
            period_days: self.period_days,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubscriptionRequest {
    #[validate(length(min = 1, max = 255))]
    pub service_name: Option<String>,
    pub icon_url: Option<String>,
    pub base_price: Option<Decimal>,
    pub base_currency: Option<Currency>,
    pub is_active: Option<bool>,
    #[validate(range(min = 1, message = "period_days must be > 0"))]
    pub period_days: Option<i32>,
}

impl UpdateSubscriptionRequest {
    pub fn into_input(self) -> Result<UpdateSubscription, AppError> {
        self.validate()?;
        if let Some(price) = self.base_price {
            check_base_price(price)?;
        }
        if let Some(currency) = self.base_currency {
            check_base_currency(currency)?;
        }
        Ok(UpdateSubscription {
            service_name: self.service_name,
            icon_url: self.icon_url,
            base_price: self.base_price,
            base_currency: self.base_currency,
            is_active: self.is_active,
            period_days: self.period_days,
        })
    }
}

// =========================================================================
// User subscriptions
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserSubscriptionRequest {
    pub subscription_id: Uuid,
    #[serde(default)]
    pub pricing_mode: PricingMode,
    #[serde(default)]
    pub markup_percent: Decimal,
    #[serde(default)]
    pub fixed_fee: Decimal,
}

impl CreateUserSubscriptionRequest {
    pub fn pricing(&self) -> Result<PricingOverride, AppError> {
        let pricing = PricingOverride {
            mode: self.pricing_mode,
            markup_percent: self.markup_percent,
            fixed_fee: self.fixed_fee,
        };
        pricing.validate()?;
        Ok(pricing)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserSubscriptionRequest {
    pub pricing_mode: Option<PricingMode>,
    pub markup_percent: Option<Decimal>,
    pub fixed_fee: Option<Decimal>,
}

impl UpdateUserSubscriptionRequest {
    /// Merge onto the current override, then validate the result.
    pub fn apply_to(&self, current: PricingOverride) -> Result<PricingOverride, AppError> {
        let next = current.merged(self.pricing_mode, self.markup_percent, self.fixed_fee);
        next.validate()?;
        Ok(next)
    }
}

// =========================================================================
// Currency rates
// =========================================================================

fn check_rate(value: Decimal) -> Result<(), AppError> {
    if value <= Decimal::ZERO {
        return Err(bad_request("rate must be greater than 0"));
    }
    if value >= MAX_RATE {
        return Err(bad_request("rate must be < 10^13"));
    }
    Ok(())
}

fn manual_source() -> RateSource {
    RateSource::Manual
}

#[derive(Debug, Deserialize)]
pub struct CreateCurrencyRateRequest {
    pub currency: Currency,
    pub value: Decimal,
    #[serde(default = "manual_source")]
    pub source: RateSource,
    pub fetched_utc: Option<DateTime<Utc>>,
}

impl CreateCurrencyRateRequest {
    pub fn into_input(self) -> Result<CreateCurrencyRate, AppError> {
        check_rate(self.value)?;
        Ok(CreateCurrencyRate {
            currency: self.currency,
            value: self.value,
            source: self.source,
            fetched_utc: self.fetched_utc.unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCurrencyRateRequest {
    pub value: Option<Decimal>,
    pub source: Option<RateSource>,
    pub fetched_utc: Option<DateTime<Utc>>,
}

impl UpdateCurrencyRateRequest {
    pub fn into_input(self) -> Result<UpdateCurrencyRate, AppError> {
        if let Some(value) = self.value {
            check_rate(value)?;
        }
        Ok(UpdateCurrencyRate {
            value: self.value,
            source: self.source,
            fetched_utc: self.fetched_utc,
        })
    }
}

// =========================================================================
// Settings
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct GlobalSettingsRequest {
    pub global_markup_percent: Decimal,
}

impl GlobalSettingsRequest {
    pub fn markup(&self) -> Result<Decimal, AppError> {
        if self.global_markup_percent < Decimal::ZERO {
            return Err(bad_request("global_markup_percent must be >= 0"));
        }
        if self.global_markup_percent >= MAX_PERCENT {
            return Err(bad_request("global_markup_percent must be < 10^5"));
        }
        Ok(self.global_markup_percent)
    }
}

// =========================================================================
// Payments
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub subscription_id: Uuid,
    /// Defaults to now.
    #[serde(alias = "paid_at")]
    pub paid_utc: Option<DateTime<Utc>>,
    /// Minor units; replaces the calculated amount.
    pub amount: Option<i64>,
    /// Replaces the rate recorded with the payment.
    pub rate_used: Option<Decimal>,
}

impl CreatePaymentRequest {
    pub fn check(&self) -> Result<(), AppError> {
        if matches!(self.amount, Some(amount) if amount <= 0) {
            return Err(bad_request("amount must be greater than 0"));
        }
        if let Some(rate) = self.rate_used {
            check_rate(rate)?;
        }
        Ok(())
    }
}

// =========================================================================
// Admin
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct ManualRateRequest {
    pub currency: String,
    pub rate: Decimal,
}

impl ManualRateRequest {
    pub fn into_input(&self, at: DateTime<Utc>) -> Result<CreateCurrencyRate, AppError> {
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|_| bad_request("supported currencies: USD, EUR, RUB"))?;
        check_rate(self.rate)?;
        Ok(CreateCurrencyRate {
            currency,
            value: self.rate,
            source: RateSource::Manual,
            fetched_utc: at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ManualRateResponse {
    pub message: String,
    pub id: Uuid,
    pub currency: Currency,
    pub rate: Decimal,
    pub source: RateSource,
    pub set_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRatesRequest {
    pub rates: Vec<ManualRateRequest>,
}

#[derive(Debug, Serialize)]
pub struct BulkRateResult {
    pub currency: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkRatesResponse {
    pub message: String,
    pub results: Vec<BulkRateResult>,
    pub processed: usize,
    pub set_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CurrentRate {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<RateSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_hours: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CurrentRatesResponse {
    pub rates: BTreeMap<Currency, CurrentRate>,
    pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pagination_defaults_and_clamps() {
        let query = PaginationQuery::default();
        assert_eq!(query.limit(), 25);
        assert_eq!(query.offset(), 0);

        let query = PaginationQuery {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(query.limit(), 100);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn time_range_requires_both_bounds() {
        let query = TimeRangeQuery {
            from: Some("2024-01-01T00:00:00Z".to_string()),
            to: None,
        };
        assert!(matches!(query.required(), Err(AppError::BadRequest(_))));
        assert!(query.or_all_time().is_ok());

        let query = TimeRangeQuery {
            from: Some("yesterday".to_string()),
            to: Some("2024-01-01T00:00:00Z".to_string()),
        };
        assert!(query.required().is_err());
    }

    #[test]
    fn due_date_defaults_to_tomorrow() {
        let tomorrow = Utc::now().date_naive() + chrono::Duration::days(1);
        assert_eq!(CalculateQuery::default().due_date().unwrap(), tomorrow);

        let query = CalculateQuery {
            due_date: Some("01/02/2024".to_string()),
        };
        assert!(query.due_date().is_err());
    }

    #[test]
    fn rub_is_not_a_catalog_currency() {
        let req = CreateSubscriptionRequest {
            service_name: "Yandex Plus".to_string(),
            icon_url: None,
            base_price: dec!(299),
            base_currency: Currency::Rub,
            period_days: 30,
        };
        assert!(matches!(req.into_input(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn zero_period_fails_validation() {
        let req = CreateSubscriptionRequest {
            service_name: "Netflix".to_string(),
            icon_url: None,
            base_price: dec!(15.49),
            base_currency: Currency::Usd,
            period_days: 0,
        };
        assert!(matches!(req.into_input(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn manual_rate_rejects_unknown_currency_and_non_positive_value() {
        let now = Utc::now();
        let gbp = ManualRateRequest {
            currency: "GBP".to_string(),
            rate: dec!(110),
        };
        assert!(gbp.into_input(now).is_err());

        let zero = ManualRateRequest {
            currency: "usd".to_string(),
            rate: dec!(0),
        };
        assert!(zero.into_input(now).is_err());
    }

    #[test]
    fn limits_match_column_precision() {
        assert_eq!(MAX_MONEY, dec!(1000000000000000));
        assert_eq!(MAX_RATE, dec!(10000000000000));
        assert_eq!(MAX_PERCENT, dec!(100000));
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let req = CreateSubscriptionRequest {
            service_name: "Netflix".to_string(),
            icon_url: None,
            base_price: dec!(10000000000000000000000000),
            base_currency: Currency::Usd,
            period_days: 30,
        };
        assert!(matches!(req.into_input(), Err(AppError::BadRequest(_))));

        let req = CreateSubscriptionRequest {
            service_name: "Netflix".to_string(),
            icon_url: None,
            base_price: dec!(999999999999999.9999),
            base_currency: Currency::Usd,
            period_days: 30,
        };
        assert!(req.into_input().is_ok());

        let rate = ManualRateRequest {
            currency: "USD".to_string(),
            rate: dec!(100000000000000),
        };
        assert!(matches!(rate.into_input(Utc::now()), Err(AppError::BadRequest(_))));

        let settings = GlobalSettingsRequest {
            global_markup_percent: dec!(100000),
        };
        assert!(matches!(settings.markup(), Err(AppError::BadRequest(_))));

        let payment = CreatePaymentRequest {
            subscription_id: Uuid::new_v4(),
            paid_utc: None,
            amount: None,
            rate_used: Some(dec!(10000000000000)),
        };
        assert!(payment.check().is_err());
    }
}
