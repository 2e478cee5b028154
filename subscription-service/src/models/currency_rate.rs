//! Exchange rate model.

use super::{Currency, RateSource};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Rate of one unit of `currency` expressed in the settlement currency.
///
/// Rows are appended; the row with the latest `fetched_utc` is authoritative,
/// ties going to the most recently inserted row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CurrencyRate {
    pub rate_id: Uuid,
    pub currency: Currency,
    pub value: Decimal,
    pub source: RateSource,
    pub fetched_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for recording a rate.
#[derive(Debug, Clone)]
pub struct CreateCurrencyRate {
    pub currency: Currency,
    pub value: Decimal,
    pub source: RateSource,
    pub fetched_utc: DateTime<Utc>,
}

/// Input for correcting a rate.
#[derive(Debug, Clone, Default)]
pub struct UpdateCurrencyRate {
    pub value: Option<Decimal>,
    pub source: Option<RateSource>,
    pub fetched_utc: Option<DateTime<Utc>>,
}

impl UpdateCurrencyRate {
    pub fn apply(&self, rate: &mut CurrencyRate) {
        if let Some(value) = self.value {
            rate.value = value;
        }
        if let Some(source) = self.source {
            rate.source = source;
        }
        if let Some(fetched) = self.fetched_utc {
            rate.fetched_utc = fetched;
        }
    }
}
