//! Payment history model.

use super::{round_money, to_minor_units, Currency, PaymentAmount, SETTLEMENT_CURRENCY};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A recorded payment. Amounts are minor units of `currency`.
///
/// The profit recorded here is frozen at payment time; reports never
/// recompute it from current prices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentLog {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    pub amount: i64,
    pub base_amount: i64,
    pub profit_amount: i64,
    pub currency: Currency,
    pub rate_used: Decimal,
    pub paid_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

/// Input for inserting a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentLog {
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    pub amount: i64,
    pub base_amount: i64,
    pub profit_amount: i64,
    pub currency: Currency,
    pub rate_used: Decimal,
    pub paid_utc: DateTime<Utc>,
}

impl NewPaymentLog {
    /// Build a payment from a calculation.
    ///
    /// An explicit `amount` replaces the calculated one and the profit
    /// follows it; `rate` only replaces the rate stored for reference.
    pub fn from_calculation(
        calculation: &PaymentAmount,
        paid_utc: DateTime<Utc>,
        amount: Option<i64>,
        rate: Option<Decimal>,
    ) -> Self {
        let amount = amount.unwrap_or(calculation.amount_minor);
        let base_amount = to_minor_units(round_money(calculation.base_amount));

        Self {
            user_id: calculation.user_id,
            subscription_id: calculation.subscription_id,
            amount,
            base_amount,
            profit_amount: amount.saturating_sub(base_amount),
            currency: SETTLEMENT_CURRENCY,
            rate_used: rate.unwrap_or(calculation.exchange_rate),
            paid_utc,
        }
    }
}
