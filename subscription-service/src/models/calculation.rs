//! Result of pricing a subscription for a user.

use super::Currency;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Amount owed by one user for one subscription, in the settlement currency.
///
/// `final_amount`, `base_amount` and `profit` are each rounded to two
/// decimal places on their own, so `final_amount - base_amount` may differ
/// from `profit` by one minor unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAmount {
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    /// Final amount in minor units (kopecks).
    pub amount_minor: i64,
    pub final_amount: Decimal,
    pub base_amount: Decimal,
    pub profit: Decimal,
    pub currency: Currency,
    pub exchange_rate: Decimal,
    pub due_date: NaiveDate,
}
