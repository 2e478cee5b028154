//! Profit report shapes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate profit over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitStats {
    pub total_profit: Decimal,
    pub total_payments: i64,
    pub average_profit: Decimal,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfitStats {
    pub user_id: Uuid,
    pub username: String,
    pub total_profit: Decimal,
    pub payments_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionProfitStats {
    pub subscription_id: Uuid,
    pub service_name: String,
    pub total_profit: Decimal,
    pub payments_count: i64,
}
