//! Subscription catalog model.

use super::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A subscribable external service and its base price.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub service_name: String,
    pub icon_url: Option<String>,
    pub base_price: Decimal,
    pub base_currency: Currency,
    pub is_active: bool,
    pub period_days: i32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a subscription.
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub service_name: String,
    pub icon_url: Option<String>,
    pub base_price: Decimal,
    pub base_currency: Currency,
    pub period_days: i32,
}

/// Input for updating a subscription.
#[derive(Debug, Clone, Default)]
pub struct UpdateSubscription {
    pub service_name: Option<String>,
    pub icon_url: Option<String>,
    pub base_price: Option<Decimal>,
    pub base_currency: Option<Currency>,
    pub is_active: Option<bool>,
    pub period_days: Option<i32>,
}

impl UpdateSubscription {
    pub fn apply(&self, subscription: &mut Subscription) {
        if let Some(name) = &self.service_name {
            subscription.service_name = name.clone();
        }
        if let Some(icon_url) = &self.icon_url {
            subscription.icon_url = Some(icon_url.clone());
        }
        if let Some(price) = self.base_price {
            subscription.base_price = price;
        }
        if let Some(currency) = self.base_currency {
            subscription.base_currency = currency;
        }
        if let Some(is_active) = self.is_active {
            subscription.is_active = is_active;
        }
        if let Some(days) = self.period_days {
            subscription.period_days = days;
        }
    }
}
