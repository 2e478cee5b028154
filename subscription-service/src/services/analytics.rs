//! Profit reporting over recorded payments.
//!
//! Reports only read the profit frozen on each payment; they never reprice.

use super::metrics::record_analytics_report;
use super::repository::{
    PaymentLogRepository, Repositories, SubscriptionRepository, UserRepository,
};
use crate::models::{
    from_minor_units, round_money, PaymentLog, ProfitStats, SubscriptionProfitStats,
    UserProfitStats,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

pub const ALL_TIME_LABEL: &str = "all-time";

/// Window wide enough to cover every recorded payment.
pub fn all_time_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (DateTime::<Utc>::UNIX_EPOCH, now + Duration::days(36_525))
}

/// First and last instant of a UTC calendar month.
pub fn month_window(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let invalid = || AppError::BadRequest(anyhow::anyhow!("Invalid month: {}-{}", year, month));

    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    let start = start.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc();
    let end = next.and_hms_opt(0, 0, 0).ok_or_else(invalid)?.and_utc() - Duration::microseconds(1);
    Ok((start, end))
}

fn summarize(payments: &[PaymentLog], period: String) -> ProfitStats {
    let total_minor = payments
        .iter()
        .fold(0i64, |acc, p| acc.saturating_add(p.profit_amount));
    let count = payments.len() as i64;
    let total_profit = from_minor_units(total_minor);
    let average_profit = if count == 0 {
        Decimal::ZERO
    } else {
        round_money(total_profit / Decimal::from(count))
    };

    ProfitStats {
        total_profit,
        total_payments: count,
        average_profit,
        period,
    }
}

/// Sum profit (minor units) and count payments per key.
fn group_by<F>(payments: &[PaymentLog], key: F) -> BTreeMap<Uuid, (i64, i64)>
where
    F: Fn(&PaymentLog) -> Uuid,
{
    let mut groups: BTreeMap<Uuid, (i64, i64)> = BTreeMap::new();
    for payment in payments {
        let entry = groups.entry(key(payment)).or_default();
        entry.0 = entry.0.saturating_add(payment.profit_amount);
        entry.1 += 1;
    }
    groups
}

#[derive(Clone)]
pub struct ProfitAnalytics {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    payments: Arc<dyn PaymentLogRepository>,
}

impl ProfitAnalytics {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
            subscriptions: repos.subscriptions.clone(),
            payments: repos.payments.clone(),
        }
    }

    #[instrument(skip(self))]
    pub async fn total_profit(&self) -> Result<ProfitStats, AppError> {
        let (from, to) = all_time_window(Utc::now());
        let payments = self.payments.find_all(from, to).await?;
        record_analytics_report("total");
        Ok(summarize(&payments, ALL_TIME_LABEL.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn monthly_profit(&self, year: i32, month: u32) -> Result<ProfitStats, AppError> {
        let (from, to) = month_window(year, month)?;
        let payments = self.payments.find_all(from, to).await?;
        record_analytics_report("monthly");
        Ok(summarize(&payments, format!("{:04}-{:02}", year, month)))
    }

    #[instrument(skip(self))]
    pub async fn profit_by_user(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UserProfitStats>, AppError> {
        let payments = self.payments.find_all(from, to).await?;

        let mut stats = Vec::new();
        for (user_id, (total, count)) in group_by(&payments, |p| p.user_id) {
            let Some(user) = self.users.find_by_id(user_id).await? else {
                debug!(user_id = %user_id, "Skipping payments of unknown user");
                continue;
            };
            stats.push(UserProfitStats {
                user_id,
                username: user.username,
                total_profit: from_minor_units(total),
                payments_count: count,
            });
        }

        stats.sort_by(|a, b| {
            b.total_profit
                .cmp(&a.total_profit)
                .then(a.user_id.cmp(&b.user_id))
        });
        record_analytics_report("by_user");
        Ok(stats)
    }

    #[instrument(skip(self))]
    pub async fn profit_by_service(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionProfitStats>, AppError> {
        let payments = self.payments.find_all(from, to).await?;

        let mut stats = Vec::new();
        for (subscription_id, (total, count)) in group_by(&payments, |p| p.subscription_id) {
            let Some(subscription) = self.subscriptions.find_by_id(subscription_id).await? else {
                debug!(subscription_id = %subscription_id, "Skipping payments of unknown subscription");
                continue;
            };
            stats.push(SubscriptionProfitStats {
                subscription_id,
                service_name: subscription.service_name,
                total_profit: from_minor_units(total),
                payments_count: count,
            });
        }

        stats.sort_by(|a, b| {
            b.total_profit
                .cmp(&a.total_profit)
                .then(a.subscription_id.cmp(&b.subscription_id))
        });
        record_analytics_report("by_service");
        Ok(stats)
    }
}
