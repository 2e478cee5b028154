//! Payment calculation.
//!
//! Converts a subscription's base price into the amount a given user owes,
//! in the settlement currency. Markup is applied in tiers: a per-user
//! override when one is set, otherwise the global markup.

use super::metrics::record_calculation;
use super::repository::{
    CurrencyRateRepository, GlobalSettingsRepository, Repositories, SubscriptionRepository,
    UserSubscriptionRepository,
};
use crate::models::{
    round_money, to_minor_units, Currency, PaymentAmount, PricingMode, PricingOverride,
    SETTLEMENT_CURRENCY,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("User {user_id} is not subscribed to {subscription_id}")]
    UserSubscriptionNotFound { user_id: Uuid, subscription_id: Uuid },

    #[error("Subscription {0} not found")]
    SubscriptionNotFound(Uuid),

    #[error("No exchange rate available for {0}")]
    ExchangeRateNotFound(Currency),

    #[error("Price of {base_price} at rate {rate} is out of range")]
    AmountOverflow { base_price: Decimal, rate: Decimal },

    #[error(transparent)]
    Storage(#[from] AppError),
}

impl PricingError {
    pub fn kind(&self) -> &'static str {
        match self {
            PricingError::UserSubscriptionNotFound { .. } => "user_subscription_not_found",
            PricingError::SubscriptionNotFound(_) => "subscription_not_found",
            PricingError::ExchangeRateNotFound(_) => "exchange_rate_not_found",
            PricingError::AmountOverflow { .. } => "amount_overflow",
            PricingError::Storage(_) => "storage",
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::UserSubscriptionNotFound { .. } | PricingError::SubscriptionNotFound(_) => {
                AppError::NotFound(anyhow::anyhow!(err.to_string()))
            }
            PricingError::ExchangeRateNotFound(_) | PricingError::AmountOverflow { .. } => {
                AppError::Unprocessable(anyhow::anyhow!(err.to_string()))
            }
            PricingError::Storage(inner) => inner,
        }
    }
}

/// Rounded outcome of [`resolve_price`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub final_amount: Decimal,
    pub base_amount: Decimal,
    pub profit: Decimal,
    pub amount_minor: i64,
}

fn apply_markup(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    let factor = percent
        .checked_div(Decimal::ONE_HUNDRED)?
        .checked_add(Decimal::ONE)?;
    amount.checked_mul(factor)
}

/// Price a subscription once its rate is known.
///
/// `global_markup` only applies when the override mode is `None`, and only
/// when positive. Profit may be negative and is never clamped. Amounts are
/// rounded independently after all arithmetic is done.
///
/// Amounts beyond `Decimal`'s range are reported as
/// [`PricingError::AmountOverflow`].
pub fn resolve_price(
    base_price: Decimal,
    rate: Decimal,
    pricing: &PricingOverride,
    global_markup: Option<Decimal>,
) -> Result<ResolvedPrice, PricingError> {
    let overflow = || PricingError::AmountOverflow { base_price, rate };

    let base = base_price.checked_mul(rate).ok_or_else(overflow)?;

    let final_amount = match pricing.mode {
        PricingMode::Percent => apply_markup(base, pricing.markup_percent),
        PricingMode::Fixed => Some(pricing.fixed_fee),
        PricingMode::None => match global_markup {
            Some(percent) if percent > Decimal::ZERO => apply_markup(base, percent),
            _ => Some(base),
        },
    }
    .ok_or_else(overflow)?;
    let profit = final_amount.checked_sub(base).ok_or_else(overflow)?;

    Ok(ResolvedPrice {
        final_amount: round_money(final_amount),
        base_amount: round_money(base),
        profit: round_money(profit),
        amount_minor: to_minor_units(final_amount),
    })
}

/// Computes what a user owes for a subscription. Holds no state of its own.
#[derive(Clone)]
pub struct PaymentCalculator {
    user_subscriptions: Arc<dyn UserSubscriptionRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    rates: Arc<dyn CurrencyRateRepository>,
    settings: Arc<dyn GlobalSettingsRepository>,
}

impl PaymentCalculator {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            user_subscriptions: repos.user_subscriptions.clone(),
            subscriptions: repos.subscriptions.clone(),
            rates: repos.rates.clone(),
            settings: repos.settings.clone(),
        }
    }

    #[instrument(skip(self), fields(user_id = %user_id, subscription_id = %subscription_id))]
    pub async fn calculate_payment(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
        due_date: NaiveDate,
    ) -> Result<PaymentAmount, PricingError> {
        let result = self.calculate(user_id, subscription_id, due_date).await;
        match &result {
            Ok(payment) => {
                record_calculation("ok");
                debug!(
                    amount_minor = payment.amount_minor,
                    rate = %payment.exchange_rate,
                    "Payment calculated"
                );
            }
            Err(e) => {
                record_calculation(e.kind());
                warn!(error = %e, "Payment calculation failed");
            }
        }
        result
    }

    async fn calculate(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
        due_date: NaiveDate,
    ) -> Result<PaymentAmount, PricingError> {
        let link = self
            .user_subscriptions
            .find_by_user_and_subscription(user_id, subscription_id)
            .await?
            .ok_or(PricingError::UserSubscriptionNotFound {
                user_id,
                subscription_id,
            })?;

        let subscription = self
            .subscriptions
            .find_by_id(subscription_id)
            .await?
            .ok_or(PricingError::SubscriptionNotFound(subscription_id))?;

        let rate = self.rate_for(subscription.base_currency).await?;

        let pricing = link.pricing();
        let global_markup = match pricing.mode {
            PricingMode::None => self
                .settings
                .get()
                .await?
                .map(|settings| settings.global_markup_percent),
            PricingMode::Percent | PricingMode::Fixed => None,
        };

        let price = resolve_price(subscription.base_price, rate, &pricing, global_markup)?;

        Ok(PaymentAmount {
            user_id,
            subscription_id,
            amount_minor: price.amount_minor,
            final_amount: price.final_amount,
            base_amount: price.base_amount,
            profit: price.profit,
            currency: SETTLEMENT_CURRENCY,
            exchange_rate: rate,
            due_date,
        })
    }

    async fn rate_for(&self, currency: Currency) -> Result<Decimal, PricingError> {
        if currency == SETTLEMENT_CURRENCY {
            return Ok(Decimal::ONE);
        }

        self.rates
            .latest_by_currency(currency)
            .await?
            .map(|rate| rate.value)
            .ok_or(PricingError::ExchangeRateNotFound(currency))
    }
}
