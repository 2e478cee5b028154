//! Storage contracts consumed by the pricing and analytics services.
//!
//! Every lookup by id returns `Ok(None)` when the entity is absent or
//! soft-deleted; `Err` is reserved for storage failures.

use crate::models::{
    CreateCurrencyRate, CreateSubscription, CreateUser, CreateUserSubscription, Currency,
    CurrencyRate, GlobalSettings, NewPaymentLog, PaymentLog, PricingOverride, Subscription,
    UpdateCurrencyRate, UpdateSubscription, UpdateUser, User, UserSubscription,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, input: &CreateUser) -> Result<User, AppError>;
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_tg_id(&self, tg_id: i64) -> Result<Option<User>, AppError>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError>;
    async fn update(&self, user_id: Uuid, input: &UpdateUser) -> Result<Option<User>, AppError>;
    /// Soft delete. Returns false when nothing was deleted.
    async fn delete(&self, user_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, input: &CreateSubscription) -> Result<Subscription, AppError>;
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<Subscription>, AppError>;
    async fn find_by_service_name(&self, name: &str) -> Result<Option<Subscription>, AppError>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Subscription>, AppError>;
    async fn update(
        &self,
        subscription_id: Uuid,
        input: &UpdateSubscription,
    ) -> Result<Option<Subscription>, AppError>;
    async fn delete(&self, subscription_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait UserSubscriptionRepository: Send + Sync {
    async fn create(&self, input: &CreateUserSubscription) -> Result<UserSubscription, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserSubscription>, AppError>;
    async fn find_by_user_and_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<Option<UserSubscription>, AppError>;
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserSubscription>, AppError>;
    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<UserSubscription>, AppError>;
    async fn update_pricing(
        &self,
        id: Uuid,
        pricing: &PricingOverride,
    ) -> Result<Option<UserSubscription>, AppError>;
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CurrencyRateRepository: Send + Sync {
    async fn create(&self, input: &CreateCurrencyRate) -> Result<CurrencyRate, AppError>;
    async fn find_by_id(&self, rate_id: Uuid) -> Result<Option<CurrencyRate>, AppError>;
    /// Newest `fetched_utc` first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<CurrencyRate>, AppError>;
    /// Authoritative rate: greatest `fetched_utc`, then latest insertion.
    async fn latest_by_currency(
        &self,
        currency: Currency,
    ) -> Result<Option<CurrencyRate>, AppError>;
    async fn update(
        &self,
        rate_id: Uuid,
        input: &UpdateCurrencyRate,
    ) -> Result<Option<CurrencyRate>, AppError>;
    async fn delete(&self, rate_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait GlobalSettingsRepository: Send + Sync {
    /// The most recently updated settings row.
    async fn get(&self) -> Result<Option<GlobalSettings>, AppError>;
    async fn create(&self, global_markup_percent: Decimal) -> Result<GlobalSettings, AppError>;
    async fn update(
        &self,
        global_markup_percent: Decimal,
    ) -> Result<Option<GlobalSettings>, AppError>;
}

/// Insert-only payment history. Time ranges are inclusive on both ends.
#[async_trait]
pub trait PaymentLogRepository: Send + Sync {
    async fn create(&self, input: &NewPaymentLog) -> Result<PaymentLog, AppError>;
    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentLog>, AppError>;
    async fn find_by_user(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentLog>, AppError>;
    async fn find_by_subscription(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentLog>, AppError>;
    async fn find_all(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentLog>, AppError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;
}

/// Handles to every repository, shared by handlers and services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub user_subscriptions: Arc<dyn UserSubscriptionRepository>,
    pub rates: Arc<dyn CurrencyRateRepository>,
    pub settings: Arc<dyn GlobalSettingsRepository>,
    pub payments: Arc<dyn PaymentLogRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Repositories {
    /// Use one store for every repository.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + SubscriptionRepository
            + UserSubscriptionRepository
            + CurrencyRateRepository
            + GlobalSettingsRepository
            + PaymentLogRepository
            + HealthCheck
            + 'static,
    {
        Self {
            users: store.clone(),
            subscriptions: store.clone(),
            user_subscriptions: store.clone(),
            rates: store.clone(),
            settings: store.clone(),
            payments: store.clone(),
            health: store,
        }
    }
}
