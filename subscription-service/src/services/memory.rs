//! In-memory store used in development without a database, and by tests.

use super::repository::{
    CurrencyRateRepository, GlobalSettingsRepository, HealthCheck, PaymentLogRepository,
    SubscriptionRepository, UserRepository, UserSubscriptionRepository,
};
use crate::models::{
    CreateCurrencyRate, CreateSubscription, CreateUser, CreateUserSubscription, Currency,
    CurrencyRate, GlobalSettings, NewPaymentLog, PaymentLog, PricingOverride, Subscription,
    UpdateCurrencyRate, UpdateSubscription, UpdateUser, User, UserSubscription,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

/// A soft-deletable row. Deleted rows stay in their table and reads skip them.
struct Row<T> {
    value: T,
    deleted_utc: Option<DateTime<Utc>>,
}

impl<T> Row<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            deleted_utc: None,
        }
    }

    fn live(&self) -> Option<&T> {
        self.deleted_utc.is_none().then_some(&self.value)
    }

    fn live_mut(&mut self) -> Option<&mut T> {
        self.deleted_utc.is_none().then_some(&mut self.value)
    }
}

fn live<T>(rows: &[Row<T>]) -> impl Iterator<Item = &T> + '_ {
    rows.iter().filter_map(Row::live)
}

fn live_mut<T>(rows: &mut [Row<T>]) -> impl Iterator<Item = &mut T> + '_ {
    rows.iter_mut().filter_map(Row::live_mut)
}

/// Mark the first live row matching `pred` deleted. False when none is live.
fn soft_delete<T>(rows: &mut [Row<T>], pred: impl Fn(&T) -> bool) -> bool {
    match rows
        .iter_mut()
        .find(|row| row.deleted_utc.is_none() && pred(&row.value))
    {
        Some(row) => {
            row.deleted_utc = Some(Utc::now());
            true
        }
        None => false,
    }
}

/// Rows are kept in insertion order. Users, subscriptions and rates are
/// soft-deleted, like in the database; user subscriptions are removed.
#[derive(Default)]
struct Tables {
    users: Vec<Row<User>>,
    subscriptions: Vec<Row<Subscription>>,
    user_subscriptions: Vec<UserSubscription>,
    rates: Vec<Row<CurrencyRate>>,
    settings: Vec<GlobalSettings>,
    payments: Vec<PaymentLog>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page<T: Clone>(rows: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    rows.skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

fn in_range(at: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    at >= from && at <= to
}

fn conflict(message: String) -> AppError {
    AppError::Conflict(anyhow::anyhow!(message))
}

#[async_trait]
impl HealthCheck for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, input: &CreateUser) -> Result<User, AppError> {
        let mut tables = self.tables.write();
        if live(&tables.users).any(|u| u.tg_id == input.tg_id) {
            return Err(conflict(format!(
                "User with tg_id {} already exists",
                input.tg_id
            )));
        }

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            tg_id: input.tg_id,
            username: input.username.clone(),
            fullname: input.fullname.clone(),
            is_admin: input.is_admin,
            created_utc: now,
            updated_utc: now,
        };
        tables.users.push(Row::new(user.clone()));
        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let tables = self.tables.read();
        let found = live(&tables.users).find(|u| u.user_id == user_id).cloned();
        Ok(found)
    }

    async fn find_by_tg_id(&self, tg_id: i64) -> Result<Option<User>, AppError> {
        let tables = self.tables.read();
        let found = live(&tables.users).find(|u| u.tg_id == tg_id).cloned();
        Ok(found)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read();
        Ok(page(live(&tables.users).cloned(), limit, offset))
    }

    async fn update(&self, user_id: Uuid, input: &UpdateUser) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write();
        let Some(user) = live_mut(&mut tables.users).find(|u| u.user_id == user_id) else {
            return Ok(None);
        };
        input.apply(user);
        user.updated_utc = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write();
        Ok(soft_delete(&mut tables.users, |u| u.user_id == user_id))
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn create(&self, input: &CreateSubscription) -> Result<Subscription, AppError> {
        let mut tables = self.tables.write();
        if live(&tables.subscriptions).any(|s| s.service_name == input.service_name) {
            return Err(conflict(format!(
                "Subscription '{}' already exists",
                input.service_name
            )));
        }

        let now = Utc::now();
        let subscription = Subscription {
            subscription_id: Uuid::new_v4(),
            service_name: input.service_name.clone(),
            icon_url: input.icon_url.clone(),
            base_price: input.base_price,
            base_currency: input.base_currency,
            is_active: true,
            period_days: input.period_days,
            created_utc: now,
            updated_utc: now,
        };
        tables.subscriptions.push(Row::new(subscription.clone()));
        Ok(subscription)
    }

    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let tables = self.tables.read();
        let found = live(&tables.subscriptions)
            .find(|s| s.subscription_id == subscription_id)
            .cloned();
        Ok(found)
    }

    async fn find_by_service_name(&self, name: &str) -> Result<Option<Subscription>, AppError> {
        let tables = self.tables.read();
        let found = live(&tables.subscriptions)
            .find(|s| s.service_name == name)
            .cloned();
        Ok(found)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Subscription>, AppError> {
        let tables = self.tables.read();
        Ok(page(live(&tables.subscriptions).cloned(), limit, offset))
    }

    async fn update(
        &self,
        subscription_id: Uuid,
        input: &UpdateSubscription,
    ) -> Result<Option<Subscription>, AppError> {
        let mut tables = self.tables.write();
        if let Some(name) = &input.service_name {
            if live(&tables.subscriptions)
                .any(|s| &s.service_name == name && s.subscription_id != subscription_id)
            {
                return Err(conflict(format!("Subscription '{}' already exists", name)));
            }
        }

        let Some(subscription) =
            live_mut(&mut tables.subscriptions).find(|s| s.subscription_id == subscription_id)
        else {
            return Ok(None);
        };
        input.apply(subscription);
        subscription.updated_utc = Utc::now();
        Ok(Some(subscription.clone()))
    }

    async fn delete(&self, subscription_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write();
        Ok(soft_delete(&mut tables.subscriptions, |s| {
            s.subscription_id == subscription_id
        }))
    }
}

#[async_trait]
impl UserSubscriptionRepository for InMemoryStore {
    async fn create(&self, input: &CreateUserSubscription) -> Result<UserSubscription, AppError> {
        let mut tables = self.tables.write();
        if tables
            .user_subscriptions
            .iter()
            .any(|us| us.user_id == input.user_id && us.subscription_id == input.subscription_id)
        {
            return Err(conflict(format!(
                "User {} is already subscribed to {}",
                input.user_id, input.subscription_id
            )));
        }

        let now = Utc::now();
        let link = UserSubscription {
            user_subscription_id: Uuid::new_v4(),
            user_id: input.user_id,
            subscription_id: input.subscription_id,
            pricing_mode: input.pricing.mode,
            markup_percent: input.pricing.markup_percent,
            fixed_fee: input.pricing.fixed_fee,
            created_utc: now,
            updated_utc: now,
        };
        tables.user_subscriptions.push(link.clone());
        Ok(link)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserSubscription>, AppError> {
        let tables = self.tables.read();
        Ok(tables
            .user_subscriptions
            .iter()
            .find(|us| us.user_subscription_id == id)
            .cloned())
    }

    async fn find_by_user_and_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<Option<UserSubscription>, AppError> {
        let tables = self.tables.read();
        Ok(tables
            .user_subscriptions
            .iter()
            .find(|us| us.user_id == user_id && us.subscription_id == subscription_id)
            .cloned())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserSubscription>, AppError> {
        let tables = self.tables.read();
        let rows = tables
            .user_subscriptions
            .iter()
            .filter(|us| us.user_id == user_id)
            .cloned();
        Ok(page(rows, limit, offset))
    }

    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<UserSubscription>, AppError> {
        let tables = self.tables.read();
        Ok(tables
            .user_subscriptions
            .iter()
            .filter(|us| us.subscription_id == subscription_id)
            .cloned()
            .collect())
    }

    async fn update_pricing(
        &self,
        id: Uuid,
        pricing: &PricingOverride,
    ) -> Result<Option<UserSubscription>, AppError> {
        let mut tables = self.tables.write();
        let Some(link) = tables
            .user_subscriptions
            .iter_mut()
            .find(|us| us.user_subscription_id == id)
        else {
            return Ok(None);
        };
        link.pricing_mode = pricing.mode;
        link.markup_percent = pricing.markup_percent;
        link.fixed_fee = pricing.fixed_fee;
        link.updated_utc = Utc::now();
        Ok(Some(link.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write();
        let before = tables.user_subscriptions.len();
        tables
            .user_subscriptions
            .retain(|us| us.user_subscription_id != id);
        Ok(tables.user_subscriptions.len() != before)
    }
}

#[async_trait]
impl CurrencyRateRepository for InMemoryStore {
    async fn create(&self, input: &CreateCurrencyRate) -> Result<CurrencyRate, AppError> {
        let now = Utc::now();
        let rate = CurrencyRate {
            rate_id: Uuid::new_v4(),
            currency: input.currency,
            value: input.value,
            source: input.source,
            fetched_utc: input.fetched_utc,
            created_utc: now,
            updated_utc: now,
        };
        self.tables.write().rates.push(Row::new(rate.clone()));
        Ok(rate)
    }

    async fn find_by_id(&self, rate_id: Uuid) -> Result<Option<CurrencyRate>, AppError> {
        let tables = self.tables.read();
        let found = live(&tables.rates).find(|r| r.rate_id == rate_id).cloned();
        Ok(found)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<CurrencyRate>, AppError> {
        let tables = self.tables.read();
        let mut rows: Vec<(usize, &CurrencyRate)> = tables
            .rates
            .iter()
            .enumerate()
            .filter_map(|(seq, row)| row.live().map(|r| (seq, r)))
            .collect();
        rows.sort_by(|(ia, a), (ib, b)| b.fetched_utc.cmp(&a.fetched_utc).then(ib.cmp(ia)));
        Ok(page(rows.into_iter().map(|(_, r)| r.clone()), limit, offset))
    }

    async fn latest_by_currency(
        &self,
        currency: Currency,
    ) -> Result<Option<CurrencyRate>, AppError> {
        let tables = self.tables.read();
        Ok(tables
            .rates
            .iter()
            .enumerate()
            .filter_map(|(seq, row)| row.live().map(|r| (seq, r)))
            .filter(|(_, r)| r.currency == currency)
            .max_by_key(|(seq, r)| (r.fetched_utc, *seq))
            .map(|(_, r)| r.clone()))
    }

    async fn update(
        &self,
        rate_id: Uuid,
        input: &UpdateCurrencyRate,
    ) -> Result<Option<CurrencyRate>, AppError> {
        let mut tables = self.tables.write();
        let Some(rate) = live_mut(&mut tables.rates).find(|r| r.rate_id == rate_id) else {
            return Ok(None);
        };
        input.apply(rate);
        rate.updated_utc = Utc::now();
        Ok(Some(rate.clone()))
    }

    async fn delete(&self, rate_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write();
        Ok(soft_delete(&mut tables.rates, |r| r.rate_id == rate_id))
    }
}

#[async_trait]
impl GlobalSettingsRepository for InMemoryStore {
    async fn get(&self) -> Result<Option<GlobalSettings>, AppError> {
        let tables = self.tables.read();
        Ok(tables
            .settings
            .iter()
            .enumerate()
            .max_by_key(|(seq, s)| (s.updated_utc, *seq))
            .map(|(_, s)| s.clone()))
    }

    async fn create(&self, global_markup_percent: Decimal) -> Result<GlobalSettings, AppError> {
        let now = Utc::now();
        let settings = GlobalSettings {
            settings_id: Uuid::new_v4(),
            global_markup_percent,
            created_utc: now,
            updated_utc: now,
        };
        self.tables.write().settings.push(settings.clone());
        Ok(settings)
    }

    async fn update(
        &self,
        global_markup_percent: Decimal,
    ) -> Result<Option<GlobalSettings>, AppError> {
        let mut tables = self.tables.write();
        let Some(settings) = tables
            .settings
            .iter_mut()
            .enumerate()
            .max_by_key(|(seq, s)| (s.updated_utc, *seq))
            .map(|(_, s)| s)
        else {
            return Ok(None);
        };
        settings.global_markup_percent = global_markup_percent;
        settings.updated_utc = Utc::now();
        Ok(Some(settings.clone()))
    }
}

#[async_trait]
impl PaymentLogRepository for InMemoryStore {
    async fn create(&self, input: &NewPaymentLog) -> Result<PaymentLog, AppError> {
        let payment = PaymentLog {
            payment_id: Uuid::new_v4(),
            user_id: input.user_id,
            subscription_id: input.subscription_id,
            amount: input.amount,
            base_amount: input.base_amount,
            profit_amount: input.profit_amount,
            currency: input.currency,
            rate_used: input.rate_used,
            paid_utc: input.paid_utc,
            created_utc: Utc::now(),
        };
        self.tables.write().payments.push(payment.clone());
        Ok(payment)
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentLog>, AppError> {
        let tables = self.tables.read();
        Ok(tables
            .payments
            .iter()
            .find(|p| p.payment_id == payment_id)
            .cloned())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentLog>, AppError> {
        let tables = self.tables.read();
        Ok(sorted_by_paid(
            tables
                .payments
                .iter()
                .filter(|p| p.user_id == user_id && in_range(p.paid_utc, from, to)),
        ))
    }

    async fn find_by_subscription(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentLog>, AppError> {
        let tables = self.tables.read();
        Ok(sorted_by_paid(tables.payments.iter().filter(|p| {
            p.subscription_id == subscription_id && in_range(p.paid_utc, from, to)
        })))
    }

    async fn find_all(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentLog>, AppError> {
        let tables = self.tables.read();
        Ok(sorted_by_paid(
            tables
                .payments
                .iter()
                .filter(|p| in_range(p.paid_utc, from, to)),
        ))
    }
}

fn sorted_by_paid<'a>(rows: impl Iterator<Item = &'a PaymentLog>) -> Vec<PaymentLog> {
    let mut rows: Vec<PaymentLog> = rows.cloned().collect();
    rows.sort_by_key(|p| p.paid_utc);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RateSource;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn rate(currency: Currency, value: Decimal, fetched_utc: DateTime<Utc>) -> CreateCurrencyRate {
        CreateCurrencyRate {
            currency,
            value,
            source: RateSource::Manual,
            fetched_utc,
        }
    }

    #[tokio::test]
    async fn latest_rate_prefers_newest_fetch() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        CurrencyRateRepository::create(&store, &rate(Currency::Usd, dec!(91), now))
            .await
            .unwrap();
        CurrencyRateRepository::create(
            &store,
            &rate(Currency::Usd, dec!(89), now - Duration::hours(1)),
        )
        .await
        .unwrap();

        let latest = store.latest_by_currency(Currency::Usd).await.unwrap().unwrap();
        assert_eq!(latest.value, dec!(91));
        assert!(store.latest_by_currency(Currency::Eur).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_rate_tie_goes_to_last_inserted() {
        let store = InMemoryStore::new();
        let fetched = Utc::now();
        CurrencyRateRepository::create(&store, &rate(Currency::Eur, dec!(98), fetched))
            .await
            .unwrap();
        CurrencyRateRepository::create(&store, &rate(Currency::Eur, dec!(99), fetched))
            .await
            .unwrap();

        let latest = store.latest_by_currency(Currency::Eur).await.unwrap().unwrap();
        assert_eq!(latest.value, dec!(99));
    }

    #[tokio::test]
    async fn duplicate_tg_id_is_a_conflict() {
        let store = InMemoryStore::new();
        let input = CreateUser {
            tg_id: 42,
            username: "alice".to_string(),
            fullname: "Alice".to_string(),
            is_admin: false,
        };
        UserRepository::create(&store, &input).await.unwrap();
        let err = UserRepository::create(&store, &input).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleted_user_is_not_found() {
        let store = InMemoryStore::new();
        let user = UserRepository::create(
            &store,
            &CreateUser {
                tg_id: 7,
                username: "bob".to_string(),
                fullname: "Bob".to_string(),
                is_admin: false,
            },
        )
        .await
        .unwrap();

        assert!(UserRepository::delete(&store, user.user_id).await.unwrap());
        assert!(UserRepository::find_by_id(&store, user.user_id)
            .await
            .unwrap()
            .is_none());
        assert!(!UserRepository::delete(&store, user.user_id).await.unwrap());
    }

    #[tokio::test]
    async fn deleted_rows_free_their_unique_keys() {
        let store = InMemoryStore::new();
        let input = CreateUser {
            tg_id: 8,
            username: "carol".to_string(),
            fullname: "Carol".to_string(),
            is_admin: false,
        };
        let first = UserRepository::create(&store, &input).await.unwrap();
        assert!(UserRepository::delete(&store, first.user_id).await.unwrap());

        let second = UserRepository::create(&store, &input).await.unwrap();
        assert_ne!(first.user_id, second.user_id);
        let found = store.find_by_tg_id(8).await.unwrap().unwrap();
        assert_eq!(found.user_id, second.user_id);
        assert_eq!(UserRepository::list(&store, 10, 0).await.unwrap().len(), 1);

        let netflix = CreateSubscription {
            service_name: "Netflix".to_string(),
            icon_url: None,
            base_price: dec!(15.49),
            base_currency: Currency::Usd,
            period_days: 30,
        };
        let old = SubscriptionRepository::create(&store, &netflix).await.unwrap();
        assert!(SubscriptionRepository::delete(&store, old.subscription_id)
            .await
            .unwrap());
        assert!(SubscriptionRepository::update(
            &store,
            old.subscription_id,
            &UpdateSubscription::default()
        )
        .await
        .unwrap()
        .is_none());
        SubscriptionRepository::create(&store, &netflix).await.unwrap();
    }

    #[tokio::test]
    async fn deleted_rate_is_not_latest() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        CurrencyRateRepository::create(
            &store,
            &rate(Currency::Usd, dec!(89), now - Duration::hours(1)),
        )
        .await
        .unwrap();
        let newest = CurrencyRateRepository::create(&store, &rate(Currency::Usd, dec!(91), now))
            .await
            .unwrap();

        assert!(CurrencyRateRepository::delete(&store, newest.rate_id)
            .await
            .unwrap());
        assert!(!CurrencyRateRepository::delete(&store, newest.rate_id)
            .await
            .unwrap());

        let latest = store.latest_by_currency(Currency::Usd).await.unwrap().unwrap();
        assert_eq!(latest.value, dec!(89));
        assert_eq!(CurrencyRateRepository::list(&store, 10, 0).await.unwrap().len(), 1);
        assert!(CurrencyRateRepository::find_by_id(&store, newest.rate_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn payment_ranges_are_inclusive() {
        let store = InMemoryStore::new();
        let paid = Utc::now();
        let input = NewPaymentLog {
            user_id: Uuid::new_v4(),
            subscription_id: Uuid::new_v4(),
            amount: 1000,
            base_amount: 900,
            profit_amount: 100,
            currency: Currency::Rub,
            rate_used: dec!(90),
            paid_utc: paid,
        };
        PaymentLogRepository::create(&store, &input).await.unwrap();

        assert_eq!(store.find_all(paid, paid).await.unwrap().len(), 1);
        assert!(store
            .find_all(paid + Duration::seconds(1), paid + Duration::hours(1))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn settings_update_requires_existing_row() {
        let store = InMemoryStore::new();
        assert!(store.get().await.unwrap().is_none());
        assert!(GlobalSettingsRepository::update(&store, dec!(5))
            .await
            .unwrap()
            .is_none());

        GlobalSettingsRepository::create(&store, dec!(5))
            .await
            .unwrap();
        let updated = GlobalSettingsRepository::update(&store, dec!(7.5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.global_markup_percent, dec!(7.5));
        assert_eq!(
            store.get().await.unwrap().unwrap().global_markup_percent,
            dec!(7.5)
        );
    }
}
