//! Database service for subscription-service.

use super::metrics::DB_QUERY_DURATION;
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
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Unique violations become conflicts, dangling references bad requests.
fn db_error(context: &str, e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::Conflict(anyhow::anyhow!("{}: {}", context, db.message()));
        }
        if db.is_foreign_key_violation() {
            return AppError::BadRequest(anyhow::anyhow!("{}: {}", context, db.message()));
        }
    }
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "subscription-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }
}

// =========================================================================
// Users
// =========================================================================

#[async_trait]
impl UserRepository for Database {
    #[instrument(skip(self, input), fields(tg_id = input.tg_id))]
    async fn create(&self, input: &CreateUser) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, tg_id, username, fullname, is_admin)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, tg_id, username, fullname, is_admin, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.tg_id)
        .bind(&input.username)
        .bind(&input.fullname)
        .bind(input.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create user", e))?;

        timer.observe_duration();
        info!(user_id = %user.user_id, "User created");

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, tg_id, username, fullname, is_admin, created_utc, updated_utc
            FROM users
            WHERE user_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get user", e))?;

        timer.observe_duration();
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_by_tg_id(&self, tg_id: i64) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user_by_tg_id"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, tg_id, username, fullname, is_admin, created_utc, updated_utc
            FROM users
            WHERE tg_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(tg_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get user by tg_id", e))?;

        timer.observe_duration();
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_users"])
            .start_timer();

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, tg_id, username, fullname, is_admin, created_utc, updated_utc
            FROM users
            WHERE deleted_utc IS NULL
            ORDER BY created_utc, user_id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list users", e))?;

        timer.observe_duration();
        Ok(users)
    }

    #[instrument(skip(self, input))]
    async fn update(&self, user_id: Uuid, input: &UpdateUser) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                fullname = COALESCE($3, fullname),
                is_admin = COALESCE($4, is_admin),
                updated_utc = NOW()
            WHERE user_id = $1 AND deleted_utc IS NULL
            RETURNING user_id, tg_id, username, fullname, is_admin, created_utc, updated_utc
            "#,
        )
        .bind(user_id)
        .bind(&input.username)
        .bind(&input.fullname)
        .bind(input.is_admin)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update user", e))?;

        timer.observe_duration();
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_user"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE users SET deleted_utc = NOW(), updated_utc = NOW()
            WHERE user_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to delete user", e))?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }
}

// =========================================================================
// Subscriptions
// =========================================================================

#[async_trait]
impl SubscriptionRepository for Database {
    #[instrument(skip(self, input), fields(service_name = %input.service_name))]
    async fn create(&self, input: &CreateSubscription) -> Result<Subscription, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (subscription_id, service_name, icon_url, base_price, base_currency, period_days)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING subscription_id, service_name, icon_url, base_price, base_currency, is_active, period_days, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.service_name)
        .bind(&input.icon_url)
        .bind(input.base_price)
        .bind(input.base_currency)
        .bind(input.period_days)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create subscription", e))?;

        timer.observe_duration();
        info!(subscription_id = %subscription.subscription_id, "Subscription created");

        Ok(subscription)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, service_name, icon_url, base_price, base_currency, is_active, period_days, created_utc, updated_utc
            FROM subscriptions
            WHERE subscription_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get subscription", e))?;

        timer.observe_duration();
        Ok(subscription)
    }

    #[instrument(skip(self))]
    async fn find_by_service_name(&self, name: &str) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_subscription_by_name"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, service_name, icon_url, base_price, base_currency, is_active, period_days, created_utc, updated_utc
            FROM subscriptions
            WHERE service_name = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get subscription by name", e))?;

        timer.observe_duration();
        Ok(subscription)
    }

    #[instrument(skip(self))]
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_subscriptions"])
            .start_timer();

        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT subscription_id, service_name, icon_url, base_price, base_currency, is_active, period_days, created_utc, updated_utc
            FROM subscriptions
            WHERE deleted_utc IS NULL
            ORDER BY created_utc, subscription_id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list subscriptions", e))?;

        timer.observe_duration();
        Ok(subscriptions)
    }

    #[instrument(skip(self, input))]
    async fn update(
        &self,
        subscription_id: Uuid,
        input: &UpdateSubscription,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET service_name = COALESCE($2, service_name),
                icon_url = COALESCE($3, icon_url),
                base_price = COALESCE($4, base_price),
                base_currency = COALESCE($5, base_currency),
                is_active = COALESCE($6, is_active),
                period_days = COALESCE($7, period_days),
                updated_utc = NOW()
            WHERE subscription_id = $1 AND deleted_utc IS NULL
            RETURNING subscription_id, service_name, icon_url, base_price, base_currency, is_active, period_days, created_utc, updated_utc
            "#,
        )
        .bind(subscription_id)
        .bind(&input.service_name)
        .bind(&input.icon_url)
        .bind(input.base_price)
        .bind(input.base_currency)
        .bind(input.is_active)
        .bind(input.period_days)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update subscription", e))?;

        timer.observe_duration();
        Ok(subscription)
    }

    #[instrument(skip(self))]
    async fn delete(&self, subscription_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_subscription"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET deleted_utc = NOW(), updated_utc = NOW()
            WHERE subscription_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(subscription_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to delete subscription", e))?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }
}

// =========================================================================
// User subscriptions
// =========================================================================

#[async_trait]
impl UserSubscriptionRepository for Database {
    #[instrument(skip(self, input), fields(user_id = %input.user_id, subscription_id = %input.subscription_id))]
    async fn create(&self, input: &CreateUserSubscription) -> Result<UserSubscription, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user_subscription"])
            .start_timer();

        let link = sqlx::query_as::<_, UserSubscription>(
            r#"
            INSERT INTO user_subscriptions (user_subscription_id, user_id, subscription_id, pricing_mode, markup_percent, fixed_fee)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING user_subscription_id, user_id, subscription_id, pricing_mode, markup_percent, fixed_fee, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.subscription_id)
        .bind(input.pricing.mode)
        .bind(input.pricing.markup_percent)
        .bind(input.pricing.fixed_fee)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create user subscription", e))?;

        timer.observe_duration();
        info!(
            user_subscription_id = %link.user_subscription_id,
            pricing_mode = link.pricing_mode.as_str(),
            "User subscription created"
        );

        Ok(link)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserSubscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user_subscription"])
            .start_timer();

        let link = sqlx::query_as::<_, UserSubscription>(
            r#"
            SELECT user_subscription_id, user_id, subscription_id, pricing_mode, markup_percent, fixed_fee, created_utc, updated_utc
            FROM user_subscriptions
            WHERE user_subscription_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get user subscription", e))?;

        timer.observe_duration();
        Ok(link)
    }

    #[instrument(skip(self))]
    async fn find_by_user_and_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<Option<UserSubscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user_subscription_by_pair"])
            .start_timer();

        let link = sqlx::query_as::<_, UserSubscription>(
            r#"
            SELECT user_subscription_id, user_id, subscription_id, pricing_mode, markup_percent, fixed_fee, created_utc, updated_utc
            FROM user_subscriptions
            WHERE user_id = $1 AND subscription_id = $2
            "#,
        )
        .bind(user_id)
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get user subscription", e))?;

        timer.observe_duration();
        Ok(link)
    }

    #[instrument(skip(self))]
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserSubscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_user_subscriptions"])
            .start_timer();

        let links = sqlx::query_as::<_, UserSubscription>(
            r#"
            SELECT user_subscription_id, user_id, subscription_id, pricing_mode, markup_percent, fixed_fee, created_utc, updated_utc
            FROM user_subscriptions
            WHERE user_id = $1
            ORDER BY created_utc, user_subscription_id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list user subscriptions", e))?;

        timer.observe_duration();
        Ok(links)
    }

    #[instrument(skip(self))]
    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<UserSubscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_subscription_users"])
            .start_timer();

        let links = sqlx::query_as::<_, UserSubscription>(
            r#"
            SELECT user_subscription_id, user_id, subscription_id, pricing_mode, markup_percent, fixed_fee, created_utc, updated_utc
            FROM user_subscriptions
            WHERE subscription_id = $1
            ORDER BY created_utc, user_subscription_id
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list subscription users", e))?;

        timer.observe_duration();
        Ok(links)
    }

    #[instrument(skip(self, pricing), fields(pricing_mode = pricing.mode.as_str()))]
    async fn update_pricing(
        &self,
        id: Uuid,
        pricing: &PricingOverride,
    ) -> Result<Option<UserSubscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_user_subscription"])
            .start_timer();

        let link = sqlx::query_as::<_, UserSubscription>(
            r#"
            UPDATE user_subscriptions
            SET pricing_mode = $2, markup_percent = $3, fixed_fee = $4, updated_utc = NOW()
            WHERE user_subscription_id = $1
            RETURNING user_subscription_id, user_id, subscription_id, pricing_mode, markup_percent, fixed_fee, created_utc, updated_utc
            "#,
        )
        .bind(id)
        .bind(pricing.mode)
        .bind(pricing.markup_percent)
        .bind(pricing.fixed_fee)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update user subscription", e))?;

        timer.observe_duration();
        Ok(link)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_user_subscription"])
            .start_timer();

        let result = sqlx::query("DELETE FROM user_subscriptions WHERE user_subscription_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete user subscription", e))?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }
}

// =========================================================================
// Currency rates
// =========================================================================

#[async_trait]
impl CurrencyRateRepository for Database {
    #[instrument(skip(self, input), fields(currency = %input.currency, source = input.source.as_str()))]
    async fn create(&self, input: &CreateCurrencyRate) -> Result<CurrencyRate, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_rate"])
            .start_timer();

        let rate = sqlx::query_as::<_, CurrencyRate>(
            r#"
            INSERT INTO currency_rates (rate_id, currency, value, source, fetched_utc)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING rate_id, currency, value, source, fetched_utc, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.currency)
        .bind(input.value)
        .bind(input.source)
        .bind(input.fetched_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create rate", e))?;

        timer.observe_duration();
        info!(rate_id = %rate.rate_id, value = %rate.value, "Currency rate recorded");

        Ok(rate)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, rate_id: Uuid) -> Result<Option<CurrencyRate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_rate"])
            .start_timer();

        let rate = sqlx::query_as::<_, CurrencyRate>(
            r#"
            SELECT rate_id, currency, value, source, fetched_utc, created_utc, updated_utc
            FROM currency_rates
            WHERE rate_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(rate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get rate", e))?;

        timer.observe_duration();
        Ok(rate)
    }

    #[instrument(skip(self))]
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<CurrencyRate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_rates"])
            .start_timer();

        let rates = sqlx::query_as::<_, CurrencyRate>(
            r#"
            SELECT rate_id, currency, value, source, fetched_utc, created_utc, updated_utc
            FROM currency_rates
            WHERE deleted_utc IS NULL
            ORDER BY fetched_utc DESC, seq DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list rates", e))?;

        timer.observe_duration();
        Ok(rates)
    }

    #[instrument(skip(self))]
    async fn latest_by_currency(
        &self,
        currency: Currency,
    ) -> Result<Option<CurrencyRate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["latest_rate"])
            .start_timer();

        let rate = sqlx::query_as::<_, CurrencyRate>(
            r#"
            SELECT rate_id, currency, value, source, fetched_utc, created_utc, updated_utc
            FROM currency_rates
            WHERE currency = $1 AND deleted_utc IS NULL
            ORDER BY fetched_utc DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(currency)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get latest rate", e))?;

        timer.observe_duration();
        Ok(rate)
    }

    #[instrument(skip(self, input))]
    async fn update(
        &self,
        rate_id: Uuid,
        input: &UpdateCurrencyRate,
    ) -> Result<Option<CurrencyRate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_rate"])
            .start_timer();

        let rate = sqlx::query_as::<_, CurrencyRate>(
            r#"
            UPDATE currency_rates
            SET value = COALESCE($2, value),
                source = COALESCE($3, source),
                fetched_utc = COALESCE($4, fetched_utc),
                updated_utc = NOW()
            WHERE rate_id = $1 AND deleted_utc IS NULL
            RETURNING rate_id, currency, value, source, fetched_utc, created_utc, updated_utc
            "#,
        )
        .bind(rate_id)
        .bind(input.value)
        .bind(input.source)
        .bind(input.fetched_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update rate", e))?;

        timer.observe_duration();
        Ok(rate)
    }

    #[instrument(skip(self))]
    async fn delete(&self, rate_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_rate"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE currency_rates SET deleted_utc = NOW(), updated_utc = NOW()
            WHERE rate_id = $1 AND deleted_utc IS NULL
            "#,
        )
        .bind(rate_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to delete rate", e))?;

        timer.observe_duration();
        Ok(result.rows_affected() > 0)
    }
}

// =========================================================================
// Global settings
// =========================================================================

#[async_trait]
impl GlobalSettingsRepository for Database {
    #[instrument(skip(self))]
    async fn get(&self) -> Result<Option<GlobalSettings>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_settings"])
            .start_timer();

        let settings = sqlx::query_as::<_, GlobalSettings>(
            r#"
            SELECT settings_id, global_markup_percent, created_utc, updated_utc
            FROM global_settings
            ORDER BY updated_utc DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get settings", e))?;

        timer.observe_duration();
        Ok(settings)
    }

    #[instrument(skip(self))]
    async fn create(&self, global_markup_percent: Decimal) -> Result<GlobalSettings, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_settings"])
            .start_timer();

        let settings = sqlx::query_as::<_, GlobalSettings>(
            r#"
            INSERT INTO global_settings (settings_id, global_markup_percent)
            VALUES ($1, $2)
            RETURNING settings_id, global_markup_percent, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(global_markup_percent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create settings", e))?;

        timer.observe_duration();
        info!(global_markup_percent = %settings.global_markup_percent, "Global settings created");

        Ok(settings)
    }

    #[instrument(skip(self))]
    async fn update(
        &self,
        global_markup_percent: Decimal,
    ) -> Result<Option<GlobalSettings>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_settings"])
            .start_timer();

        let settings = sqlx::query_as::<_, GlobalSettings>(
            r#"
            UPDATE global_settings
            SET global_markup_percent = $1, updated_utc = NOW()
            WHERE settings_id = (
                SELECT settings_id FROM global_settings ORDER BY updated_utc DESC LIMIT 1
            )
            RETURNING settings_id, global_markup_percent, created_utc, updated_utc
            "#,
        )
        .bind(global_markup_percent)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update settings", e))?;

        timer.observe_duration();
        Ok(settings)
    }
}

// =========================================================================
// Payment logs
// =========================================================================

#[async_trait]
impl PaymentLogRepository for Database {
    #[instrument(skip(self, input), fields(user_id = %input.user_id, subscription_id = %input.subscription_id))]
    async fn create(&self, input: &NewPaymentLog) -> Result<PaymentLog, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, PaymentLog>(
            r#"
            INSERT INTO payment_logs (payment_id, user_id, subscription_id, amount, base_amount, profit_amount, currency, rate_used, paid_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING payment_id, user_id, subscription_id, amount, base_amount, profit_amount, currency, rate_used, paid_utc, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.subscription_id)
        .bind(input.amount)
        .bind(input.base_amount)
        .bind(input.profit_amount)
        .bind(input.currency)
        .bind(input.rate_used)
        .bind(input.paid_utc)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create payment", e))?;

        timer.observe_duration();
        info!(
            payment_id = %payment.payment_id,
            amount = payment.amount,
            profit_amount = payment.profit_amount,
            "Payment recorded"
        );

        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, PaymentLog>(
            r#"
            SELECT payment_id, user_id, subscription_id, amount, base_amount, profit_amount, currency, rate_used, paid_utc, created_utc
            FROM payment_logs
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get payment", e))?;

        timer.observe_duration();
        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn find_by_user(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_user_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, PaymentLog>(
            r#"
            SELECT payment_id, user_id, subscription_id, amount, base_amount, profit_amount, currency, rate_used, paid_utc, created_utc
            FROM payment_logs
            WHERE user_id = $1 AND paid_utc BETWEEN $2 AND $3
            ORDER BY paid_utc
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list user payments", e))?;

        timer.observe_duration();
        Ok(payments)
    }

    #[instrument(skip(self))]
    async fn find_by_subscription(
        &self,
        subscription_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_subscription_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, PaymentLog>(
            r#"
            SELECT payment_id, user_id, subscription_id, amount, base_amount, profit_amount, currency, rate_used, paid_utc, created_utc
            FROM payment_logs
            WHERE subscription_id = $1 AND paid_utc BETWEEN $2 AND $3
            ORDER BY paid_utc
            "#,
        )
        .bind(subscription_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list subscription payments", e))?;

        timer.observe_duration();
        Ok(payments)
    }

    #[instrument(skip(self))]
    async fn find_all(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, PaymentLog>(
            r#"
            SELECT payment_id, user_id, subscription_id, amount, base_amount, profit_amount, currency, rate_used, paid_utc, created_utc
            FROM payment_logs
            WHERE paid_utc BETWEEN $1 AND $2
            ORDER BY paid_utc
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list payments", e))?;

        timer.observe_duration();
        Ok(payments)
    }
}
