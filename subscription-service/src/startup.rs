//! Application startup and lifecycle management.

use crate::config::SubscriptionConfig;
use crate::middleware::http_span;
use crate::handlers::{
    admin, calculate, currency_rates, health_check, metrics_handler, payments, readiness_check,
    settings, subscriptions, user_subscriptions, users,
};
use crate::services::{
    init_metrics, Database, InMemoryStore, PaymentCalculator, ProfitAnalytics, Repositories,
};
use axum::{
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: SubscriptionConfig,
    pub repos: Repositories,
    pub calculator: PaymentCalculator,
    pub analytics: ProfitAnalytics,
}

impl AppState {
    pub fn new(config: SubscriptionConfig, repos: Repositories) -> Self {
        Self {
            calculator: PaymentCalculator::new(&repos),
            analytics: ProfitAnalytics::new(&repos),
            config,
            repos,
        }
    }
}

/// Connect the configured store: Postgres when a database is configured,
/// otherwise the in-memory store.
pub async fn connect_repositories(
    config: &SubscriptionConfig,
    run_migrations: bool,
) -> Result<Repositories, AppError> {
    let Some(database) = &config.database else {
        tracing::warn!("DATABASE_URL not set, using in-memory store");
        return Ok(Repositories::from_store(Arc::new(InMemoryStore::new())));
    };

    let db = Database::new(
        &database.url,
        database.max_connections,
        database.min_connections,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to PostgreSQL");
        e
    })?;

    if run_migrations {
        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;
    }

    Ok(Repositories::from_store(Arc::new(db)))
}

/// Container health check against the configured database.
///
/// Fails without a database: a fresh in-memory store says nothing about the
/// running server.
pub async fn check_database_health(config: &SubscriptionConfig) -> Result<(), AppError> {
    if config.database.is_none() {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "no database configured, set DATABASE_URL"
        )));
    }
    let repos = connect_repositories(config, false).await?;
    repos.health.health_check().await
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Users
        .route("/users", post(users::create_user).get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/tgid/:tg_id", get(users::get_user_by_tg_id))
        // Subscriptions
        .route(
            "/subscriptions",
            post(subscriptions::create_subscription).get(subscriptions::list_subscriptions),
        )
        .route(
            "/subscriptions/:id",
            get(subscriptions::get_subscription)
                .patch(subscriptions::update_subscription)
                .delete(subscriptions::delete_subscription),
        )
        // User subscriptions
        .route(
            "/users/:id/subscriptions",
            post(user_subscriptions::create_user_subscription)
                .get(user_subscriptions::list_user_subscriptions),
        )
        .route(
            "/user-subscriptions/:id",
            get(user_subscriptions::get_user_subscription)
                .patch(user_subscriptions::update_user_subscription)
                .delete(user_subscriptions::delete_user_subscription),
        )
        // Currency rates
        .route(
            "/currency-rates",
            post(currency_rates::create_rate).get(currency_rates::list_rates),
        )
        .route(
            "/currency-rates/latest/:currency",
            get(currency_rates::latest_rate),
        )
        .route(
            "/currency-rates/:id",
            get(currency_rates::get_rate)
                .patch(currency_rates::update_rate)
                .delete(currency_rates::delete_rate),
        )
        // Settings
        .route(
            "/settings",
            get(settings::get_settings)
                .post(settings::create_settings)
                .put(settings::update_settings),
        )
        // Calculation and payments
        .route(
            "/calculate/:user_id/:subscription_id",
            get(calculate::calculate_payment),
        )
        .route(
            "/users/:id/payments",
            post(payments::create_payment).get(payments::list_user_payments),
        )
        .route(
            "/subscriptions/:id/payments",
            get(payments::list_subscription_payments),
        )
        .route("/payments", get(payments::list_payments))
        .route("/payments/:id", get(payments::get_payment))
        // Admin
        .route(
            "/admin/:admin_user_id/profit/total",
            get(admin::total_profit),
        )
        .route(
            "/admin/:admin_user_id/profit/monthly/:year/:month",
            get(admin::monthly_profit),
        )
        .route(
            "/admin/:admin_user_id/profit/users",
            get(admin::profit_by_users),
        )
        .route(
            "/admin/:admin_user_id/profit/subscriptions",
            get(admin::profit_by_subscriptions),
        )
        .route("/admin/:admin_user_id/rates", post(admin::set_manual_rate))
        .route(
            "/admin/:admin_user_id/rates/bulk",
            post(admin::set_multiple_rates),
        )
        .route(
            "/admin/:admin_user_id/rates/current",
            get(admin::current_rates),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| http_span(request)),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: SubscriptionConfig) -> Result<Self, AppError> {
        let repos = connect_repositories(&config, true).await?;
        Self::with_repositories(config, repos).await
    }

    /// Build the application without running migrations.
    /// Use this when the schema is managed outside the service.
    pub async fn build_without_migrations(config: SubscriptionConfig) -> Result<Self, AppError> {
        let repos = connect_repositories(&config, false).await?;
        Self::with_repositories(config, repos).await
    }

    /// Build the application on top of already constructed repositories.
    pub async fn with_repositories(
        config: SubscriptionConfig,
        repos: Repositories,
    ) -> Result<Self, AppError> {
        init_metrics();

        let state = AppState::new(config.clone(), repos);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Subscription service listener bound");

        Ok(Self {
            http_port,
            listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get the repositories the application serves from.
    pub fn repositories(&self) -> &Repositories {
        &self.state.repos
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = %self.state.config.service_name,
            version = %self.state.config.service_version,
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        let app = router(self.state);
        axum::serve(self.listener, app).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(
            SubscriptionConfig::for_tests(),
            Repositories::from_store(Arc::new(InMemoryStore::new())),
        )
    }

    async fn status_of(uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router(state()).oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn static_segments_win_over_ids() {
        assert_eq!(status_of("/api/users/tgid/12345").await, StatusCode::NOT_FOUND);
        assert_eq!(
            status_of("/api/currency-rates/latest/USD").await,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of("/api/currency-rates/latest/XYZ").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        assert_eq!(status_of("/api/invoices").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_flag_fails_without_database() {
        let err = check_database_health(&SubscriptionConfig::for_tests())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
        assert!(err.to_string().contains("no database configured"));
    }

    #[tokio::test]
    async fn health_reports_ok_on_memory_store() {
        assert_eq!(status_of("/health").await, StatusCode::OK);
    }
}
