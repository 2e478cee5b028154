//! Test helper module for subscription-service integration tests.
//!
//! Every test gets its own application on a random port, backed by a fresh
//! in-memory store. [`TestDb`] gives store tests a migrated PostgreSQL schema
//! of their own when `TEST_DATABASE_URL` is set.

#![allow(dead_code)]

use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use subscription_service::config::SubscriptionConfig;
use subscription_service::services::{Database, InMemoryStore, Repositories};
use subscription_service::startup::Application;

// Telegram ids must be unique per store; keep them unique per process too.
static TG_ID_COUNTER: AtomicI64 = AtomicI64::new(1_000);

// Counter for unique schema names
static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Database URL for PostgreSQL store tests, if one is configured.
pub fn get_test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// Generate a unique schema name for test isolation.
fn unique_schema_name() -> String {
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test_subscription_{}_{}", std::process::id(), counter)
}

/// A migrated schema of its own on the test database.
pub struct TestDb {
    pub db: Database,
    base_url: String,
    schema_name: String,
}

impl TestDb {
    /// Create a fresh schema and run migrations in it.
    /// Returns `None` when `TEST_DATABASE_URL` is not set.
    pub async fn connect() -> Option<Self> {
        let Some(base_url) = get_test_database_url() else {
            eprintln!("TEST_DATABASE_URL not set, skipping PostgreSQL store test");
            return None;
        };
        let schema_name = unique_schema_name();

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&base_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
            .execute(&pool)
            .await
            .ok();
        sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
            .execute(&pool)
            .await
            .expect("Failed to create test schema");
        pool.close().await;

        // Use ? or & depending on whether URL already has query parameters
        let separator = if base_url.contains('?') { "&" } else { "?" };
        let url = format!(
            "{}{}options=-c search_path%3D{}",
            base_url, separator, schema_name
        );

        let db = Database::new(&url, 5, 1)
            .await
            .expect("Failed to create test database");
        db.run_migrations().await.expect("Failed to run migrations");

        Some(TestDb {
            db,
            base_url,
            schema_name,
        })
    }

    pub fn repositories(&self) -> Repositories {
        Repositories::from_store(Arc::new(self.db.clone()))
    }

    /// Cleanup test resources (schema).
    pub async fn cleanup(self) {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_url)
            .await
            .ok();

        if let Some(pool) = pool {
            let _ = sqlx::query(&format!(
                "DROP SCHEMA IF EXISTS {} CASCADE",
                self.schema_name
            ))
            .execute(&pool)
            .await;
            pool.close().await;
        }
    }
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
    pub client: Client,
    pub repos: Repositories,
}

impl TestApp {
    /// Spawn a new test application on a random port.
    pub async fn spawn() -> Self {
        let repos = Repositories::from_store(Arc::new(InMemoryStore::new()));
        let app = Application::with_repositories(SubscriptionConfig::for_tests(), repos.clone())
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let http_address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            http_port,
            client,
            repos,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.http_address, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch(&self, path: &str, body: Value) -> Response {
        self.client
            .patch(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Create a user and return its id.
    pub async fn create_user(&self, is_admin: bool) -> String {
        let tg_id = TG_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
        let response = self
            .post(
                "/api/users",
                json!({
                    "tg_id": tg_id,
                    "username": format!("user{}", tg_id),
                    "fullname": "Test User",
                    "is_admin": is_admin
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        id_of(response, "user_id").await
    }

    /// Create a catalog entry and return its id.
    pub async fn create_subscription(&self, name: &str, price: &str, currency: &str) -> String {
        let response = self
            .post(
                "/api/subscriptions",
                json!({
                    "service_name": name,
                    "base_price": price,
                    "base_currency": currency,
                    "period_days": 30
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        id_of(response, "subscription_id").await
    }

    /// Link a user to a subscription with the given override fields.
    pub async fn link(&self, user_id: &str, subscription_id: &str, pricing: Value) -> Response {
        let mut body = json!({ "subscription_id": subscription_id });
        if let (Some(body), Some(pricing)) = (body.as_object_mut(), pricing.as_object()) {
            for (key, value) in pricing {
                body.insert(key.clone(), value.clone());
            }
        }
        self.post(&format!("/api/users/{}/subscriptions", user_id), body)
            .await
    }

    pub async fn set_rate(&self, currency: &str, value: &str) {
        let response = self
            .post(
                "/api/currency-rates",
                json!({ "currency": currency, "value": value }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

pub async fn id_of(response: Response, field: &str) -> String {
    let body: Value = response.json().await.expect("Failed to parse JSON");
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("missing {} in {}", field, body))
        .to_string()
}

/// Read a decimal field, whether serialized as a string or a number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("invalid decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("invalid decimal number"),
        other => panic!("expected decimal, got {}", other),
    }
}
