//! Configuration module for subscription-service.

use service_core::config::{self as core_config, get_env, get_env_parsed, Environment};
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub environment: Environment,
    /// `None` selects the in-memory store (never in production).
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl SubscriptionConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let environment = Environment::from_env();

        let database = match env::var("DATABASE_URL") {
            Ok(url) => Some(DatabaseConfig {
                url,
                max_connections: get_env_parsed("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: get_env_parsed("DATABASE_MIN_CONNECTIONS", 2),
            }),
            Err(_) if environment.is_prod() => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "DATABASE_URL is required in production"
                )));
            }
            Err(_) => None,
        };

        Ok(Self {
            common,
            service_name: get_env("SERVICE_NAME", Some("subscription-service"), false)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            environment,
            database,
        })
    }

    /// Configuration for tests: ephemeral port, no database.
    pub fn for_tests() -> Self {
        Self {
            common: core_config::Config { port: 0 },
            service_name: "subscription-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            environment: Environment::Dev,
            database: None,
        }
    }
}
