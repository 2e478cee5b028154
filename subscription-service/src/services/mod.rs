//! Services module for subscription-service.

pub mod analytics;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod pricing;
pub mod repository;

pub use analytics::ProfitAnalytics;
pub use database::Database;
pub use memory::InMemoryStore;
pub use metrics::{
    get_metrics, init_metrics, record_analytics_report, record_calculation, record_error,
    record_payment,
};
pub use pricing::{resolve_price, PaymentCalculator, PricingError};
pub use repository::{
    CurrencyRateRepository, GlobalSettingsRepository, HealthCheck, PaymentLogRepository,
    Repositories, SubscriptionRepository, UserRepository, UserSubscriptionRepository,
};
