//! Metrics module for subscription-service.
//! Provides Prometheus metrics for pricing, payments and reporting.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_counter_vec, register_histogram_vec, register_int_counter_vec,
    CounterVec, Encoder, HistogramVec, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Recorder behind the `metrics` facade used by the HTTP middleware.
/// `None` when another recorder was already installed.
pub static METRICS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "subscription_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Payment calculations by outcome
pub static CALCULATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Payments recorded
pub static PAYMENTS_RECORDED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Recorded payment amount and profit by currency (major units)
pub static PAYMENT_AMOUNT_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Profit reports served
pub static ANALYTICS_REPORTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    });

    CALCULATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "subscription_calculations_total",
                "Total payment calculations by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register CALCULATIONS_TOTAL")
    });

    PAYMENTS_RECORDED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "subscription_payments_recorded_total",
                "Total payments recorded by currency"
            ),
            &["currency"]
        )
        .expect("Failed to register PAYMENTS_RECORDED_TOTAL")
    });

    PAYMENT_AMOUNT_TOTAL.get_or_init(|| {
        register_counter_vec!(
            opts!(
                "subscription_payment_amount_total",
                "Recorded payment amounts by currency and kind"
            ),
            &["currency", "kind"]
        )
        .expect("Failed to register PAYMENT_AMOUNT_TOTAL")
    });

    ANALYTICS_REPORTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "subscription_analytics_reports_total",
                "Total profit reports by report type"
            ),
            &["report"]
        )
        .expect("Failed to register ANALYTICS_REPORTS_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("subscription_errors_total", "Total errors by type for alerting"),
            &["error_type", "operation"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .and_then(|handle| handle.as_ref())
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return output;
    }
    output.push_str(&String::from_utf8_lossy(&buffer));
    output
}

/// Record a payment calculation outcome.
pub fn record_calculation(outcome: &str) {
    if let Some(counter) = CALCULATIONS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a stored payment.
pub fn record_payment(currency: &str, amount: f64, profit: f64) {
    if let Some(counter) = PAYMENTS_RECORDED_TOTAL.get() {
        counter.with_label_values(&[currency]).inc();
    }
    if let Some(counter) = PAYMENT_AMOUNT_TOTAL.get() {
        counter
            .with_label_values(&[currency, "amount"])
            .inc_by(amount.abs());
        // Counters only grow; losses are tracked separately.
        let kind = if profit < 0.0 { "loss" } else { "profit" };
        counter
            .with_label_values(&[currency, kind])
            .inc_by(profit.abs());
    }
}

/// Record a served profit report.
pub fn record_analytics_report(report: &str) {
    if let Some(counter) = ANALYTICS_REPORTS_TOTAL.get() {
        counter.with_label_values(&[report]).inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type, operation]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facade_metrics_are_exported() {
        init_metrics();
        init_metrics();

        metrics::counter!("http_requests_total", "route" => "/api/users").increment(1);
        record_error("exchange_rate_not_found", "calculate_payment");

        let output = get_metrics();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("subscription_errors_total"));
    }
}
