//! Administrator endpoints: profit reports and manual rate entry.
//!
//! Every handler takes [`AdminUser`], so non-admin callers are rejected
//! before any work is done.

use crate::dtos::{
    BulkRateResult, BulkRatesRequest, BulkRatesResponse, CurrentRate, CurrentRatesResponse,
    ManualRateRequest, ManualRateResponse, TimeRangeQuery,
};
use crate::middleware::AdminUser;
use crate::models::{Currency, ProfitStats, SubscriptionProfitStats, UserProfitStats};
use crate::services::record_error;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use service_core::error::AppError;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct MonthPath {
    pub year: i32,
    pub month: u32,
}

pub async fn total_profit(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<ProfitStats>, AppError> {
    tracing::info!(admin_user_id = %admin.user_id, "Total profit requested");
    Ok(Json(state.analytics.total_profit().await?))
}

pub async fn monthly_profit(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(MonthPath { year, month }): Path<MonthPath>,
) -> Result<Json<ProfitStats>, AppError> {
    if !(2000..=2100).contains(&year) {
        return Err(AppError::BadRequest(anyhow::anyhow!("invalid year")));
    }
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(anyhow::anyhow!("invalid month")));
    }

    tracing::info!(admin_user_id = %admin.user_id, year, month, "Monthly profit requested");
    Ok(Json(state.analytics.monthly_profit(year, month).await?))
}

pub async fn profit_by_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(range): Query<TimeRangeQuery>,
) -> Result<Json<Vec<UserProfitStats>>, AppError> {
    let (from, to) = range.required()?;
    Ok(Json(state.analytics.profit_by_user(from, to).await?))
}

pub async fn profit_by_subscriptions(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(range): Query<TimeRangeQuery>,
) -> Result<Json<Vec<SubscriptionProfitStats>>, AppError> {
    let (from, to) = range.required()?;
    Ok(Json(state.analytics.profit_by_service(from, to).await?))
}

/// Record one manually entered rate, effective now.
pub async fn set_manual_rate(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<ManualRateRequest>,
) -> Result<(StatusCode, Json<ManualRateResponse>), AppError> {
    let input = payload.into_input(Utc::now())?;
    let rate = state.repos.rates.create(&input).await?;

    tracing::info!(
        admin_user_id = %admin.user_id,
        currency = %rate.currency,
        rate = %rate.value,
        "Manual currency rate set"
    );

    Ok((
        StatusCode::CREATED,
        Json(ManualRateResponse {
            message: "Manual currency rate set successfully".to_string(),
            id: rate.rate_id,
            currency: rate.currency,
            rate: rate.value,
            source: rate.source,
            set_at: rate.fetched_utc,
        }),
    ))
}

/// Record several rates at once. Invalid entries are reported per item and
/// do not stop the rest.
pub async fn set_multiple_rates(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<BulkRatesRequest>,
) -> Result<(StatusCode, Json<BulkRatesResponse>), AppError> {
    if payload.rates.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "at least one rate required"
        )));
    }

    let set_at = Utc::now();
    let mut results = Vec::with_capacity(payload.rates.len());

    for item in &payload.rates {
        let outcome = match item.into_input(set_at) {
            Ok(input) => state.repos.rates.create(&input).await,
            Err(e) => Err(e),
        };

        results.push(match outcome {
            Ok(rate) => BulkRateResult {
                currency: item.currency.clone(),
                success: true,
                rate: Some(rate.value),
                id: Some(rate.rate_id),
                error: None,
            },
            Err(e) => {
                record_error(e.kind(), "set_multiple_rates");
                BulkRateResult {
                    currency: item.currency.clone(),
                    success: false,
                    rate: None,
                    id: None,
                    error: Some(e.to_string()),
                }
            }
        });
    }

    tracing::info!(
        admin_user_id = %admin.user_id,
        processed = payload.rates.len(),
        succeeded = results.iter().filter(|r| r.success).count(),
        "Bulk rate setting completed"
    );

    Ok((
        StatusCode::CREATED,
        Json(BulkRatesResponse {
            message: "Bulk rate setting completed".to_string(),
            processed: payload.rates.len(),
            results,
            set_at,
        }),
    ))
}

/// Latest rate for every currency, with its age.
pub async fn current_rates(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<CurrentRatesResponse>, AppError> {
    let checked_at = Utc::now();
    let mut rates = BTreeMap::new();

    for currency in Currency::ALL {
        let entry = match state.repos.rates.latest_by_currency(currency).await? {
            Some(rate) => CurrentRate {
                available: true,
                rate: Some(rate.value),
                source: Some(rate.source),
                set_at: Some(rate.fetched_utc),
                age_hours: Some((checked_at - rate.fetched_utc).num_seconds() as f64 / 3600.0),
            },
            None => CurrentRate {
                available: false,
                rate: None,
                source: None,
                set_at: None,
                age_hours: None,
            },
        };
        rates.insert(currency, entry);
    }

    Ok(Json(CurrentRatesResponse { rates, checked_at }))
}
