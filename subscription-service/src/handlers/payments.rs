//! Payment recording and history.

use crate::dtos::{CreatePaymentRequest, TimeRangeQuery};
use crate::models::{from_minor_units, NewPaymentLog, PaymentLog};
use crate::services::{record_error, record_payment};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use service_core::error::AppError;
use uuid::Uuid;

/// Price the subscription as of the payment date and store the result.
///
/// The stored profit is fixed here; later price or rate changes do not
/// affect it.
pub async fn create_payment(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentLog>), AppError> {
    payload.check()?;

    if state.repos.users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("user not found")));
    }

    let paid_utc = payload.paid_utc.unwrap_or_else(Utc::now);
    let calculation = state
        .calculator
        .calculate_payment(user_id, payload.subscription_id, paid_utc.date_naive())
        .await
        .map_err(|e| {
            record_error(e.kind(), "create_payment");
            AppError::from(e)
        })?;

    let input = NewPaymentLog::from_calculation(
        &calculation,
        paid_utc,
        payload.amount,
        payload.rate_used,
    );
    let payment = state.repos.payments.create(&input).await?;

    record_payment(
        payment.currency.as_str(),
        from_minor_units(payment.amount).to_f64().unwrap_or_default(),
        from_minor_units(payment.profit_amount)
            .to_f64()
            .unwrap_or_default(),
    );
    tracing::info!(
        payment_id = %payment.payment_id,
        user_id = %user_id,
        subscription_id = %payment.subscription_id,
        amount = payment.amount,
        profit_amount = payment.profit_amount,
        "Payment recorded"
    );

    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentLog>, AppError> {
    let payment = state
        .repos
        .payments
        .find_by_id(payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("payment not found")))?;
    Ok(Json(payment))
}

pub async fn list_user_payments(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(range): Query<TimeRangeQuery>,
) -> Result<Json<Vec<PaymentLog>>, AppError> {
    let (from, to) = range.or_all_time()?;
    let payments = state.repos.payments.find_by_user(user_id, from, to).await?;
    Ok(Json(payments))
}

pub async fn list_subscription_payments(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Query(range): Query<TimeRangeQuery>,
) -> Result<Json<Vec<PaymentLog>>, AppError> {
    let (from, to) = range.or_all_time()?;
    let payments = state
        .repos
        .payments
        .find_by_subscription(subscription_id, from, to)
        .await?;
    Ok(Json(payments))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(range): Query<TimeRangeQuery>,
) -> Result<Json<Vec<PaymentLog>>, AppError> {
    let (from, to) = range.or_all_time()?;
    let payments = state.repos.payments.find_all(from, to).await?;
    Ok(Json(payments))
}
