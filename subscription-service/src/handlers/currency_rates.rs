//! Currency rate CRUD.

use crate::dtos::{CreateCurrencyRateRequest, PaginationQuery, UpdateCurrencyRateRequest};
use crate::models::{Currency, CurrencyRate};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("currency rate not found"))
}

pub async fn create_rate(
    State(state): State<AppState>,
    Json(payload): Json<CreateCurrencyRateRequest>,
) -> Result<(StatusCode, Json<CurrencyRate>), AppError> {
    let input = payload.into_input()?;
    let rate = state.repos.rates.create(&input).await?;
    Ok((StatusCode::CREATED, Json(rate)))
}

pub async fn list_rates(
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<CurrencyRate>>, AppError> {
    let rates = state.repos.rates.list(page.limit(), page.offset()).await?;
    Ok(Json(rates))
}

pub async fn latest_rate(
    State(state): State<AppState>,
    Path(currency): Path<String>,
) -> Result<Json<CurrencyRate>, AppError> {
    let currency: Currency = currency
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let rate = state
        .repos
        .rates
        .latest_by_currency(currency)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("no rate for {}", currency)))?;
    Ok(Json(rate))
}

pub async fn get_rate(
    State(state): State<AppState>,
    Path(rate_id): Path<Uuid>,
) -> Result<Json<CurrencyRate>, AppError> {
    let rate = state
        .repos
        .rates
        .find_by_id(rate_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(rate))
}

pub async fn update_rate(
    State(state): State<AppState>,
    Path(rate_id): Path<Uuid>,
    Json(payload): Json<UpdateCurrencyRateRequest>,
) -> Result<Json<CurrencyRate>, AppError> {
    let input = payload.into_input()?;
    let rate = state
        .repos
        .rates
        .update(rate_id, &input)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(rate))
}

pub async fn delete_rate(
    State(state): State<AppState>,
    Path(rate_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.repos.rates.delete(rate_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
