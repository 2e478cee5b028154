//! Subscription catalog CRUD.

use crate::dtos::{CreateSubscriptionRequest, PaginationQuery, UpdateSubscriptionRequest};
use crate::models::Subscription;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("subscription not found"))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let input = payload.into_input()?;
    tracing::info!(
        service_name = %input.service_name,
        base_price = %input.base_price,
        base_currency = %input.base_currency,
        "Creating subscription"
    );

    let subscription = state.repos.subscriptions.create(&input).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    let subscriptions = state
        .repos
        .subscriptions
        .list(page.limit(), page.offset())
        .await?;
    Ok(Json(subscriptions))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
) -> Result<Json<Subscription>, AppError> {
    let subscription = state
        .repos
        .subscriptions
        .find_by_id(subscription_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(subscription))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> Result<Json<Subscription>, AppError> {
    let input = payload.into_input()?;
    let subscription = state
        .repos
        .subscriptions
        .update(subscription_id, &input)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(subscription))
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.repos.subscriptions.delete(subscription_id).await? {
        return Err(not_found());
    }
    tracing::info!(subscription_id = %subscription_id, "Subscription deleted");
    Ok(StatusCode::NO_CONTENT)
}
