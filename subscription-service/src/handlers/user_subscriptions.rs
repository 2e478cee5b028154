//! Linking users to subscriptions and managing their pricing overrides.

use crate::dtos::{
    CreateUserSubscriptionRequest, PaginationQuery, UpdateUserSubscriptionRequest,
};
use crate::models::{CreateUserSubscription, UserSubscription};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("subscription link not found"))
}

pub async fn create_user_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<CreateUserSubscriptionRequest>,
) -> Result<(StatusCode, Json<UserSubscription>), AppError> {
    let pricing = payload.pricing()?;

    if state.repos.users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("user not found")));
    }
    if state
        .repos
        .subscriptions
        .find_by_id(payload.subscription_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(anyhow::anyhow!("subscription not found")));
    }

    tracing::info!(
        user_id = %user_id,
        subscription_id = %payload.subscription_id,
        pricing_mode = pricing.mode.as_str(),
        "Subscribing user"
    );

    let link = state
        .repos
        .user_subscriptions
        .create(&CreateUserSubscription {
            user_id,
            subscription_id: payload.subscription_id,
            pricing,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn list_user_subscriptions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<UserSubscription>>, AppError> {
    let links = state
        .repos
        .user_subscriptions
        .list_by_user(user_id, page.limit(), page.offset())
        .await?;
    Ok(Json(links))
}

pub async fn get_user_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserSubscription>, AppError> {
    let link = state
        .repos
        .user_subscriptions
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(link))
}

pub async fn update_user_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserSubscriptionRequest>,
) -> Result<Json<UserSubscription>, AppError> {
    let current = state
        .repos
        .user_subscriptions
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?;

    let pricing = payload.apply_to(current.pricing())?;
    let link = state
        .repos
        .user_subscriptions
        .update_pricing(id, &pricing)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(
        user_subscription_id = %id,
        pricing_mode = link.pricing_mode.as_str(),
        "Pricing override updated"
    );
    Ok(Json(link))
}

pub async fn delete_user_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.repos.user_subscriptions.delete(id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
