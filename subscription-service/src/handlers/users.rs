//! User CRUD.

use crate::dtos::{CreateUserRequest, PaginationQuery, UpdateUserRequest};
use crate::models::User;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("user not found"))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    payload.validate()?;
    tracing::info!(tg_id = payload.tg_id, "Creating user");

    let user = state.repos.users.create(&payload.into()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state.repos.users.list(page.limit(), page.offset()).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state
        .repos
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(user))
}

pub async fn get_user_by_tg_id(
    State(state): State<AppState>,
    Path(tg_id): Path<i64>,
) -> Result<Json<User>, AppError> {
    let user = state
        .repos
        .users
        .find_by_tg_id(tg_id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    payload.validate()?;
    let user = state
        .repos
        .users
        .update(user_id, &payload.into())
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.repos.users.delete(user_id).await? {
        return Err(not_found());
    }
    tracing::info!(user_id = %user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
