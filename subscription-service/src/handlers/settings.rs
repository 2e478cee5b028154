//! Global settings (singleton).

use crate::dtos::GlobalSettingsRequest;
use crate::models::GlobalSettings;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("global settings not found"))
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<GlobalSettings>, AppError> {
    let settings = state.repos.settings.get().await?.ok_or_else(not_found)?;
    Ok(Json(settings))
}

pub async fn create_settings(
    State(state): State<AppState>,
    Json(payload): Json<GlobalSettingsRequest>,
) -> Result<(StatusCode, Json<GlobalSettings>), AppError> {
    let markup = payload.markup()?;
    if state.repos.settings.get().await?.is_some() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "global settings already exist"
        )));
    }

    let settings = state.repos.settings.create(markup).await?;
    tracing::info!(global_markup_percent = %markup, "Global settings created");
    Ok((StatusCode::CREATED, Json(settings)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<GlobalSettingsRequest>,
) -> Result<Json<GlobalSettings>, AppError> {
    let markup = payload.markup()?;
    let settings = state
        .repos
        .settings
        .update(markup)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(global_markup_percent = %markup, "Global settings updated");
    Ok(Json(settings))
}
