use crate::dtos::CalculateQuery;
use crate::models::PaymentAmount;
use crate::services::record_error;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

/// Preview what a user owes for a subscription. Nothing is stored.
pub async fn calculate_payment(
    State(state): State<AppState>,
    Path((user_id, subscription_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<CalculateQuery>,
) -> Result<Json<PaymentAmount>, AppError> {
    let due_date = query.due_date()?;
    let payment = state
        .calculator
        .calculate_payment(user_id, subscription_id, due_date)
        .await
        .map_err(|e| {
            record_error(e.kind(), "calculate_payment");
            AppError::from(e)
        })?;
    Ok(Json(payment))
}
