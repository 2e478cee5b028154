//! Admin access check for the `/api/admin/:admin_user_id/...` routes.
//!
//! The caller names themselves in the path; the request proceeds only when
//! that user exists and is an administrator.

use crate::models::User;
use crate::startup::AppState;
use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use service_core::error::AppError;
use std::collections::HashMap;
use uuid::Uuid;

pub const ADMIN_PATH_PARAM: &str = "admin_user_id";

/// The administrator making the request.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e.body_text())))?;

        let raw = params
            .get(ADMIN_PATH_PARAM)
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("admin user ID required")))?;
        let admin_user_id = Uuid::parse_str(raw)
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("invalid admin user ID")))?;

        let user = state
            .repos
            .users
            .find_by_id(admin_user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("admin user not found")))?;

        if !user.is_admin {
            tracing::warn!(user_id = %user.user_id, "Non-admin attempted admin access");
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "access denied: admin privileges required"
            )));
        }

        tracing::debug!(admin_user_id = %user.user_id, "Admin access granted");

        Ok(AdminUser(user))
    }
}
