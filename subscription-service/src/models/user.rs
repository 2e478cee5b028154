//! User model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A back-office user, identified externally by a Telegram id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub tg_id: i64,
    pub username: String,
    pub fullname: String,
    pub is_admin: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub tg_id: i64,
    pub username: String,
    pub fullname: String,
    pub is_admin: bool,
}

/// Input for updating a user.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub fullname: Option<String>,
    pub is_admin: Option<bool>,
}

impl UpdateUser {
    pub fn apply(&self, user: &mut User) {
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(fullname) = &self.fullname {
            user.fullname = fullname.clone();
        }
        if let Some(is_admin) = self.is_admin {
            user.is_admin = is_admin;
        }
    }
}
