//! Global settings model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Singleton settings row. The markup applies to users without an override.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GlobalSettings {
    pub settings_id: Uuid,
    pub global_markup_percent: Decimal,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}
