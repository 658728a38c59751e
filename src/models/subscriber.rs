//! Newsletter subscriber model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Subscriber entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    /// Opaque one-shot token handed out at signup
    pub token: String,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}
