//! Server-side session model.
//!
//! The cookie carries an opaque random token; only its SHA-256 digest is
//! stored. `user_id` is NULL for anonymous sessions that exist solely to
//! carry flash messages across a redirect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Flash message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// One-shot notification shown once after a redirect, then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

/// Session entity
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub token_hash: String,
    pub user_id: Option<Uuid>,
    pub flash: Json<Vec<FlashMessage>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_serializes_with_lowercase_kind() {
        let flash = FlashMessage::success("Article published successfully!");
        let json = serde_json::to_value(&flash).unwrap();
        assert_eq!(json["kind"], "success");
        assert_eq!(json["message"], "Article published successfully!");
    }

    #[test]
    fn flash_round_trips_through_json() {
        let original = vec![
            FlashMessage::error("Invalid username or password"),
            FlashMessage::success("ok"),
        ];
        let encoded = serde_json::to_string(&original).unwrap();
        let decoded: Vec<FlashMessage> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, original);
    }
}
