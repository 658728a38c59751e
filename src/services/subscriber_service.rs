//! Newsletter subscriber service.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::subscriber::Subscriber;
use crate::services::user_service::validate_email;

/// Subscriber service
pub struct SubscriberService {
    db: PgPool,
}

impl SubscriberService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Sign an email address up. Each subscriber gets an opaque one-shot
    /// token at creation; the confirmed flag defaults to true (no double
    /// opt-in).
    pub async fn subscribe(&self, email: &str) -> Result<Subscriber> {
        let email = email.trim().to_lowercase();
        validate_email(&email)?;

        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"
            INSERT INTO subscribers (id, email, token, confirmed, created_at)
            VALUES ($1, $2, $3, true, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(Uuid::new_v4().to_string())
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if err.is_unique_violation("subscribers_email_key") {
                AppError::Conflict("This email address is already subscribed".into())
            } else {
                err
            }
        })?;

        tracing::info!(email = %subscriber.email, "New subscriber");
        Ok(subscriber)
    }

    /// Mark a subscriber confirmed by their one-shot token.
    pub async fn confirm(&self, token: &str) -> Result<Subscriber> {
        sqlx::query_as::<_, Subscriber>(
            "UPDATE subscribers SET confirmed = true WHERE token = $1 RETURNING *",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Unknown subscription token".into()))
    }
}
