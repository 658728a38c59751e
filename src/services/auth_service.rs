//! Authentication and session service.
//!
//! Verifies credentials, records login bookkeeping, and manages the
//! server-side session rows backing the cookie. Password hashing and
//! verification are plain functions so the write paths (and tests) call
//! them directly instead of relying on persistence hooks.

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::session::{FlashMessage, Session};
use crate::models::user::{User, UserStatus};

/// Authentication and session service
pub struct AuthService {
    db: PgPool,
    session_ttl_hours: i64,
}

/// Outcome of a successful login: the user plus the raw session token to
/// hand back in the cookie.
pub struct LoginOutcome {
    pub user: User,
    pub session_token: String,
}

/// Hash a password with bcrypt
pub fn hash_password(password: &str) -> Result<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    verify(password, password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Digest of a raw session token as stored in the sessions table.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn generate_session_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

impl AuthService {
    pub fn new(db: PgPool, session_ttl_hours: i64) -> Self {
        Self {
            db,
            session_ttl_hours,
        }
    }

    /// Authenticate a username/password pair and open a session.
    ///
    /// The caller gets one generic failure message regardless of which
    /// check failed; the distinction only reaches the logs.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        const GENERIC: &str = "Invalid username or password";

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;

        let user = match user {
            Some(user) => user,
            None => {
                tracing::debug!(username, "Login failed: unknown username");
                return Err(AppError::Authentication(GENERIC.to_string()));
            }
        };

        if user.status != UserStatus::Active {
            tracing::debug!(username, status = ?user.status, "Login failed: account not active");
            return Err(AppError::Authentication(GENERIC.to_string()));
        }

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(username, "Login failed: password mismatch");
            return Err(AppError::Authentication(GENERIC.to_string()));
        }

        // Login bookkeeping
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET last_login_at = now(), login_count = login_count + 1, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .fetch_one(&self.db)
        .await?;

        let session_token = self.open_session(Some(user.id)).await?;
        tracing::info!(username = %user.username, "User logged in");

        Ok(LoginOutcome {
            user,
            session_token,
        })
    }

    /// Create a session row and return the raw cookie token.
    /// `user_id` is None for anonymous flash-only sessions.
    pub async fn open_session(&self, user_id: Option<Uuid>) -> Result<String> {
        let token = generate_session_token();
        let expires_at = Utc::now() + Duration::hours(self.session_ttl_hours);

        sqlx::query(
            r#"
            INSERT INTO sessions (id, token_hash, user_id, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token_digest(&token))
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(token)
    }

    /// Restore the session behind a cookie token; expired or unknown tokens
    /// yield None.
    pub async fn restore_session(&self, token: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token_hash = $1 AND expires_at > now()",
        )
        .bind(token_digest(token))
        .fetch_optional(&self.db)
        .await?;

        Ok(session)
    }

    /// Look up the user bound to a session, if any.
    pub async fn session_user(&self, session: &Session) -> Result<Option<User>> {
        let Some(user_id) = session.user_id else {
            return Ok(None);
        };

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Destroy a session (logout).
    pub async fn close_session(&self, session_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Append a flash message to a session.
    pub async fn push_flash(&self, session_id: Uuid, flash: FlashMessage) -> Result<()> {
        sqlx::query("UPDATE sessions SET flash = flash || $2::jsonb WHERE id = $1")
            .bind(session_id)
            .bind(Json(vec![flash]))
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Take and clear the pending flash messages in one statement, so a
    /// message is shown exactly once.
    pub async fn take_flash(&self, session_id: Uuid) -> Result<Vec<FlashMessage>> {
        let row: Option<(Json<Vec<FlashMessage>>,)> = sqlx::query_as(
            r#"
            UPDATE sessions
            SET flash = '[]'::jsonb
            WHERE id = $1
            RETURNING (SELECT flash FROM sessions WHERE id = $1)
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(Json(flash),)| flash).unwrap_or_default())
    }

    /// Remove expired session rows. Called periodically from a background
    /// task.
    pub async fn sweep_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < now()")
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verify_round_trip() {
        let hashed = hash_password("s3cret-Pass").unwrap();
        assert!(verify_password("s3cret-Pass", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn token_digest_is_stable_hex() {
        let digest = token_digest("abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, token_digest("abc"));
        assert_ne!(digest, token_digest("abd"));
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn session_tokens_are_long_and_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
