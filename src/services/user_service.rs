//! User management service.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::user::{Role, User, UserStatus};
use crate::policy::{self, UserAction, UserActionDenial};
use crate::services::auth_service::hash_password;

/// User management service
pub struct UserService {
    db: PgPool,
}

/// Input for creating a user account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub bio: Option<String>,
}

/// Input for editing a user account (role change goes through
/// `policy::may_assign_role` first).
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub bio: Option<String>,
}

/// Filters for the admin user list.
#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

/// Role/status tallies shown on the user list.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub admins: i64,
    pub editors: i64,
    pub authors: i64,
}

/// Generate a temporary password for admin-driven resets.
pub fn generate_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789!@#$%&*";
    let mut rng = rand::rng();
    (0..16)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Validate the username shape: 3-30 chars of letters, digits, underscores.
pub fn validate_username(username: &str) -> Result<()> {
    if username.len() < 3 || username.len() > 30 {
        return Err(AppError::Validation(
            "Username must be between 3 and 30 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, and underscores".into(),
        ));
    }
    Ok(())
}

/// Minimal email shape check; real verification is out of scope.
pub fn validate_email(email: &str) -> Result<()> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    });
    if !valid {
        return Err(AppError::Validation(
            "Please provide a valid email address".into(),
        ));
    }
    Ok(())
}

/// Password policy: at least 8 chars with lower, upper and digit.
pub fn validate_password_strength(password: &str) -> Result<()> {
    let strong = password.len() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit());
    if !strong {
        return Err(AppError::Validation(
            "Password must be at least 8 characters and contain a lowercase letter, \
             an uppercase letter, and a number"
                .into(),
        ));
    }
    Ok(())
}

fn denial_message(denial: UserActionDenial) -> AppError {
    match denial {
        UserActionDenial::SelfAction => {
            AppError::Authorization("You cannot perform this action on your own account".into())
        }
        UserActionDenial::SuperTarget => {
            AppError::Authorization("Only a super user may act on a super account".into())
        }
    }
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// List users with search/role/status filters, newest first.
    pub async fn list(
        &self,
        filter: &UserListFilter,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<User>, i64)> {
        let search_pattern = filter.search.as_ref().map(|s| format!("%{}%", s));
        let offset = ((page.max(1) - 1) * per_page) as i64;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL
                   OR username ILIKE $1 OR email ILIKE $1
                   OR first_name ILIKE $1 OR last_name ILIKE $1)
              AND ($2::user_role IS NULL OR role = $2)
              AND ($3::user_status IS NULL OR status = $3)
            ORDER BY created_at DESC
            OFFSET $4 LIMIT $5
            "#,
        )
        .bind(&search_pattern)
        .bind(filter.role)
        .bind(filter.status)
        .bind(offset)
        .bind(per_page as i64)
        .fetch_all(&self.db)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL
                   OR username ILIKE $1 OR email ILIKE $1
                   OR first_name ILIKE $1 OR last_name ILIKE $1)
              AND ($2::user_role IS NULL OR role = $2)
              AND ($3::user_status IS NULL OR status = $3)
            "#,
        )
        .bind(&search_pattern)
        .bind(filter.role)
        .bind(filter.status)
        .fetch_one(&self.db)
        .await?;

        Ok((users, total))
    }

    pub async fn stats(&self) -> Result<UserStats> {
        let (total, active, inactive, admins, editors, authors): (i64, i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'active'),
                    COUNT(*) FILTER (WHERE status = 'inactive'),
                    COUNT(*) FILTER (WHERE role IN ('admin', 'super')),
                    COUNT(*) FILTER (WHERE role = 'editor'),
                    COUNT(*) FILTER (WHERE role = 'author')
                FROM users
                "#,
            )
            .fetch_one(&self.db)
            .await?;

        Ok(UserStats {
            total,
            active,
            inactive,
            admins,
            editors,
            authors,
        })
    }

    /// Create a user. Uniqueness is pre-checked for a friendly message; the
    /// unique indexes are the real guarantee under concurrency.
    pub async fn create(&self, actor: &User, input: NewUser) -> Result<User> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;
        validate_password_strength(&input.password)?;

        if !policy::may_assign_role(actor, Uuid::nil(), input.role) {
            return Err(AppError::Authorization(
                "Only a super user may create super accounts".into(),
            ));
        }

        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(&input.username)
        .bind(&input.email)
        .fetch_one(&self.db)
        .await?;
        if exists {
            return Err(AppError::Conflict(
                "A user with this email or username already exists".into(),
            ));
        }

        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (id, username, email, password_hash, first_name, last_name,
                 role, status, bio, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.username)
        .bind(input.email.to_lowercase())
        .bind(hash_password(&input.password)?)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.role)
        .bind(input.status)
        .bind(&input.bio)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if err.is_unique_violation("users_username_key")
                || err.is_unique_violation("users_email_key")
            {
                AppError::Conflict("A user with this email or username already exists".into())
            } else {
                err
            }
        })?;

        tracing::info!(username = %user.username, role = ?user.role, "User created");
        Ok(user)
    }

    /// Update an account, enforcing the role-assignment rule and the
    /// duplicate check against other accounts.
    pub async fn update(&self, actor: &User, id: Uuid, input: UserUpdate) -> Result<User> {
        validate_username(&input.username)?;
        validate_email(&input.email)?;

        let target = self.get(id).await?;

        if target.role == Role::Super && actor.role != Role::Super {
            return Err(denial_message(UserActionDenial::SuperTarget));
        }
        if input.role != target.role && !policy::may_assign_role(actor, id, input.role) {
            return Err(AppError::Authorization(
                "You cannot grant the super role to this account".into(),
            ));
        }

        let (duplicate,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id <> $1 AND (username = $2 OR email = $3))",
        )
        .bind(id)
        .bind(&input.username)
        .bind(&input.email)
        .fetch_one(&self.db)
        .await?;
        if duplicate {
            return Err(AppError::Conflict(
                "Email or username already in use by another user".into(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, email = $3, first_name = $4, last_name = $5,
                role = $6, status = $7, bio = $8, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.username)
        .bind(input.email.to_lowercase())
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.role)
        .bind(input.status)
        .bind(&input.bio)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    /// Delete an account, honoring the self/super rules.
    pub async fn delete(&self, actor: &User, id: Uuid) -> Result<User> {
        let target = self.get(id).await?;

        policy::check_user_action(actor, &target, UserAction::Delete).map_err(denial_message)?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        // Sessions die with the account; authored articles keep their
        // dangling reference on purpose.
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(username = %target.username, deleted_by = %actor.username, "User deleted");
        Ok(target)
    }

    /// Flip active/inactive, honoring the self/super rules.
    pub async fn toggle_status(&self, actor: &User, id: Uuid) -> Result<User> {
        let target = self.get(id).await?;

        policy::check_user_action(actor, &target, UserAction::ToggleStatus)
            .map_err(denial_message)?;

        let next = match target.status {
            UserStatus::Active => UserStatus::Inactive,
            _ => UserStatus::Active,
        };

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(next)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    /// Reset a password to a generated temporary one. The new password is
    /// returned to the caller and must stay out of the logs.
    pub async fn reset_password(&self, actor: &User, id: Uuid) -> Result<(User, String)> {
        let target = self.get(id).await?;

        policy::check_user_action(actor, &target, UserAction::ResetPassword)
            .map_err(denial_message)?;

        let temp_password = generate_password();
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(hash_password(&temp_password)?)
            .execute(&self.db)
            .await?;

        tracing::info!(
            username = %target.username,
            reset_by = %actor.username,
            "Password reset"
        );
        Ok((target, temp_password))
    }

    /// Self-service profile update, with optional password change.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        username: String,
        email: String,
        first_name: Option<String>,
        last_name: Option<String>,
        bio: Option<String>,
        password_change: Option<ProfilePasswordChange>,
    ) -> Result<User> {
        validate_username(&username)?;
        validate_email(&email)?;

        let current = self.get(user_id).await?;

        let (duplicate,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id <> $1 AND (username = $2 OR email = $3))",
        )
        .bind(user_id)
        .bind(&username)
        .bind(&email)
        .fetch_one(&self.db)
        .await?;
        if duplicate {
            return Err(AppError::Conflict("Username or email already exists".into()));
        }

        let new_hash = match password_change {
            Some(change) => {
                if !crate::services::auth_service::verify_password(
                    &change.current_password,
                    &current.password_hash,
                )? {
                    return Err(AppError::Validation("Current password is incorrect".into()));
                }
                if change.new_password != change.confirm_password {
                    return Err(AppError::Validation("New passwords do not match".into()));
                }
                validate_password_strength(&change.new_password)?;
                Some(hash_password(&change.new_password)?)
            }
            None => None,
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, email = $3, first_name = $4, last_name = $5, bio = $6,
                password_hash = COALESCE($7, password_hash), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&username)
        .bind(email.to_lowercase())
        .bind(&first_name)
        .bind(&last_name)
        .bind(&bio)
        .bind(&new_hash)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }
}

/// Password change request attached to a profile update.
#[derive(Debug, Clone)]
pub struct ProfilePasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_passwords_have_expected_shape() {
        let password = generate_password();
        assert_eq!(password.len(), 16);
        let other = generate_password();
        assert_ne!(password, other);
    }

    #[test]
    fn username_validation() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("al_99").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@nodot").is_err());
    }

    #[test]
    fn password_strength_validation() {
        assert!(validate_password_strength("Sup3rSecret").is_ok());
        assert!(validate_password_strength("short1A").is_err());
        assert!(validate_password_strength("alllowercase1").is_err());
        assert!(validate_password_strength("ALLUPPERCASE1").is_err());
        assert!(validate_password_strength("NoDigitsHere").is_err());
    }
}
