//! User management handlers (admin/super only; the role gate is layered in
//! the router).

use axum::{
    extract::{Extension, Path, Query, State},
    response::Response,
    Form,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::dto::Pagination;
use crate::api::flash::{flash_redirect, take_flash};
use crate::api::handlers::none_if_empty;
use crate::api::middleware::session::{CurrentUser, SessionContext};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::session::FlashMessage;
use crate::models::user::{Role, User, UserStatus};
use crate::services::user_service::{NewUser, UserListFilter, UserStats, UserUpdate};
use crate::views::View;

/// User fields exposed to admin views; the credential hash never leaves
/// the model layer.
#[derive(Debug, Serialize)]
struct UserSummary {
    id: Uuid,
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role: Role,
    status: UserStatus,
    last_login_at: Option<DateTime<Utc>>,
    login_count: i64,
    created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            status: user.status,
            last_login_at: user.last_login_at,
            login_count: user.login_count,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
struct UserListContext {
    title: &'static str,
    username: String,
    users: Vec<UserSummary>,
    stats: UserStats,
    pagination: Pagination,
    flash: Vec<FlashMessage>,
}

/// GET /admin/users
pub async fn list(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<UserListQuery>,
) -> Result<View> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.limit.unwrap_or(10).clamp(1, 100);

    let filter = UserListFilter {
        search: none_if_empty(query.search),
        role: query
            .role
            .as_deref()
            .filter(|r| *r != "all")
            .and_then(Role::parse),
        status: query
            .status
            .as_deref()
            .filter(|s| *s != "all")
            .and_then(UserStatus::parse),
    };

    let service = state.users();
    let (users, total) = service.list(&filter, page, per_page).await?;
    let stats = service.stats().await?;
    let flash = take_flash(&state, context.as_ref()).await;

    View::render(
        state.views.clone(),
        "admin/userList",
        &UserListContext {
            title: "Manage Users",
            username: current.user.username,
            users: users.into_iter().map(UserSummary::from).collect(),
            stats,
            pagination: Pagination::new(page, per_page, total),
            flash,
        },
    )
}

#[derive(Debug, Serialize)]
struct UserFormContext {
    title: &'static str,
    username: String,
    user_to_edit: Option<UserSummary>,
    form_action: String,
    flash: Vec<FlashMessage>,
}

/// GET /admin/users/new
pub async fn new_form(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<View> {
    let flash = take_flash(&state, context.as_ref()).await;
    View::render(
        state.views.clone(),
        "admin/userForm",
        &UserFormContext {
            title: "New User",
            username: current.user.username,
            user_to_edit: None,
            form_action: "/admin/users/new".into(),
            flash,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub bio: Option<String>,
}

/// The admin form only ever assigns author/editor/admin; `super` is not a
/// grantable role through this surface.
fn parse_form_role(raw: Option<&str>) -> Result<Role> {
    match raw {
        None | Some("") => Ok(Role::Author),
        Some("author") => Ok(Role::Author),
        Some("editor") => Ok(Role::Editor),
        Some("admin") => Ok(Role::Admin),
        Some(_) => Err(AppError::Validation("Invalid role selected".into())),
    }
}

fn user_failure_flash(err: &AppError, fallback: &str) -> FlashMessage {
    match err {
        AppError::Validation(msg) | AppError::Conflict(msg) | AppError::Authorization(msg) => {
            FlashMessage::error(msg.clone())
        }
        _ => FlashMessage::error(fallback.to_string()),
    }
}

/// POST /admin/users/new
pub async fn create(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<CreateUserForm>,
) -> Response {
    let session_id = current.session_id;

    let input = match build_new_user(form) {
        Ok(input) => input,
        Err(e) => {
            let flash = user_failure_flash(&e, "Failed to create user");
            return flash_redirect(&state, session_id, flash, "/admin/users/new").await;
        }
    };

    match state.users().create(&current.user, input).await {
        Ok(user) => {
            let flash = FlashMessage::success(format!(
                "User {} ({}) created successfully",
                user.username,
                user.full_name()
            ));
            flash_redirect(&state, session_id, flash, "/admin/users").await
        }
        Err(e) => {
            tracing::error!(error = %e, "Create user failed");
            let flash = user_failure_flash(&e, "Failed to create user");
            flash_redirect(&state, session_id, flash, "/admin/users/new").await
        }
    }
}

fn build_new_user(form: CreateUserForm) -> Result<NewUser> {
    let role = parse_form_role(form.role.as_deref())?;
    let status = match form.status.as_deref() {
        None | Some("") => UserStatus::Active,
        Some(raw) => UserStatus::parse(raw)
            .ok_or_else(|| AppError::Validation("Invalid status selected".into()))?,
    };

    Ok(NewUser {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password,
        first_name: none_if_empty(form.first_name),
        last_name: none_if_empty(form.last_name),
        role,
        status,
        bio: none_if_empty(form.bio),
    })
}

/// GET /admin/users/:id/edit
pub async fn edit_form(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Response {
    let session_id = current.session_id;

    let user = match state.users().get(id).await {
        Ok(user) => user,
        Err(_) => {
            let flash = FlashMessage::error("User not found");
            return flash_redirect(&state, session_id, flash, "/admin/users").await;
        }
    };

    let flash = take_flash(&state, context.as_ref()).await;
    let view = View::render(
        state.views.clone(),
        "admin/userForm",
        &UserFormContext {
            title: "Edit User",
            username: current.user.username,
            form_action: format!("/admin/users/{}/edit", user.id),
            user_to_edit: Some(UserSummary::from(user)),
            flash,
        },
    );
    match view {
        Ok(view) => axum::response::IntoResponse::into_response(view),
        Err(e) => axum::response::IntoResponse::into_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct EditUserForm {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub bio: Option<String>,
}

/// POST /admin/users/:id/edit
pub async fn update(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Form(form): Form<EditUserForm>,
) -> Response {
    let session_id = current.session_id;
    let back = format!("/admin/users/{}/edit", id);

    let input = match build_user_update(form) {
        Ok(input) => input,
        Err(e) => {
            let flash = user_failure_flash(&e, "Failed to update user");
            return flash_redirect(&state, session_id, flash, &back).await;
        }
    };

    match state.users().update(&current.user, id, input).await {
        Ok(user) => {
            let flash = FlashMessage::success(format!("User {} updated successfully", user.username));
            flash_redirect(&state, session_id, flash, "/admin/users").await
        }
        Err(AppError::NotFound(_)) => {
            let flash = FlashMessage::error("User not found");
            flash_redirect(&state, session_id, flash, "/admin/users").await
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %id, "Update user failed");
            let flash = user_failure_flash(&e, "Failed to update user");
            flash_redirect(&state, session_id, flash, &back).await
        }
    }
}

fn build_user_update(form: EditUserForm) -> Result<UserUpdate> {
    let role = parse_form_role(form.role.as_deref())?;
    let status = match form.status.as_deref() {
        None | Some("") => UserStatus::Active,
        Some(raw) => UserStatus::parse(raw)
            .ok_or_else(|| AppError::Validation("Invalid status selected".into()))?,
    };

    Ok(UserUpdate {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        first_name: none_if_empty(form.first_name),
        last_name: none_if_empty(form.last_name),
        role,
        status,
        bio: none_if_empty(form.bio),
    })
}

/// POST /admin/users/:id/delete
pub async fn delete(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Response {
    let session_id = current.session_id;

    let flash = match state.users().delete(&current.user, id).await {
        Ok(user) => {
            FlashMessage::success(format!("User {} deleted successfully", user.full_name()))
        }
        Err(e) => {
            tracing::warn!(error = %e, user_id = %id, "Delete user rejected");
            user_failure_flash(&e, "Failed to delete user")
        }
    };
    flash_redirect(&state, session_id, flash, "/admin/users").await
}

/// POST /admin/users/:id/toggle-status
pub async fn toggle_status(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Response {
    let session_id = current.session_id;

    let flash = match state.users().toggle_status(&current.user, id).await {
        Ok(user) => {
            let verb = match user.status {
                UserStatus::Active => "activated",
                _ => "deactivated",
            };
            FlashMessage::success(format!("User {} {} successfully", user.full_name(), verb))
        }
        Err(e) => {
            tracing::warn!(error = %e, user_id = %id, "Status toggle rejected");
            user_failure_flash(&e, "Failed to change user status")
        }
    };
    flash_redirect(&state, session_id, flash, "/admin/users").await
}

/// POST /admin/users/:id/reset-password
///
/// The generated temporary password is shown once, in the acting admin's
/// flash, and stays out of the logs.
pub async fn reset_password(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Response {
    let session_id = current.session_id;

    let flash = match state.users().reset_password(&current.user, id).await {
        Ok((user, temp_password)) => FlashMessage::success(format!(
            "Password for {} reset successfully. Temporary password: {}",
            user.username, temp_password
        )),
        Err(e) => {
            tracing::warn!(error = %e, user_id = %id, "Password reset rejected");
            user_failure_flash(&e, "Failed to reset password")
        }
    };
    flash_redirect(&state, session_id, flash, "/admin/users").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_roles_exclude_super() {
        assert_eq!(parse_form_role(None).unwrap(), Role::Author);
        assert_eq!(parse_form_role(Some("editor")).unwrap(), Role::Editor);
        assert_eq!(parse_form_role(Some("admin")).unwrap(), Role::Admin);
        assert!(parse_form_role(Some("super")).is_err());
        assert!(parse_form_role(Some("owner")).is_err());
    }
}
