//! Self-service profile handlers.

use axum::{
    extract::{Extension, State},
    response::Response,
    Form,
};
use serde::{Deserialize, Serialize};

use crate::api::flash::{flash_redirect, take_flash};
use crate::api::handlers::none_if_empty;
use crate::api::middleware::session::{CurrentUser, SessionContext};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::session::FlashMessage;
use crate::models::user::Role;
use crate::services::user_service::ProfilePasswordChange;
use crate::views::View;

#[derive(Debug, Serialize)]
struct ProfileContext {
    title: &'static str,
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    role: Role,
    flash: Vec<FlashMessage>,
}

/// GET /admin/profile
pub async fn form(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<View> {
    let user = state.users().get(current.user.id).await?;
    let flash = take_flash(&state, context.as_ref()).await;

    View::render(
        state.views.clone(),
        "admin/profile",
        &ProfileContext {
            title: "Profile",
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            role: user.role,
            flash,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// POST /admin/profile — update basic info, optionally changing the
/// password when the current one checks out.
pub async fn update(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let session_id = current.session_id;

    let password_change = match (
        none_if_empty(form.current_password),
        none_if_empty(form.new_password),
    ) {
        (Some(current_password), Some(new_password)) => Some(ProfilePasswordChange {
            current_password,
            new_password,
            confirm_password: form.confirm_password.unwrap_or_default(),
        }),
        _ => None,
    };

    let result = state
        .users()
        .update_profile(
            current.user.id,
            form.username.trim().to_string(),
            form.email.trim().to_string(),
            none_if_empty(form.first_name),
            none_if_empty(form.last_name),
            none_if_empty(form.bio),
            password_change,
        )
        .await;

    let flash = match result {
        Ok(_) => FlashMessage::success("Profile updated successfully"),
        Err(AppError::Validation(msg)) | Err(AppError::Conflict(msg)) => FlashMessage::error(msg),
        Err(e) => {
            tracing::error!(error = %e, "Profile update failed");
            FlashMessage::error("Error updating profile")
        }
    };
    flash_redirect(&state, session_id, flash, "/admin/profile").await
}
