//! Session lifecycle handlers: login form, login, logout.

use axum::{
    extract::{Extension, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};

use crate::api::flash::{flash_redirect_ensure_session, take_flash};
use crate::api::middleware::session::{clear_session_cookie, with_session_cookie, SessionContext};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::session::FlashMessage;
use crate::views::View;

#[derive(Debug, Serialize)]
struct LoginContext {
    title: &'static str,
    flash: Vec<FlashMessage>,
}

/// Render the login form with any pending flash from a failed attempt.
pub async fn login_form(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
) -> Result<View> {
    let flash = take_flash(&state, context.as_ref()).await;
    View::render(
        state.views.clone(),
        "adminForm",
        &LoginContext {
            title: "Admin Login",
            flash,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Process a login attempt.
///
/// Every failure shows the same generic message; which check failed is
/// only visible in the server logs.
pub async fn login(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Form(form): Form<LoginForm>,
) -> Response {
    if form.username.trim().is_empty() || form.password.is_empty() {
        return flash_redirect_ensure_session(
            &state,
            context.as_ref(),
            FlashMessage::error("Username and password are required"),
            "/auth/login",
        )
        .await;
    }

    match state.auth().login(form.username.trim(), &form.password).await {
        Ok(outcome) => {
            // The previous session (anonymous or stale) ends here; the
            // login gets a fresh one.
            if let Some(old) = &context {
                if let Err(e) = state.auth().close_session(old.session.id).await {
                    tracing::warn!(error = %e, "Failed to drop pre-login session");
                }
            }
            with_session_cookie(
                Redirect::to("/admin/dashboard").into_response(),
                &outcome.session_token,
                state.config.session_ttl_hours,
            )
        }
        Err(AppError::Authentication(msg)) => {
            flash_redirect_ensure_session(
                &state,
                context.as_ref(),
                FlashMessage::error(msg),
                "/auth/login",
            )
            .await
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed unexpectedly");
            flash_redirect_ensure_session(
                &state,
                context.as_ref(),
                FlashMessage::error("Login failed. Please try again."),
                "/auth/login",
            )
            .await
        }
    }
}

/// Destroy the session and clear the cookie.
pub async fn logout(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
) -> Response {
    if let Some(context) = context {
        if let Err(e) = state.auth().close_session(context.session.id).await {
            tracing::error!(error = %e, "Failed to close session on logout");
        }
    }

    let mut response = Redirect::to("/").into_response();
    if let Ok(value) = clear_session_cookie().parse() {
        response
            .headers_mut()
            .append(axum::http::header::SET_COOKIE, value);
    }
    response
}
