//! Flash-and-redirect helpers.
//!
//! Flash messages live in the session row. Authenticated flows always have
//! a session; anonymous flows (login failure, newsletter signup) lazily
//! open an anonymous session so the message survives the redirect.

use axum::response::{IntoResponse, Redirect, Response};
use uuid::Uuid;

use crate::api::middleware::session::{with_session_cookie, SessionContext};
use crate::api::SharedState;
use crate::models::session::FlashMessage;

/// Push a flash onto an existing session and redirect. A failed flash write
/// is logged, not surfaced; the redirect must happen either way.
pub async fn flash_redirect(
    state: &SharedState,
    session_id: Uuid,
    flash: FlashMessage,
    to: &str,
) -> Response {
    if let Err(e) = state.auth().push_flash(session_id, flash).await {
        tracing::error!(error = %e, "Failed to record flash message");
    }
    Redirect::to(to).into_response()
}

/// Flash-and-redirect for routes reachable without a session. Reuses the
/// visitor's session when one exists, otherwise opens an anonymous one and
/// sets its cookie on the redirect.
pub async fn flash_redirect_ensure_session(
    state: &SharedState,
    context: Option<&SessionContext>,
    flash: FlashMessage,
    to: &str,
) -> Response {
    if let Some(context) = context {
        return flash_redirect(state, context.session.id, flash, to).await;
    }

    let auth = state.auth();
    match auth.open_session(None).await {
        Ok(token) => {
            match auth.restore_session(&token).await {
                Ok(Some(session)) => {
                    if let Err(e) = auth.push_flash(session.id, flash).await {
                        tracing::error!(error = %e, "Failed to record flash message");
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "Failed to restore fresh session"),
            }
            with_session_cookie(
                Redirect::to(to).into_response(),
                &token,
                state.config.session_ttl_hours,
            )
        }
        Err(e) => {
            // No session, no flash; the redirect still stands.
            tracing::error!(error = %e, "Failed to open anonymous session");
            Redirect::to(to).into_response()
        }
    }
}

/// Drain pending flash messages for rendering, if the visitor has a session.
pub async fn take_flash(state: &SharedState, context: Option<&SessionContext>) -> Vec<FlashMessage> {
    let Some(context) = context else {
        return Vec::new();
    };
    match state.auth().take_flash(context.session.id).await {
        Ok(flash) => flash,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    }
}
