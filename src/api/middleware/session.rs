//! Session restore and authentication middleware.
//!
//! The session cookie carries an opaque token; restore looks it up by
//! digest and attaches the session (and its user, when bound and active)
//! to the request. Protected routes layer `require_auth` on top, admin
//! routes additionally `require_admin`.

use axum::{
    extract::{Request, State},
    http::header::{COOKIE, SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::api::SharedState;
use crate::models::session::{FlashMessage, Session};
use crate::models::user::{Role, User, UserStatus};
use crate::policy::{self, Action};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "promontolio_session";

/// Request extension: the restored session plus its user, if any.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: Session,
    pub user: Option<User>,
}

/// Request extension inserted by `require_auth`: a logged-in, active user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session_id: Uuid,
}

impl CurrentUser {
    pub fn role(&self) -> Role {
        self.user.role
    }
}

/// Pull the session token out of the Cookie header(s).
pub fn extract_session_token(request: &Request) -> Option<String> {
    for header in request.headers().get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some(token) = pair.trim().strip_prefix(SESSION_COOKIE) {
                if let Some(value) = token.strip_prefix('=') {
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }
    None
}

/// Build the Set-Cookie value establishing a session.
pub fn session_cookie(token: &str, max_age_hours: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        max_age_hours * 3600
    )
}

/// Build the Set-Cookie value clearing the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Restore the session on every request. Always inserts
/// `Option<SessionContext>`; downstream guards decide what to require.
pub async fn session_middleware(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut context: Option<SessionContext> = None;

    if let Some(token) = extract_session_token(&request) {
        let auth = state.auth();
        match auth.restore_session(&token).await {
            Ok(Some(session)) => {
                let user = match auth.session_user(&session).await {
                    Ok(user) => user,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to load session user");
                        None
                    }
                };
                context = Some(SessionContext { session, user });
            }
            Ok(None) => {}
            Err(e) => {
                // A storage hiccup leaves the request unauthenticated
                // rather than failing it.
                tracing::error!(error = %e, "Failed to restore session");
            }
        }
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Require a logged-in, active user; otherwise redirect to the login page.
pub async fn require_auth(mut request: Request, next: Next) -> Response {
    let context = request
        .extensions()
        .get::<Option<SessionContext>>()
        .cloned()
        .flatten();

    let Some(context) = context else {
        return Redirect::to("/auth/login").into_response();
    };
    let Some(user) = context.user else {
        return Redirect::to("/auth/login").into_response();
    };
    if user.status != UserStatus::Active {
        return Redirect::to("/auth/login").into_response();
    }

    request.extensions_mut().insert(CurrentUser {
        user,
        session_id: context.session.id,
    });
    next.run(request).await
}

/// Gate a nest behind one policy action. Non-qualifying users are flashed
/// and bounced back to the dashboard.
async fn require_action(
    state: SharedState,
    action: Action,
    request: Request,
    next: Next,
) -> Response {
    let Some(current) = request.extensions().get::<CurrentUser>().cloned() else {
        return Redirect::to("/auth/login").into_response();
    };

    if !policy::is_allowed(current.role(), action) {
        if let Err(e) = state
            .auth()
            .push_flash(
                current.session_id,
                FlashMessage::error("Access denied. Admin privileges required."),
            )
            .await
        {
            tracing::error!(error = %e, "Failed to record access-denied flash");
        }
        return Redirect::to("/admin/dashboard").into_response();
    }

    next.run(request).await
}

/// Guard for the user-management nest.
pub async fn require_user_admin(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    require_action(state, Action::ManageUsers, request, next).await
}

/// Guard for the settings nest.
pub async fn require_settings_admin(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    require_action(state, Action::ManageSettings, request, next).await
}

/// Attach a Set-Cookie header establishing the session to any response.
pub fn with_session_cookie(mut response: Response, token: &str, max_age_hours: i64) -> Response {
    match session_cookie(token, max_age_hours).parse() {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
            response
        }
        Err(_) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_cookie(value: &str) -> Request {
        Request::builder()
            .uri("/")
            .header(COOKIE, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn extracts_token_from_cookie_header() {
        let req = request_with_cookie("promontolio_session=abc123");
        assert_eq!(extract_session_token(&req), Some("abc123".to_string()));
    }

    #[test]
    fn extracts_token_among_other_cookies() {
        let req = request_with_cookie("theme=dark; promontolio_session=tok; lang=it");
        assert_eq!(extract_session_token(&req), Some("tok".to_string()));
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(extract_session_token(&req), None);

        let req = request_with_cookie("promontolio_session=");
        assert_eq!(extract_session_token(&req), None);

        let req = request_with_cookie("promontolio_sessionx=leaky");
        assert_eq!(extract_session_token(&req), None);
    }

    #[test]
    fn cookie_round_trip() {
        let cookie = session_cookie("tok-1", 24);
        assert!(cookie.contains("promontolio_session=tok-1"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));

        let req = request_with_cookie(cookie.split(';').next().unwrap());
        assert_eq!(extract_session_token(&req), Some("tok-1".to_string()));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
