//! Route definitions.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use super::middleware::security_headers::security_headers_middleware;
use super::middleware::session::{
    require_auth, require_settings_admin, require_user_admin, session_middleware,
};
use super::SharedState;

/// Maximum multipart body size for media uploads (50 MB).
const UPLOAD_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Create the application router.
///
/// The session middleware runs on every route; `require_auth` guards the
/// admin panel, and the user-management/settings nests add the admin role
/// gate on top.
pub fn create_router(
    state: SharedState,
    general_limiter: Arc<RateLimiter>,
    login_limiter: Arc<RateLimiter>,
) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::public::home))
        .route("/about", get(handlers::public::about))
        .route("/contact", get(handlers::public::contact))
        .route("/product", get(handlers::public::product))
        .route("/blog", get(handlers::blog::list))
        .route("/blog/page/:page", get(handlers::blog::list_page))
        .route("/blog/:slug", get(handlers::blog::view))
        .route("/subscribe", post(handlers::public::subscribe))
        .route(
            "/subscribe/confirm/:token",
            get(handlers::public::confirm_subscription),
        );

    // The login POST carries its own, much stricter limiter; the form GET
    // added afterwards stays outside it.
    let auth_routes = Router::new()
        .route(
            "/login",
            post(handlers::auth::login)
                .route_layer(middleware::from_fn_with_state(
                    login_limiter,
                    rate_limit_middleware,
                ))
                .get(handlers::auth::login_form),
        )
        .route("/logout", get(handlers::auth::logout));

    let admin_blog = Router::new()
        .route("/", get(handlers::blog::admin_list))
        .route(
            "/new",
            get(handlers::blog::new_form).post(handlers::blog::create),
        )
        .route(
            "/:id/edit",
            get(handlers::blog::edit_form).post(handlers::blog::update),
        )
        .route("/:id/delete", post(handlers::blog::delete));

    let admin_users = Router::new()
        .route("/", get(handlers::users::list))
        .route(
            "/new",
            get(handlers::users::new_form).post(handlers::users::create),
        )
        .route(
            "/:id/edit",
            get(handlers::users::edit_form).post(handlers::users::update),
        )
        .route("/:id/delete", post(handlers::users::delete))
        .route("/:id/toggle-status", post(handlers::users::toggle_status))
        .route("/:id/reset-password", post(handlers::users::reset_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_admin,
        ));

    let admin_media = Router::new()
        .route("/", get(handlers::media::library))
        .route(
            "/upload",
            get(handlers::media::upload_form).post(handlers::media::upload),
        )
        .route("/bulk", post(handlers::media::bulk))
        .route("/api/editor/images", get(handlers::media::editor_images))
        .route(
            "/api/:id",
            get(handlers::media::api_details)
                .put(handlers::media::api_update)
                .delete(handlers::media::api_delete),
        )
        .route("/api/:id/usage", post(handlers::media::api_increment_usage))
        .route("/:id", get(handlers::media::details_view))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    let admin_settings = Router::new()
        .route(
            "/",
            get(handlers::settings::form).post(handlers::settings::update),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_settings_admin,
        ));

    let admin_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/dashboard/stats", get(handlers::dashboard::stats))
        .route(
            "/profile",
            get(handlers::profile::form).post(handlers::profile::update),
        )
        .nest("/blog", admin_blog)
        .nest("/users", admin_users)
        .nest("/media", admin_media)
        .nest("/settings", admin_settings)
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .merge(public_routes)
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .nest_service("/media", ServeDir::new(&state.config.media_root))
        .fallback(handlers::public::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            general_limiter,
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
