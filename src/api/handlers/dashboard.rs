//! Dashboard handlers: the stats page and its JSON feed.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::api::flash::take_flash;
use crate::api::middleware::session::{CurrentUser, SessionContext};
use crate::api::SharedState;
use crate::error::Result;
use crate::models::session::FlashMessage;
use crate::models::user::Role;
use crate::services::dashboard_service::DashboardData;
use crate::views::View;

#[derive(Debug, Serialize)]
struct DashboardContext {
    title: &'static str,
    username: String,
    role: Role,
    #[serde(flatten)]
    data: DashboardData,
    flash: Vec<FlashMessage>,
    error: Option<&'static str>,
}

/// GET /admin/dashboard
///
/// A failed rollup query degrades to all-zero statistics with a generic
/// error flag; the page always renders.
pub async fn dashboard(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<View> {
    let flash = take_flash(&state, context.as_ref()).await;

    let (data, error) = match state.dashboard().collect().await {
        Ok(data) => (data, None),
        Err(e) => {
            tracing::error!(error = %e, "Dashboard aggregation failed");
            (DashboardData::default(), Some("Unable to load dashboard."))
        }
    };

    View::render(
        state.views.clone(),
        "admin/dashboard",
        &DashboardContext {
            title: "Dashboard",
            username: current.user.username,
            role: current.user.role,
            data,
            flash,
            error,
        },
    )
}

/// GET /admin/dashboard/stats — JSON feed for the dashboard charts.
pub async fn stats(State(state): State<SharedState>) -> Response {
    match state.dashboard().collect().await {
        Ok(data) => Json(json!({
            "success": true,
            "data": {
                "posts_by_month": data.analytics.posts_per_month,
                "subscribers_by_month": data.analytics.subscribers_per_month,
                "posts_by_category": data.analytics.posts_by_category,
                "top_posts": data.analytics.top_posts,
                "total_views": data.analytics.total_views,
            },
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Stats aggregation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Error loading stats." })),
            )
                .into_response()
        }
    }
}
