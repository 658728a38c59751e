//! Public marketing pages, newsletter signup, and the 404 fallback.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Response,
    Form,
};
use serde::{Deserialize, Serialize};

use crate::api::flash::{flash_redirect_ensure_session, take_flash};
use crate::api::middleware::session::SessionContext;
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::session::FlashMessage;
use crate::views::View;

/// Context for the static marketing pages.
#[derive(Debug, Serialize)]
struct PageContext {
    title: &'static str,
    meta_description: &'static str,
    meta_keywords: &'static str,
    flash: Vec<FlashMessage>,
}

async fn marketing_page(
    state: &SharedState,
    context: Option<&SessionContext>,
    view: &'static str,
    title: &'static str,
    meta_description: &'static str,
    meta_keywords: &'static str,
) -> Result<View> {
    let flash = take_flash(state, context).await;
    View::render(
        state.views.clone(),
        view,
        &PageContext {
            title,
            meta_description,
            meta_keywords,
            flash,
        },
    )
}

pub async fn home(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
) -> Result<View> {
    marketing_page(
        &state,
        context.as_ref(),
        "index",
        "Home",
        "Welcome to Promontolio, premium organic olive oil from Gargano.",
        "olive oil, organic, Gargano, Promontolio",
    )
    .await
}

pub async fn about(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
) -> Result<View> {
    marketing_page(
        &state,
        context.as_ref(),
        "about",
        "About Us",
        "Learn more about Promontolio and our organic olive oil production.",
        "about, olive oil, organic, Promontolio",
    )
    .await
}

pub async fn contact(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
) -> Result<View> {
    marketing_page(
        &state,
        context.as_ref(),
        "contact",
        "Contact",
        "Contact Promontolio for inquiries about our products.",
        "contact, olive oil, Promontolio",
    )
    .await
}

pub async fn product(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
) -> Result<View> {
    marketing_page(
        &state,
        context.as_ref(),
        "product",
        "Products",
        "Discover our range of organic olive oil products.",
        "products, olive oil, organic, Promontolio",
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
}

/// Newsletter signup. Duplicate addresses are reported, not crashed on.
pub async fn subscribe(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Form(form): Form<SubscribeForm>,
) -> Response {
    let flash = match state.subscribers().subscribe(&form.email).await {
        Ok(_) => FlashMessage::success("Thank you for subscribing to our newsletter!"),
        Err(AppError::Conflict(msg)) | Err(AppError::Validation(msg)) => FlashMessage::error(msg),
        Err(e) => {
            tracing::error!(error = %e, "Newsletter signup failed");
            FlashMessage::error("Subscription failed. Please try again later.")
        }
    };

    flash_redirect_ensure_session(&state, context.as_ref(), flash, "/").await
}

/// Confirm a subscription by its one-shot token.
pub async fn confirm_subscription(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    axum::extract::Path(token): axum::extract::Path<String>,
) -> Response {
    let flash = match state.subscribers().confirm(&token).await {
        Ok(_) => FlashMessage::success("Your subscription is confirmed."),
        Err(AppError::NotFound(msg)) => FlashMessage::error(msg),
        Err(e) => {
            tracing::error!(error = %e, "Subscription confirmation failed");
            FlashMessage::error("Confirmation failed. Please try again later.")
        }
    };

    flash_redirect_ensure_session(&state, context.as_ref(), flash, "/").await
}

/// Context for the 404 page.
#[derive(Debug, Serialize)]
struct NotFoundContext {
    title: &'static str,
}

pub async fn not_found(State(state): State<SharedState>) -> Result<Response> {
    let view = View::render(
        state.views.clone(),
        "404",
        &NotFoundContext { title: "Not Found" },
    )?
    .with_status(StatusCode::NOT_FOUND);
    Ok(axum::response::IntoResponse::into_response(view))
}
