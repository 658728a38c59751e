//! Site settings handlers (admin/super; the role gate is layered in the
//! router). Settings live in a JSON document on disk, not in the store.

use axum::{
    extract::{Extension, State},
    response::Response,
    Form,
};
use serde::{Deserialize, Serialize};

use crate::api::flash::{flash_redirect, take_flash};
use crate::api::middleware::session::{CurrentUser, SessionContext};
use crate::api::SharedState;
use crate::error::Result;
use crate::models::session::FlashMessage;
use crate::services::settings_service::Settings;
use crate::views::View;

#[derive(Debug, Serialize)]
struct SettingsContext {
    title: &'static str,
    username: String,
    settings: Settings,
    flash: Vec<FlashMessage>,
}

/// GET /admin/settings
pub async fn form(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<View> {
    let settings = state.settings().load().await;
    let flash = take_flash(&state, context.as_ref()).await;

    View::render(
        state.views.clone(),
        "admin/settings",
        &SettingsContext {
            title: "Settings",
            username: current.user.username,
            settings,
            flash,
        },
    )
}

/// Settings form payload. Checkboxes arrive as "on" when ticked and are
/// absent otherwise; list fields are comma-separated.
#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    pub site_title: Option<String>,
    pub site_description: Option<String>,
    pub site_keywords: Option<String>,
    pub contact_email: Option<String>,
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub youtube: Option<String>,
    pub default_post_status: Option<String>,
    pub posts_per_page: Option<String>,
    pub comments_enabled: Option<String>,
    pub moderate_comments: Option<String>,
    pub allow_guest_comments: Option<String>,
    pub max_file_size: Option<String>,
    pub allowed_image_types: Option<String>,
    pub allowed_doc_types: Option<String>,
    pub session_timeout: Option<String>,
    pub password_min_length: Option<String>,
    pub require_strong_passwords: Option<String>,
    pub max_login_attempts: Option<String>,
}

fn checkbox(value: &Option<String>) -> bool {
    value.as_deref() == Some("on")
}

fn parse_or<T: std::str::FromStr>(value: &Option<String>, default: T) -> T {
    value
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn csv_list(value: &Option<String>, default: Vec<String>) -> Vec<String> {
    match value.as_deref().filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        None => default,
    }
}

fn apply_form(form: SettingsForm, defaults: Settings) -> Settings {
    let mut settings = defaults;

    if let Some(title) = form.site_title.filter(|t| !t.trim().is_empty()) {
        settings.site.title = title.trim().to_string();
    }
    if let Some(description) = form.site_description {
        settings.site.description = description.trim().to_string();
    }
    if let Some(keywords) = form.site_keywords {
        settings.site.keywords = keywords.trim().to_string();
    }
    if let Some(email) = form.contact_email {
        settings.site.contact_email = email.trim().to_string();
    }
    settings.site.social_media.facebook = form.facebook.unwrap_or_default();
    settings.site.social_media.instagram = form.instagram.unwrap_or_default();
    settings.site.social_media.twitter = form.twitter.unwrap_or_default();
    settings.site.social_media.youtube = form.youtube.unwrap_or_default();

    if let Some(status) = form
        .default_post_status
        .filter(|s| s == "draft" || s == "published")
    {
        settings.content.default_post_status = status;
    }
    settings.content.posts_per_page = parse_or(&form.posts_per_page, 10).max(1);
    settings.content.comments_enabled = checkbox(&form.comments_enabled);
    settings.content.moderate_comments = checkbox(&form.moderate_comments);
    settings.content.allow_guest_comments = checkbox(&form.allow_guest_comments);

    settings.uploads.max_file_size = parse_or(&form.max_file_size, 5).max(1);
    settings.uploads.allowed_image_types = csv_list(
        &form.allowed_image_types,
        settings.uploads.allowed_image_types.clone(),
    );
    settings.uploads.allowed_doc_types = csv_list(
        &form.allowed_doc_types,
        settings.uploads.allowed_doc_types.clone(),
    );

    settings.security.session_timeout = parse_or(&form.session_timeout, 24).max(1);
    settings.security.password_min_length = parse_or(&form.password_min_length, 6).max(6);
    settings.security.require_strong_passwords = checkbox(&form.require_strong_passwords);
    settings.security.max_login_attempts = parse_or(&form.max_login_attempts, 5).max(1);

    settings
}

/// POST /admin/settings
pub async fn update(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<SettingsForm>,
) -> Response {
    let session_id = current.session_id;
    let settings = apply_form(form, Settings::default());

    let flash = match state.settings().save(&settings).await {
        Ok(()) => FlashMessage::success("Settings updated successfully"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to save settings");
            FlashMessage::error("Error saving settings")
        }
    };
    flash_redirect(&state, session_id, flash, "/admin/settings").await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_form() -> SettingsForm {
        SettingsForm {
            site_title: None,
            site_description: None,
            site_keywords: None,
            contact_email: None,
            facebook: None,
            instagram: None,
            twitter: None,
            youtube: None,
            default_post_status: None,
            posts_per_page: None,
            comments_enabled: None,
            moderate_comments: None,
            allow_guest_comments: None,
            max_file_size: None,
            allowed_image_types: None,
            allowed_doc_types: None,
            session_timeout: None,
            password_min_length: None,
            require_strong_passwords: None,
            max_login_attempts: None,
        }
    }

    #[test]
    fn empty_form_keeps_defaults_except_checkboxes() {
        let settings = apply_form(empty_form(), Settings::default());
        assert_eq!(settings.site.title, "PromontolioBlog");
        assert_eq!(settings.content.posts_per_page, 10);
        // Unticked checkboxes read as false.
        assert!(!settings.content.comments_enabled);
    }

    #[test]
    fn form_values_override_defaults() {
        let mut form = empty_form();
        form.site_title = Some("Nuovo Blog".into());
        form.posts_per_page = Some("25".into());
        form.comments_enabled = Some("on".into());
        form.allowed_image_types = Some("jpg, png".into());

        let settings = apply_form(form, Settings::default());
        assert_eq!(settings.site.title, "Nuovo Blog");
        assert_eq!(settings.content.posts_per_page, 25);
        assert!(settings.content.comments_enabled);
        assert_eq!(settings.uploads.allowed_image_types, vec!["jpg", "png"]);
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let mut form = empty_form();
        form.posts_per_page = Some("lots".into());
        form.max_file_size = Some("-3".into());

        let settings = apply_form(form, Settings::default());
        assert_eq!(settings.content.posts_per_page, 10);
        // Negative values fail the u32 parse and fall back too.
        assert_eq!(settings.uploads.max_file_size, 5);
    }

    #[test]
    fn invalid_default_status_is_ignored() {
        let mut form = empty_form();
        form.default_post_status = Some("archived".into());
        let settings = apply_form(form, Settings::default());
        assert_eq!(settings.content.default_post_status, "draft");
    }
}
