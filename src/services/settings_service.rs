//! Site settings persisted as a JSON document on disk.
//!
//! Unknown or missing keys fall back to defaults through `#[serde(default)]`,
//! so a hand-edited or older settings file merges cleanly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Site-wide settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub site: SiteSettings,
    pub content: ContentSettings,
    pub uploads: UploadSettings,
    pub security: SecuritySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub contact_email: String,
    pub social_media: SocialMedia,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            title: "PromontolioBlog".into(),
            description: "Professional blog about olive oil and the Gargano region".into(),
            keywords: "olive oil, Gargano, Promontolio, extra virgin".into(),
            contact_email: "info@promontolioblog.com".into(),
            social_media: SocialMedia::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SocialMedia {
    pub facebook: String,
    pub instagram: String,
    pub twitter: String,
    pub youtube: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSettings {
    pub default_post_status: String,
    pub posts_per_page: u32,
    pub comments_enabled: bool,
    pub moderate_comments: bool,
    pub allow_guest_comments: bool,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            default_post_status: "draft".into(),
            posts_per_page: 10,
            comments_enabled: true,
            moderate_comments: true,
            allow_guest_comments: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Maximum upload size in megabytes
    pub max_file_size: u32,
    pub allowed_image_types: Vec<String>,
    pub allowed_doc_types: Vec<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_file_size: 5,
            allowed_image_types: vec!["jpg".into(), "jpeg".into(), "png".into(), "webp".into()],
            allowed_doc_types: vec!["pdf".into(), "doc".into(), "docx".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Session lifetime in hours
    pub session_timeout: u32,
    pub password_min_length: u32,
    pub require_strong_passwords: bool,
    pub max_login_attempts: u32,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            session_timeout: 24,
            password_min_length: 6,
            require_strong_passwords: false,
            max_login_attempts: 5,
        }
    }
}

/// Settings service
pub struct SettingsService {
    path: PathBuf,
}

impl SettingsService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load settings; a missing or unreadable file yields the defaults.
    pub async fn load(&self) -> Settings {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Malformed settings file, using defaults");
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    /// Persist settings, creating the parent directory on first save.
    pub async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = Path::new(&self.path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to save settings: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let settings = Settings::default();
        assert_eq!(settings.site.title, "PromontolioBlog");
        assert_eq!(settings.content.posts_per_page, 10);
        assert_eq!(settings.content.default_post_status, "draft");
        assert_eq!(settings.uploads.max_file_size, 5);
        assert_eq!(settings.security.session_timeout, 24);
        assert_eq!(settings.security.max_login_attempts, 5);
    }

    #[test]
    fn partial_document_merges_over_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"content": {"posts_per_page": 25}}"#).unwrap();
        assert_eq!(settings.content.posts_per_page, 25);
        // Everything not present keeps its default.
        assert_eq!(settings.content.default_post_status, "draft");
        assert_eq!(settings.site.title, "PromontolioBlog");
        assert_eq!(settings.uploads.allowed_doc_types.len(), 3);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let mut settings = Settings::default();
        settings.site.title = "Another Site".into();
        settings.security.require_strong_passwords = true;

        let raw = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, settings);
    }

    #[tokio::test]
    async fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = SettingsService::new(dir.path().join("settings.json"));
        assert_eq!(service.load().await, Settings::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let service = SettingsService::new(dir.path().join("config/settings.json"));

        let mut settings = Settings::default();
        settings.content.posts_per_page = 7;
        service.save(&settings).await.unwrap();

        assert_eq!(service.load().await.content.posts_per_page, 7);
    }
}
