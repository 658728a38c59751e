//! Media library model and MIME classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Media category, inferred from the MIME type at upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "media_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Document,
    Video,
    Audio,
    Other,
}

impl MediaCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Document => "document",
            MediaCategory::Video => "video",
            MediaCategory::Audio => "audio",
            MediaCategory::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<MediaCategory> {
        match value {
            "image" => Some(MediaCategory::Image),
            "document" => Some(MediaCategory::Document),
            "video" => Some(MediaCategory::Video),
            "audio" => Some(MediaCategory::Audio),
            "other" => Some(MediaCategory::Other),
            _ => None,
        }
    }

    /// Subdirectory of the media root holding files of this category.
    pub fn storage_dir(self) -> &'static str {
        match self {
            MediaCategory::Image => "images",
            MediaCategory::Document => "documents",
            MediaCategory::Video => "videos",
            MediaCategory::Audio => "audio",
            MediaCategory::Other => "documents",
        }
    }
}

/// Uploaded-file MIME types accepted by the media pipeline.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    // Images
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    // Documents
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/plain",
    "text/csv",
    // Videos
    "video/mp4",
    "video/webm",
    "video/ogg",
    // Audio
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
];

/// Whether the MIME type is on the upload allow-list.
pub fn is_allowed_mime(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}

/// Infer the library category from a MIME type.
pub fn categorize_mime(mime_type: &str) -> MediaCategory {
    if mime_type.starts_with("image/") {
        MediaCategory::Image
    } else if mime_type.starts_with("video/") {
        MediaCategory::Video
    } else if mime_type.starts_with("audio/") {
        MediaCategory::Audio
    } else {
        MediaCategory::Document
    }
}

/// Media entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Media {
    pub id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub url: String,
    pub category: MediaCategory,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub uploaded_by: Uuid,
    pub usage_count: i64,
    pub tags: Vec<String>,
    pub title: String,
    pub alt: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_accepts_known_types() {
        assert!(is_allowed_mime("image/png"));
        assert!(is_allowed_mime("application/pdf"));
        assert!(is_allowed_mime("video/webm"));
        assert!(is_allowed_mime("audio/wav"));
    }

    #[test]
    fn allow_list_rejects_unknown_types() {
        assert!(!is_allowed_mime("application/x-msdownload"));
        assert!(!is_allowed_mime("text/html"));
        assert!(!is_allowed_mime(""));
    }

    #[test]
    fn categorize_by_mime_prefix() {
        assert_eq!(categorize_mime("image/jpeg"), MediaCategory::Image);
        assert_eq!(categorize_mime("video/mp4"), MediaCategory::Video);
        assert_eq!(categorize_mime("audio/ogg"), MediaCategory::Audio);
        assert_eq!(categorize_mime("application/pdf"), MediaCategory::Document);
        assert_eq!(categorize_mime("text/csv"), MediaCategory::Document);
    }

    #[test]
    fn storage_dirs_are_type_partitioned() {
        assert_eq!(MediaCategory::Image.storage_dir(), "images");
        assert_eq!(MediaCategory::Video.storage_dir(), "videos");
        assert_eq!(MediaCategory::Audio.storage_dir(), "audio");
        assert_eq!(MediaCategory::Document.storage_dir(), "documents");
    }
}
