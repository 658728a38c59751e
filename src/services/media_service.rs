//! Media library service: the upload pipeline, library queries, metadata
//! edits, and deletion of records together with their backing files.

use bytes::Bytes;
use chrono::Utc;
use image::imageops::FilterType;
use image::ImageReader;
use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::media::{categorize_mime, is_allowed_mime, Media, MediaCategory};
use crate::storage::MediaStore;

/// Pixel size of the square cover-cropped thumbnail.
const THUMBNAIL_SIZE: u32 = 300;
const THUMBNAIL_JPEG_QUALITY: u8 = 80;

/// Media service
pub struct MediaService {
    db: PgPool,
    store: Arc<dyn MediaStore>,
}

/// One file pulled out of the multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub content: Bytes,
}

/// Optional metadata fields accompanying an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub alt: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
}

/// Library list filters.
#[derive(Debug, Clone, Default)]
pub struct MediaListFilter {
    pub category: Option<MediaCategory>,
    pub search: Option<String>,
    pub sort: MediaSort,
}

/// Library sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaSort {
    #[default]
    Newest,
    Oldest,
    Name,
    Size,
    Usage,
}

impl MediaSort {
    pub fn parse(value: &str) -> MediaSort {
        match value {
            "oldest" => MediaSort::Oldest,
            "name" => MediaSort::Name,
            "size" => MediaSort::Size,
            "usage" => MediaSort::Usage,
            _ => MediaSort::Newest,
        }
    }

    fn order_clause(self) -> &'static str {
        match self {
            MediaSort::Newest => "created_at DESC",
            MediaSort::Oldest => "created_at ASC",
            MediaSort::Name => "original_name ASC",
            MediaSort::Size => "size_bytes DESC",
            MediaSort::Usage => "usage_count DESC",
        }
    }
}

/// Per-category count/size rollup for the library sidebar.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryStat {
    pub category: MediaCategory,
    pub count: i64,
    pub total_size: i64,
}

/// Entry of the rich-text editor image feed.
#[derive(Debug, Clone, Serialize)]
pub struct EditorImage {
    pub title: String,
    pub value: String,
    pub meta: EditorImageMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditorImageMeta {
    pub alt: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Generate a collision-resistant stored filename: sanitized base name
/// (up to 50 chars), epoch-millis timestamp, random suffix, original
/// extension. Concurrent uploads of the same file land on distinct names
/// without any locking.
pub fn generate_filename(original_name: &str, now_millis: i64, random_suffix: u32) -> String {
    let path = Path::new(original_name);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let base: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .take(50)
        .collect();

    format!("{}-{}-{}{}", base, now_millis, random_suffix, extension)
}

/// Thumbnail filename convention: `thumb-<stored filename>`.
pub fn thumbnail_key(filename: &str) -> String {
    format!("thumbnails/thumb-{}", filename)
}

/// Split a comma-separated tag field into trimmed, non-empty tags.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Decode dimensions and produce the cover-cropped JPEG thumbnail.
/// Runs on the blocking pool; a failure here must not sink the upload.
fn process_image(content: &[u8]) -> Result<((i32, i32), Vec<u8>)> {
    let img = ImageReader::new(Cursor::new(content))
        .with_guessed_format()
        .map_err(|e| AppError::Storage(format!("Failed to read image: {}", e)))?
        .decode()
        .map_err(|e| AppError::Storage(format!("Failed to decode image: {}", e)))?;

    let dimensions = (img.width() as i32, img.height() as i32);

    let thumb = img.resize_to_fill(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3);
    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
        &mut out,
        THUMBNAIL_JPEG_QUALITY,
    );
    thumb
        .into_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| AppError::Storage(format!("Failed to encode thumbnail: {}", e)))?;

    Ok((dimensions, out))
}

impl MediaService {
    pub fn new(db: PgPool, store: Arc<dyn MediaStore>) -> Self {
        Self { db, store }
    }

    pub async fn get(&self, id: Uuid) -> Result<Media> {
        sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Media not found".into()))
    }

    /// Run one file through the pipeline: allow-list check, stored name
    /// generation, file write, image post-processing, metadata row insert.
    /// A failed insert removes the just-written file.
    pub async fn ingest(
        &self,
        uploaded_by: Uuid,
        file: UploadedFile,
        metadata: &UploadMetadata,
    ) -> Result<Media> {
        if !is_allowed_mime(&file.mime_type) {
            return Err(AppError::Validation(format!(
                "File type {} is not allowed",
                file.mime_type
            )));
        }

        let category = categorize_mime(&file.mime_type);
        let now = Utc::now();
        let filename = generate_filename(
            &file.original_name,
            now.timestamp_millis(),
            rand::rng().random_range(0..1_000_000_000),
        );
        let storage_key = format!("{}/{}", category.storage_dir(), filename);
        let url = format!("/media/{}", storage_key);

        self.store.put(&storage_key, file.content.clone()).await?;

        // Images additionally get dimensions extracted and a thumbnail
        // written next to the original.
        let mut dimensions = None;
        if category == MediaCategory::Image {
            let content = file.content.clone();
            match tokio::task::spawn_blocking(move || process_image(&content))
                .await
                .map_err(|e| AppError::Internal(format!("Image task panicked: {}", e)))?
            {
                Ok((dims, thumb)) => {
                    dimensions = Some(dims);
                    self.store
                        .put(&thumbnail_key(&filename), Bytes::from(thumb))
                        .await?;
                }
                Err(err) => {
                    // SVG and friends: keep the upload, skip the thumbnail.
                    tracing::warn!(filename = %filename, error = %err, "Image processing failed");
                }
            }
        }

        let title = metadata
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| file.original_name.clone());
        let tags = metadata.tags.as_deref().map(parse_tags).unwrap_or_default();

        let insert = sqlx::query_as::<_, Media>(
            r#"
            INSERT INTO media
                (id, filename, original_name, mime_type, size_bytes, storage_path,
                 url, category, width, height, uploaded_by, tags, title, alt,
                 description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&filename)
        .bind(&file.original_name)
        .bind(&file.mime_type)
        .bind(file.content.len() as i64)
        .bind(&storage_key)
        .bind(&url)
        .bind(category)
        .bind(dimensions.map(|(w, _)| w))
        .bind(dimensions.map(|(_, h)| h))
        .bind(uploaded_by)
        .bind(&tags)
        .bind(&title)
        .bind(metadata.alt.clone().unwrap_or_default())
        .bind(metadata.description.clone().unwrap_or_default())
        .bind(now)
        .fetch_one(&self.db)
        .await;

        match insert {
            Ok(media) => {
                tracing::info!(filename = %media.filename, category = ?media.category, "Media uploaded");
                Ok(media)
            }
            Err(e) => {
                // Don't leave an orphan file behind.
                let _ = self.store.delete(&storage_key).await;
                if category == MediaCategory::Image {
                    let _ = self.store.delete(&thumbnail_key(&filename)).await;
                }
                Err(e.into())
            }
        }
    }

    /// Library listing with filters and pagination.
    pub async fn list(
        &self,
        filter: &MediaListFilter,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<Media>, i64)> {
        let search_pattern = filter.search.as_ref().map(|s| format!("%{}%", s));
        let offset = ((page.max(1) - 1) * per_page) as i64;

        // Sort order comes from a fixed enum, never from request text.
        let query = format!(
            r#"
            SELECT * FROM media
            WHERE ($1::media_category IS NULL OR category = $1)
              AND ($2::text IS NULL
                   OR original_name ILIKE $2 OR title ILIKE $2
                   OR description ILIKE $2
                   OR EXISTS (SELECT 1 FROM unnest(tags) tag WHERE tag ILIKE $2))
            ORDER BY {}
            OFFSET $3 LIMIT $4
            "#,
            filter.sort.order_clause()
        );

        let items = sqlx::query_as::<_, Media>(&query)
            .bind(filter.category)
            .bind(&search_pattern)
            .bind(offset)
            .bind(per_page as i64)
            .fetch_all(&self.db)
            .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM media
            WHERE ($1::media_category IS NULL OR category = $1)
              AND ($2::text IS NULL
                   OR original_name ILIKE $2 OR title ILIKE $2
                   OR description ILIKE $2
                   OR EXISTS (SELECT 1 FROM unnest(tags) tag WHERE tag ILIKE $2))
            "#,
        )
        .bind(filter.category)
        .bind(&search_pattern)
        .fetch_one(&self.db)
        .await?;

        Ok((items, total))
    }

    /// Per-category statistics plus the overall byte total.
    pub async fn stats(&self) -> Result<(Vec<CategoryStat>, i64)> {
        let stats = sqlx::query_as::<_, CategoryStat>(
            r#"
            SELECT category, COUNT(*) AS count, COALESCE(SUM(size_bytes), 0)::BIGINT AS total_size
            FROM media
            GROUP BY category
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let (total_size,): (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(size_bytes), 0)::BIGINT FROM media")
                .fetch_one(&self.db)
                .await?;

        Ok((stats, total_size))
    }

    /// Metadata edit; empty fields keep their current value.
    pub async fn update_details(
        &self,
        id: Uuid,
        title: Option<String>,
        alt: Option<String>,
        description: Option<String>,
        tags: Option<String>,
    ) -> Result<Media> {
        let media = sqlx::query_as::<_, Media>(
            r#"
            UPDATE media
            SET title = COALESCE(NULLIF($2, ''), title),
                alt = COALESCE($3, alt),
                description = COALESCE($4, description),
                tags = COALESCE($5, tags),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title.unwrap_or_default())
        .bind(alt)
        .bind(description)
        .bind(tags.as_deref().map(parse_tags))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Media not found".into()))?;

        Ok(media)
    }

    /// Delete the record and its backing file(s). Missing physical files
    /// are tolerated; the record removal is what must succeed.
    pub async fn delete(&self, id: Uuid) -> Result<Media> {
        let media = self.get(id).await?;

        self.store.delete(&media.storage_path).await?;
        if media.category == MediaCategory::Image {
            self.store.delete(&thumbnail_key(&media.filename)).await?;
        }

        sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(filename = %media.filename, "Media deleted");
        Ok(media)
    }

    /// Bulk delete; returns how many records were removed.
    pub async fn bulk_delete(&self, ids: &[Uuid]) -> Result<u64> {
        let items = sqlx::query_as::<_, Media>("SELECT * FROM media WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.db)
            .await?;

        for media in &items {
            self.store.delete(&media.storage_path).await?;
            if media.category == MediaCategory::Image {
                self.store.delete(&thumbnail_key(&media.filename)).await?;
            }
        }

        let result = sqlx::query("DELETE FROM media WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// Bulk category reassignment; returns how many records changed.
    pub async fn bulk_update_category(
        &self,
        ids: &[Uuid],
        category: MediaCategory,
    ) -> Result<u64> {
        let result =
            sqlx::query("UPDATE media SET category = $2, updated_at = now() WHERE id = ANY($1)")
                .bind(ids)
                .bind(category)
                .execute(&self.db)
                .await?;

        Ok(result.rows_affected())
    }

    /// Record one use of a media item (e.g. embedded into an article).
    pub async fn increment_usage(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE media SET usage_count = usage_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Media not found".into()));
        }
        Ok(())
    }

    /// Image feed for the rich-text editor picker.
    pub async fn editor_feed(
        &self,
        category: MediaCategory,
        search: Option<&str>,
    ) -> Result<Vec<EditorImage>> {
        let search_pattern = search.map(|s| format!("%{}%", s));

        let items = sqlx::query_as::<_, Media>(
            r#"
            SELECT * FROM media
            WHERE category = $1
              AND ($2::text IS NULL
                   OR original_name ILIKE $2 OR title ILIKE $2 OR alt ILIKE $2)
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(category)
        .bind(&search_pattern)
        .fetch_all(&self.db)
        .await?;

        Ok(items
            .into_iter()
            .map(|m| EditorImage {
                title: if m.title.is_empty() {
                    m.original_name.clone()
                } else {
                    m.title.clone()
                },
                value: m.url,
                meta: EditorImageMeta {
                    alt: m.alt,
                    width: m.width,
                    height: m.height,
                },
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_sanitize_and_keep_extension() {
        let name = generate_filename("Frantoio Report (final).PDF", 1_700_000_000_000, 42);
        assert_eq!(name, "Frantoio-Report--final--1700000000000-42.pdf");
    }

    #[test]
    fn filenames_truncate_long_bases() {
        let long = format!("{}.png", "a".repeat(80));
        let name = generate_filename(&long, 1, 2);
        assert!(name.starts_with(&"a".repeat(50)));
        assert!(name.ends_with("-1-2.png"));
    }

    #[test]
    fn filenames_without_extension() {
        let name = generate_filename("README", 5, 6);
        assert_eq!(name, "README-5-6");
    }

    #[test]
    fn distinct_suffixes_give_distinct_names() {
        let a = generate_filename("photo.jpg", 1_700_000_000_000, 1);
        let b = generate_filename("photo.jpg", 1_700_000_000_000, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn thumbnail_key_convention() {
        assert_eq!(
            thumbnail_key("photo-17-9.jpg"),
            "thumbnails/thumb-photo-17-9.jpg"
        );
    }

    #[test]
    fn tags_parse_trimmed_and_nonempty() {
        assert_eq!(
            parse_tags("olive, harvest , , oil"),
            vec!["olive", "harvest", "oil"]
        );
        assert!(parse_tags("  ").is_empty());
    }

    #[test]
    fn media_sort_parses_known_values() {
        assert_eq!(MediaSort::parse("oldest"), MediaSort::Oldest);
        assert_eq!(MediaSort::parse("usage"), MediaSort::Usage);
        assert_eq!(MediaSort::parse("bogus"), MediaSort::Newest);
    }

    #[test]
    fn process_image_extracts_dimensions_and_thumbnail() {
        // 4x2 solid-color PNG built in memory.
        let mut png = Vec::new();
        let img = image::RgbImage::from_pixel(4, 2, image::Rgb([120, 80, 40]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let ((w, h), thumb) = process_image(&png).unwrap();
        assert_eq!((w, h), (4, 2));

        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!(decoded.width(), THUMBNAIL_SIZE);
        assert_eq!(decoded.height(), THUMBNAIL_SIZE);
    }

    #[test]
    fn process_image_rejects_non_image_bytes() {
        assert!(process_image(b"not an image at all").is_err());
    }
}
