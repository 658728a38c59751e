//! Media library handlers: library page, uploads, metadata API, bulk
//! operations, and the rich-text editor feed.

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::api::dto::Pagination;
use crate::api::flash::{flash_redirect, take_flash};
use crate::api::handlers::{none_if_empty, wants_json};
use crate::api::middleware::session::{CurrentUser, SessionContext};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::media::{Media, MediaCategory};
use crate::models::session::FlashMessage;
use crate::policy::{self, Action};
use crate::services::media_service::{
    CategoryStat, MediaListFilter, MediaSort, UploadMetadata, UploadedFile,
};
use crate::views::View;

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
struct LibraryFilters {
    category: Option<MediaCategory>,
    search: Option<String>,
    sort: String,
    limit: u32,
}

#[derive(Debug, Serialize)]
struct LibraryContext {
    title: &'static str,
    username: String,
    media: Vec<Media>,
    stats: Vec<CategoryStat>,
    total_size: i64,
    pagination: Pagination,
    filters: LibraryFilters,
    flash: Vec<FlashMessage>,
    error: Option<&'static str>,
}

/// GET /admin/media
pub async fn library(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<LibraryQuery>,
) -> Result<View> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.limit.unwrap_or(20).clamp(1, 100);
    let sort_raw = query.sort.unwrap_or_else(|| "newest".into());

    let filter = MediaListFilter {
        category: query
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .and_then(MediaCategory::parse),
        search: none_if_empty(query.search),
        sort: MediaSort::parse(&sort_raw),
    };

    let service = state.media();
    let flash = take_flash(&state, context.as_ref()).await;

    // A failed query degrades to an empty library with an error flag.
    let (media, total, stats, total_size, error) = match service.list(&filter, page, per_page).await
    {
        Ok((media, total)) => match service.stats().await {
            Ok((stats, total_size)) => (media, total, stats, total_size, None),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load media stats");
                (media, total, Vec::new(), 0, None)
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to load media library");
            (Vec::new(), 0, Vec::new(), 0, Some("Unable to load media."))
        }
    };

    View::render(
        state.views.clone(),
        "admin/mediaLibrary",
        &LibraryContext {
            title: "Media Library",
            username: current.user.username,
            media,
            stats,
            total_size,
            pagination: Pagination::new(page, per_page, total),
            filters: LibraryFilters {
                category: filter.category,
                search: filter.search,
                sort: sort_raw,
                limit: per_page,
            },
            flash,
            error,
        },
    )
}

#[derive(Debug, Serialize)]
struct UploadFormContext {
    title: &'static str,
    username: String,
    flash: Vec<FlashMessage>,
}

/// GET /admin/media/upload
pub async fn upload_form(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<View> {
    let flash = take_flash(&state, context.as_ref()).await;
    View::render(
        state.views.clone(),
        "admin/mediaUpload",
        &UploadFormContext {
            title: "Upload Media",
            username: current.user.username,
            flash,
        },
    )
}

/// POST /admin/media/upload — single or multiple files in one multipart
/// request. Metadata fields apply to every file in the batch.
pub async fn upload(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let session_id = current.session_id;

    let mut files: Vec<UploadedFile> = Vec::new();
    let mut metadata = UploadMetadata::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return upload_failure(
                    &state,
                    session_id,
                    &headers,
                    AppError::Validation(e.to_string()),
                )
                .await;
            }
        };

        let name = field.name().unwrap_or("").to_string();
        if let Some(original_name) = field.file_name().map(str::to_string) {
            let mime_type = field.content_type().unwrap_or("").to_string();
            match field.bytes().await {
                Ok(content) => files.push(UploadedFile {
                    original_name,
                    mime_type,
                    content,
                }),
                Err(e) => {
                    return upload_failure(
                        &state,
                        session_id,
                        &headers,
                        AppError::Validation(e.to_string()),
                    )
                    .await;
                }
            }
        } else {
            let value = match field.text().await {
                Ok(value) => value,
                Err(e) => {
                    return upload_failure(
                        &state,
                        session_id,
                        &headers,
                        AppError::Validation(e.to_string()),
                    )
                    .await;
                }
            };
            match name.as_str() {
                "title" => metadata.title = none_if_empty(Some(value)),
                "alt" => metadata.alt = none_if_empty(Some(value)),
                "description" => metadata.description = none_if_empty(Some(value)),
                "tags" => metadata.tags = none_if_empty(Some(value)),
                _ => {}
            }
        }
    }

    if files.is_empty() {
        return upload_failure(
            &state,
            session_id,
            &headers,
            AppError::Validation("No file was uploaded".into()),
        )
        .await;
    }

    let service = state.media();
    let mut stored = Vec::new();
    for file in files {
        match service.ingest(current.user.id, file, &metadata).await {
            Ok(media) => stored.push(media),
            Err(e) => return upload_failure(&state, session_id, &headers, e).await,
        }
    }

    let message = if stored.len() == 1 {
        format!("File \"{}\" uploaded successfully!", stored[0].original_name)
    } else {
        format!("{} files uploaded successfully!", stored.len())
    };

    if wants_json(&headers) {
        return Json(json!({
            "success": true,
            "message": message,
            "media": stored,
        }))
        .into_response();
    }

    flash_redirect(
        &state,
        session_id,
        FlashMessage::success(message),
        "/admin/media",
    )
    .await
}

async fn upload_failure(
    state: &SharedState,
    session_id: Uuid,
    headers: &HeaderMap,
    err: AppError,
) -> Response {
    tracing::warn!(error = %err, "Media upload failed");

    let (status, message) = match &err {
        AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error uploading file".to_string(),
        ),
    };

    if wants_json(headers) {
        return (
            status,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response();
    }

    flash_redirect(
        state,
        session_id,
        FlashMessage::error(message),
        "/admin/media/upload",
    )
    .await
}

#[derive(Debug, Serialize)]
struct MediaDetailsContext {
    title: &'static str,
    username: String,
    media: Media,
    uploaded_by: Option<String>,
    flash: Vec<FlashMessage>,
}

/// GET /admin/media/:id — details page
pub async fn details_view(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Response {
    let media = match state.media().get(id).await {
        Ok(media) => media,
        Err(_) => {
            let flash = FlashMessage::error("Media not found");
            return flash_redirect(&state, current.session_id, flash, "/admin/media").await;
        }
    };

    let uploaded_by = match state.users().get(media.uploaded_by).await {
        Ok(user) => Some(user.username),
        Err(_) => None,
    };

    let flash = take_flash(&state, context.as_ref()).await;
    let view = View::render(
        state.views.clone(),
        "admin/mediaDetails",
        &MediaDetailsContext {
            title: "Media Details",
            username: current.user.username,
            media,
            uploaded_by,
            flash,
        },
    );
    match view {
        Ok(view) => view.into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /admin/media/api/:id
pub async fn api_details(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.media().get(id).await {
        Ok(media) => Json(json!({ "success": true, "media": media })).into_response(),
        Err(AppError::NotFound(_)) => media_not_found(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load media details");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Error retrieving media details" })),
            )
                .into_response()
        }
    }
}

fn media_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Media not found" })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct UpdateMediaRequest {
    pub title: Option<String>,
    pub alt: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
}

/// PUT /admin/media/api/:id
pub async fn api_update(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMediaRequest>,
) -> Response {
    match state
        .media()
        .update_details(id, payload.title, payload.alt, payload.description, payload.tags)
        .await
    {
        Ok(media) => {
            if let Err(e) = state
                .auth()
                .push_flash(
                    current.session_id,
                    FlashMessage::success("Media details updated successfully!"),
                )
                .await
            {
                tracing::error!(error = %e, "Failed to record flash");
            }
            Json(json!({
                "success": true,
                "message": "Media updated successfully",
                "media": media,
            }))
            .into_response()
        }
        Err(AppError::NotFound(_)) => media_not_found(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update media");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Error updating media" })),
            )
                .into_response()
        }
    }
}

/// DELETE /admin/media/api/:id — removes the record, the file, and the
/// thumbnail. Admin-gated.
pub async fn api_delete(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    if !policy::is_allowed(current.role(), Action::DeleteMedia) {
        return Err(AppError::Authorization(
            "Admin privileges required to delete media".into(),
        ));
    }

    match state.media().delete(id).await {
        Ok(_) => Ok(Json(json!({
            "success": true,
            "message": "Media deleted successfully",
        }))
        .into_response()),
        Err(AppError::NotFound(_)) => Ok(media_not_found()),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub operation: String,
    pub media_ids: Vec<Uuid>,
    pub category: Option<String>,
}

/// POST /admin/media/bulk — bulk delete or category update. Admin-gated.
pub async fn bulk(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<BulkRequest>,
) -> Result<Response> {
    if !policy::is_allowed(current.role(), Action::BulkEditMedia) {
        return Err(AppError::Authorization(
            "Admin privileges required for bulk operations".into(),
        ));
    }

    if payload.media_ids.is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "No media selected" })),
        )
            .into_response());
    }

    let service = state.media();
    let (message, result) = match payload.operation.as_str() {
        "delete" => {
            let deleted = service.bulk_delete(&payload.media_ids).await?;
            (
                format!("{} media files deleted successfully!", deleted),
                json!({ "deleted": deleted }),
            )
        }
        "updateCategory" => {
            let category = payload
                .category
                .as_deref()
                .and_then(MediaCategory::parse)
                .ok_or_else(|| AppError::Validation("Invalid category".into()))?;
            let modified = service
                .bulk_update_category(&payload.media_ids, category)
                .await?;
            (
                format!("{} media files updated successfully!", modified),
                json!({ "modified": modified }),
            )
        }
        _ => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": "Invalid operation" })),
            )
                .into_response());
        }
    };

    if let Err(e) = state
        .auth()
        .push_flash(current.session_id, FlashMessage::success(message.clone()))
        .await
    {
        tracing::error!(error = %e, "Failed to record flash");
    }

    Ok(Json(json!({
        "success": true,
        "message": message,
        "result": result,
    }))
    .into_response())
}

/// POST /admin/media/api/:id/usage — record one embed of this media item.
pub async fn api_increment_usage(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.media().increment_usage(id).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(AppError::NotFound(_)) => media_not_found(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to increment media usage");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Error updating media" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditorFeedQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

/// GET /admin/media/api/editor/images — feed for the rich-text editor's
/// image picker. Always answers with an array.
pub async fn editor_images(
    State(state): State<SharedState>,
    Query(query): Query<EditorFeedQuery>,
) -> Response {
    let category = query
        .category
        .as_deref()
        .and_then(MediaCategory::parse)
        .unwrap_or(MediaCategory::Image);

    match state
        .media()
        .editor_feed(category, query.search.as_deref())
        .await
    {
        Ok(items) => Json(items).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load editor media feed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Vec::<serde_json::Value>::new()))
                .into_response()
        }
    }
}
