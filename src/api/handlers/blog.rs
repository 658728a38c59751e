//! Blog handlers: public list/article views and the admin CRUD panel.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::dto::Pagination;
use crate::api::flash::{flash_redirect, take_flash};
use crate::api::handlers::none_if_empty;
use crate::api::middleware::session::{CurrentUser, SessionContext};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::article::{Article, ArticleCategory, ArticleStatus};
use crate::models::session::FlashMessage;
use crate::services::article_service::{ArticleInput, SubmitAction};
use crate::views::View;

/// Article fields exposed to list views.
#[derive(Debug, Serialize)]
struct ArticleSummary {
    id: Uuid,
    title: String,
    slug: String,
    excerpt: Option<String>,
    status: ArticleStatus,
    category: ArticleCategory,
    featured_image_url: Option<String>,
    author: Option<String>,
    view_count: i64,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ArticleSummary {
    fn from_row((article, author): (Article, Option<String>)) -> Self {
        Self {
            id: article.id,
            title: article.title,
            slug: article.slug,
            excerpt: article.excerpt,
            status: article.status,
            category: article.category,
            featured_image_url: article.featured_image_url,
            author,
            view_count: article.view_count,
            published_at: article.published_at,
            created_at: article.created_at,
        }
    }
}

/* ── Public handlers ─────────────────────────────────────────────────── */

#[derive(Debug, Serialize)]
struct BlogListContext {
    title: &'static str,
    articles: Vec<ArticleSummary>,
    pagination: Pagination,
    flash: Vec<FlashMessage>,
    error: Option<&'static str>,
}

async fn render_blog_page(
    state: &SharedState,
    context: Option<&SessionContext>,
    page: u32,
) -> Result<View> {
    let flash = take_flash(state, context).await;
    let per_page = state.settings().load().await.content.posts_per_page.max(1);

    let (articles, pagination, error) =
        match state.articles().published_page(page, per_page).await {
            Ok((rows, total)) => (
                rows.into_iter().map(ArticleSummary::from_row).collect(),
                Pagination::new(page, per_page, total),
                None,
            ),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load blog list");
                (
                    Vec::new(),
                    Pagination::new(page, per_page, 0),
                    Some("Unable to load articles."),
                )
            }
        };

    View::render(
        state.views.clone(),
        "blog",
        &BlogListContext {
            title: "Blog",
            articles,
            pagination,
            flash,
            error,
        },
    )
}

/// GET /blog
pub async fn list(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
) -> Result<View> {
    render_blog_page(&state, context.as_ref(), 1).await
}

/// GET /blog/page/:page
pub async fn list_page(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Path(page): Path<u32>,
) -> Result<View> {
    render_blog_page(&state, context.as_ref(), page.max(1)).await
}

#[derive(Debug, Serialize)]
struct SingleArticleContext {
    title: String,
    meta_description: Option<String>,
    keywords: Option<String>,
    article: ArticleView,
}

#[derive(Debug, Serialize)]
struct ArticleView {
    title: String,
    slug: String,
    content: String,
    excerpt: Option<String>,
    category: ArticleCategory,
    featured_image_url: Option<String>,
    author: Option<String>,
    view_count: i64,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct NotFoundContext {
    title: &'static str,
}

/// GET /blog/:slug — public single-article view. Each render counts as one
/// view, reloads included.
pub async fn view(State(state): State<SharedState>, Path(slug): Path<String>) -> Response {
    match state.articles().view_published(&slug).await {
        Ok((article, author)) => {
            let context = SingleArticleContext {
                title: article.title.clone(),
                meta_description: article.meta_description.clone(),
                keywords: article.keywords.clone(),
                article: ArticleView {
                    title: article.title,
                    slug: article.slug,
                    content: article.content,
                    excerpt: article.excerpt,
                    category: article.category,
                    featured_image_url: article.featured_image_url,
                    author,
                    view_count: article.view_count,
                    published_at: article.published_at,
                },
            };
            match View::render(state.views.clone(), "blogSingleArticle", &context) {
                Ok(view) => view.into_response(),
                Err(e) => e.into_response(),
            }
        }
        Err(AppError::NotFound(_)) => render_not_found(&state, StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(error = %e, slug, "Failed to load blog post");
            render_not_found(&state, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn render_not_found(state: &SharedState, status: StatusCode) -> Response {
    match View::render(
        state.views.clone(),
        "404",
        &NotFoundContext {
            title: "Post Not Found",
        },
    ) {
        Ok(view) => view.with_status(status).into_response(),
        Err(e) => e.into_response(),
    }
}

/* ── Admin handlers ──────────────────────────────────────────────────── */

#[derive(Debug, Serialize)]
struct AdminListContext {
    title: &'static str,
    username: String,
    articles: Vec<ArticleSummary>,
    flash: Vec<FlashMessage>,
    error: Option<&'static str>,
}

/// GET /admin/blog
pub async fn admin_list(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<View> {
    let flash = take_flash(&state, context.as_ref()).await;

    let (articles, error) = match state.articles().admin_list().await {
        Ok(rows) => (
            rows.into_iter().map(ArticleSummary::from_row).collect(),
            None,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load admin article list");
            (Vec::new(), Some("Unable to load articles."))
        }
    };

    View::render(
        state.views.clone(),
        "admin/blogList",
        &AdminListContext {
            title: "Manage Articles",
            username: current.user.username,
            articles,
            flash,
            error,
        },
    )
}

#[derive(Debug, Serialize)]
struct ArticleFormContext {
    title: &'static str,
    username: String,
    article: Option<Article>,
    flash: Vec<FlashMessage>,
}

/// GET /admin/blog/new
pub async fn new_form(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<View> {
    let flash = take_flash(&state, context.as_ref()).await;
    View::render(
        state.views.clone(),
        "admin/blogForm",
        &ArticleFormContext {
            title: "Create New Article",
            username: current.user.username,
            article: None,
            flash,
        },
    )
}

/// Article form payload. `action` distinguishes "publish" from
/// "save as draft".
#[derive(Debug, Deserialize)]
pub struct ArticleForm {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub featured_image_url: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<String>,
    pub action: Option<String>,
}

impl ArticleForm {
    fn into_input(self) -> Result<(ArticleInput, SubmitAction)> {
        let category = ArticleCategory::parse(self.category.trim())
            .ok_or_else(|| AppError::Validation("Invalid category selected".into()))?;
        let action = SubmitAction::from_form(self.action.as_deref());

        Ok((
            ArticleInput {
                title: self.title,
                content: self.content,
                excerpt: none_if_empty(self.excerpt),
                category,
                featured_image_url: none_if_empty(self.featured_image_url),
                meta_description: none_if_empty(self.meta_description),
                keywords: none_if_empty(self.keywords),
            },
            action,
        ))
    }
}

fn write_failure_flash(err: &AppError, fallback: &str) -> FlashMessage {
    match err {
        AppError::Validation(msg) | AppError::Conflict(msg) => FlashMessage::error(msg.clone()),
        _ => FlashMessage::error(fallback.to_string()),
    }
}

/// POST /admin/blog/new
pub async fn create(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<ArticleForm>,
) -> Response {
    let session_id = current.session_id;

    let (input, action) = match form.into_input() {
        Ok(parsed) => parsed,
        Err(e) => {
            let flash = write_failure_flash(&e, "Failed to create article. Please try again.");
            return flash_redirect(&state, session_id, flash, "/admin/blog/new").await;
        }
    };

    match state.articles().create(current.user.id, input, action).await {
        Ok(article) => {
            let flash = match article.status {
                ArticleStatus::Published => {
                    FlashMessage::success("Article published successfully!")
                }
                ArticleStatus::Draft => FlashMessage::success("Article saved as draft successfully!"),
            };
            flash_redirect(&state, session_id, flash, "/admin/blog").await
        }
        Err(e) => {
            tracing::error!(error = %e, "Create article failed");
            let flash = write_failure_flash(&e, "Failed to create article. Please try again.");
            flash_redirect(&state, session_id, flash, "/admin/blog/new").await
        }
    }
}

/// GET /admin/blog/:id/edit
pub async fn edit_form(
    State(state): State<SharedState>,
    Extension(context): Extension<Option<SessionContext>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Response {
    let article = match state.articles().get(id).await {
        Ok(article) => article,
        Err(_) => return Redirect::to("/admin/blog").into_response(),
    };

    let flash = take_flash(&state, context.as_ref()).await;
    let view = View::render(
        state.views.clone(),
        "admin/blogForm",
        &ArticleFormContext {
            title: "Edit Article",
            username: current.user.username,
            article: Some(article),
            flash,
        },
    );
    match view {
        Ok(view) => view.into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /admin/blog/:id/edit
pub async fn update(
    State(state): State<SharedState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Form(form): Form<ArticleForm>,
) -> Response {
    let session_id = current.session_id;
    let back = format!("/admin/blog/{}/edit", id);

    let (input, action) = match form.into_input() {
        Ok(parsed) => parsed,
        Err(e) => {
            let flash = write_failure_flash(&e, "Failed to update. Please try again.");
            return flash_redirect(&state, session_id, flash, &back).await;
        }
    };

    match state.articles().update(id, input, action).await {
        Ok(article) => {
            let flash = match article.status {
                ArticleStatus::Published => {
                    FlashMessage::success("Article published successfully!")
                }
                ArticleStatus::Draft => FlashMessage::success("Article updated successfully!"),
            };
            flash_redirect(&state, session_id, flash, "/admin/blog").await
        }
        Err(AppError::NotFound(_)) => Redirect::to("/admin/blog").into_response(),
        Err(e) => {
            tracing::error!(error = %e, article_id = %id, "Update article failed");
            let flash = write_failure_flash(&e, "Failed to update. Please try again.");
            flash_redirect(&state, session_id, flash, &back).await
        }
    }
}

/// POST /admin/blog/:id/delete
pub async fn delete(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(e) = state.articles().delete(id).await {
        tracing::error!(error = %e, article_id = %id, "Delete article failed");
    }
    Redirect::to("/admin/blog").into_response()
}
