//! Article lifecycle service.
//!
//! Slug derivation and the publish transition are explicit steps of the
//! write path here, not persistence hooks: `publish_transition` decides the
//! status/published_at pair and `slugify` recomputes the slug from the
//! title on every create and update.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::article::{slugify, Article, ArticleCategory, ArticleStatus};

/// Article service
pub struct ArticleService {
    db: PgPool,
}

/// Form fields shared by create and update.
#[derive(Debug, Clone)]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: ArticleCategory,
    pub featured_image_url: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<String>,
}

/// The explicit submit action on the article form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAction {
    Publish,
    SaveDraft,
}

impl SubmitAction {
    /// "publish" publishes; anything else (or nothing) saves a draft.
    pub fn from_form(action: Option<&str>) -> SubmitAction {
        match action {
            Some("publish") => SubmitAction::Publish,
            _ => SubmitAction::SaveDraft,
        }
    }
}

/// Decide the next (status, published_at) pair for a write.
///
/// `published_at` is stamped exactly once: on the first transition into
/// `published`. Moving back to draft keeps the original timestamp.
pub fn publish_transition(
    action: SubmitAction,
    existing_published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (ArticleStatus, Option<DateTime<Utc>>) {
    match action {
        SubmitAction::Publish => (
            ArticleStatus::Published,
            Some(existing_published_at.unwrap_or(now)),
        ),
        SubmitAction::SaveDraft => (ArticleStatus::Draft, existing_published_at),
    }
}

fn validate_input(input: &ArticleInput) -> Result<()> {
    let title = input.title.trim();
    if title.is_empty() || title.len() > 100 {
        return Err(AppError::Validation(
            "Title is required and cannot exceed 100 characters".into(),
        ));
    }
    if input.content.trim().is_empty() {
        return Err(AppError::Validation("Content is required".into()));
    }
    if input.excerpt.as_deref().is_some_and(|e| e.len() > 300) {
        return Err(AppError::Validation(
            "Excerpt cannot exceed 300 characters".into(),
        ));
    }
    if input
        .meta_description
        .as_deref()
        .is_some_and(|m| m.len() > 160)
    {
        return Err(AppError::Validation(
            "Meta description cannot exceed 160 characters".into(),
        ));
    }
    if slugify(title).is_empty() {
        return Err(AppError::Validation(
            "Title must contain at least one letter or digit".into(),
        ));
    }
    Ok(())
}

fn map_slug_conflict(err: AppError) -> AppError {
    if err.is_unique_violation("articles_slug_key") {
        AppError::Conflict("An article with this title already exists".into())
    } else {
        err
    }
}

impl ArticleService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> Result<Article> {
        sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Article not found".into()))
    }

    /// Create an article; status follows the submitted action.
    pub async fn create(
        &self,
        author_id: Uuid,
        input: ArticleInput,
        action: SubmitAction,
    ) -> Result<Article> {
        validate_input(&input)?;

        let now = Utc::now();
        let (status, published_at) = publish_transition(action, None, now);
        let slug = slugify(&input.title);

        let article = sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles
                (id, title, slug, content, excerpt, status, category,
                 featured_image_url, meta_description, keywords, author_id,
                 published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.title.trim())
        .bind(&slug)
        .bind(&input.content)
        .bind(&input.excerpt)
        .bind(status)
        .bind(input.category)
        .bind(&input.featured_image_url)
        .bind(&input.meta_description)
        .bind(&input.keywords)
        .bind(author_id)
        .bind(published_at)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_slug_conflict(AppError::from(e)))?;

        tracing::info!(slug = %article.slug, status = ?article.status, "Article created");
        Ok(article)
    }

    /// Update an article. The slug is recomputed from the new title; the
    /// publish transition keeps `published_at` sticky.
    pub async fn update(
        &self,
        id: Uuid,
        input: ArticleInput,
        action: SubmitAction,
    ) -> Result<Article> {
        validate_input(&input)?;

        let existing = self.get(id).await?;
        let (status, published_at) =
            publish_transition(action, existing.published_at, Utc::now());
        let slug = slugify(&input.title);

        let article = sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles
            SET title = $2, slug = $3, content = $4, excerpt = $5, status = $6,
                category = $7, featured_image_url = $8, meta_description = $9,
                keywords = $10, published_at = $11, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.title.trim())
        .bind(&slug)
        .bind(&input.content)
        .bind(&input.excerpt)
        .bind(status)
        .bind(input.category)
        .bind(&input.featured_image_url)
        .bind(&input.meta_description)
        .bind(&input.keywords)
        .bind(published_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_slug_conflict(AppError::from(e)))?;

        Ok(article)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Article not found".into()));
        }
        Ok(())
    }

    /// Admin list: every article, newest first, with the author's username
    /// resolved (dangling references fall back to NULL).
    pub async fn admin_list(&self) -> Result<Vec<(Article, Option<String>)>> {
        let rows = sqlx::query_as::<_, ArticleWithAuthor>(
            r#"
            SELECT a.*, u.username AS author_username
            FROM articles a
            LEFT JOIN users u ON u.id = a.author_id
            ORDER BY a.created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.article, row.author_username))
            .collect())
    }

    /// Public list: published articles only, newest first, fixed page size.
    pub async fn published_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<(Article, Option<String>)>, i64)> {
        let offset = ((page.max(1) - 1) * per_page) as i64;

        let rows = sqlx::query_as::<_, ArticleWithAuthor>(
            r#"
            SELECT a.*, u.username AS author_username
            FROM articles a
            LEFT JOIN users u ON u.id = a.author_id
            WHERE a.status = 'published'
            ORDER BY a.published_at DESC NULLS LAST, a.created_at DESC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(per_page as i64)
        .fetch_all(&self.db)
        .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM articles WHERE status = 'published'")
                .fetch_one(&self.db)
                .await?;

        Ok((
            rows.into_iter()
                .map(|row| (row.article, row.author_username))
                .collect(),
            total,
        ))
    }

    /// Public single-article view by slug. Every successful read increments
    /// `view_count` by exactly one; the increment is a single atomic UPDATE
    /// so concurrent readers cannot lose counts.
    pub async fn view_published(&self, slug: &str) -> Result<(Article, Option<String>)> {
        let article = sqlx::query_as::<_, Article>(
            r#"
            UPDATE articles
            SET view_count = view_count + 1
            WHERE slug = $1 AND status = 'published'
            RETURNING *
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

        let author: Option<(String,)> = sqlx::query_as("SELECT username FROM users WHERE id = $1")
            .bind(article.author_id)
            .fetch_optional(&self.db)
            .await?;

        Ok((article, author.map(|(name,)| name)))
    }
}

/// Article row joined with the author's username.
#[derive(sqlx::FromRow)]
struct ArticleWithAuthor {
    #[sqlx(flatten)]
    article: Article,
    author_username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn publish_action_sets_published_at_once() {
        let t0 = now();
        let (status, published_at) = publish_transition(SubmitAction::Publish, None, t0);
        assert_eq!(status, ArticleStatus::Published);
        assert_eq!(published_at, Some(t0));

        // Publishing again later keeps the original timestamp.
        let t1 = t0 + chrono::Duration::hours(2);
        let (status, published_at) = publish_transition(SubmitAction::Publish, Some(t0), t1);
        assert_eq!(status, ArticleStatus::Published);
        assert_eq!(published_at, Some(t0));
    }

    #[test]
    fn draft_action_never_stamps_published_at() {
        let (status, published_at) = publish_transition(SubmitAction::SaveDraft, None, now());
        assert_eq!(status, ArticleStatus::Draft);
        assert_eq!(published_at, None);
    }

    #[test]
    fn unpublishing_keeps_original_timestamp() {
        let t0 = now();
        let (status, published_at) = publish_transition(SubmitAction::SaveDraft, Some(t0), now());
        assert_eq!(status, ArticleStatus::Draft);
        assert_eq!(published_at, Some(t0));
    }

    #[test]
    fn submit_action_parses_form_values() {
        assert_eq!(
            SubmitAction::from_form(Some("publish")),
            SubmitAction::Publish
        );
        assert_eq!(
            SubmitAction::from_form(Some("draft")),
            SubmitAction::SaveDraft
        );
        assert_eq!(SubmitAction::from_form(None), SubmitAction::SaveDraft);
    }

    #[test]
    fn input_validation_rejects_bad_titles() {
        let mut input = ArticleInput {
            title: "".into(),
            content: "body".into(),
            excerpt: None,
            category: ArticleCategory::News,
            featured_image_url: None,
            meta_description: None,
            keywords: None,
        };
        assert!(validate_input(&input).is_err());

        input.title = "!!!".into();
        assert!(validate_input(&input).is_err());

        input.title = "x".repeat(101);
        assert!(validate_input(&input).is_err());

        input.title = "Olive Oil Basics".into();
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn input_validation_enforces_field_limits() {
        let base = ArticleInput {
            title: "Olive Oil Basics".into(),
            content: "body".into(),
            excerpt: Some("e".repeat(301)),
            category: ArticleCategory::Recipes,
            featured_image_url: None,
            meta_description: None,
            keywords: None,
        };
        assert!(validate_input(&base).is_err());

        let long_meta = ArticleInput {
            excerpt: None,
            meta_description: Some("m".repeat(161)),
            ..base
        };
        assert!(validate_input(&long_meta).is_err());
    }
}
