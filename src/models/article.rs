//! Article model and slug derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Publication state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "article_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

/// Editorial category enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "article_category", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ArticleCategory {
    OliveOilGuide,
    Recipes,
    HealthBenefits,
    Production,
    News,
}

impl ArticleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleCategory::OliveOilGuide => "olive-oil-guide",
            ArticleCategory::Recipes => "recipes",
            ArticleCategory::HealthBenefits => "health-benefits",
            ArticleCategory::Production => "production",
            ArticleCategory::News => "news",
        }
    }

    pub fn parse(value: &str) -> Option<ArticleCategory> {
        match value {
            "olive-oil-guide" => Some(ArticleCategory::OliveOilGuide),
            "recipes" => Some(ArticleCategory::Recipes),
            "health-benefits" => Some(ArticleCategory::HealthBenefits),
            "production" => Some(ArticleCategory::Production),
            "news" => Some(ArticleCategory::News),
            _ => None,
        }
    }
}

/// Article entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub status: ArticleStatus,
    pub category: ArticleCategory,
    pub featured_image_url: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Option<String>,
    pub author_id: Uuid,
    pub view_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derive a URL slug from an article title.
///
/// Lowercases, drops everything that is not alphanumeric, whitespace or a
/// hyphen, then collapses runs of whitespace/hyphens into single hyphens.
/// Deterministic: the same title always yields the same slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_separator = true;
        }
        // Any other punctuation is stripped entirely.
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Olive Oil Basics"), "olive-oil-basics");
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Olive Oil Basics!!"), "olive-oil-basics");
        assert_eq!(slugify("What's new?"), "whats-new");
    }

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("a  -  b"), "a-b");
        assert_eq!(slugify("  leading and trailing  "), "leading-and-trailing");
    }

    #[test]
    fn slugify_is_deterministic() {
        let title = "Harvest Report: October, 2025";
        assert_eq!(slugify(title), slugify(title));
        assert_eq!(slugify(title), "harvest-report-october-2025");
    }

    #[test]
    fn slugify_handles_underscores_and_unicode() {
        assert_eq!(slugify("frantoio_e_molitura"), "frantoio-e-molitura");
        assert_eq!(slugify("Qualità Dell'Olio"), "qualità-dellolio");
    }

    #[test]
    fn category_parse_round_trips() {
        for cat in [
            ArticleCategory::OliveOilGuide,
            ArticleCategory::Recipes,
            ArticleCategory::HealthBenefits,
            ArticleCategory::Production,
            ArticleCategory::News,
        ] {
            assert_eq!(ArticleCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(ArticleCategory::parse("sports"), None);
    }
}
