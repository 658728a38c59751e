//! Dashboard analytics: read-only rollups over the article and subscriber
//! collections, computed per request with no caching.

use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::article::ArticleCategory;

/// Number of months covered by the grouped-by-month series.
const TREND_MONTHS: u32 = 6;

/// Dashboard service
pub struct DashboardService {
    db: PgPool,
}

/// Headline counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub total_posts: i64,
    pub total_subscribers: i64,
    pub posts_this_month: i64,
    pub recent_subscribers: i64,
    pub recent_posts: Vec<RecentPost>,
    pub recent_subscriber_emails: Vec<RecentSubscriber>,
}

/// Chart data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardAnalytics {
    pub posts_per_month: Vec<MonthCount>,
    pub subscribers_per_month: Vec<MonthCount>,
    pub posts_by_category: Vec<CategoryCount>,
    pub top_posts: Vec<TopPost>,
    pub total_views: i64,
    pub avg_posts_per_month: f64,
    pub popular_category: Option<CategoryCount>,
}

/// Everything the dashboard page needs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub analytics: DashboardAnalytics,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentPost {
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentSubscriber {
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub year: i32,
    pub month: u32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: ArticleCategory,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopPost {
    pub title: String,
    pub slug: String,
    pub category: ArticleCategory,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

/// First instant of the month containing `now`.
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .expect("first day of month is always valid")
}

/// The last `months` (year, month) buckets ending at `now`, oldest first.
fn month_buckets(now: DateTime<Utc>, months: u32) -> Vec<(i32, u32)> {
    let mut buckets = Vec::with_capacity(months as usize);
    for back in (0..months).rev() {
        let point = start_of_month(now) - Months::new(back);
        buckets.push((point.year(), point.month()));
    }
    buckets
}

/// Zero-fill raw month/count rows into a dense series covering the last
/// `months` buckets, so charts show empty months instead of skipping them.
pub fn fill_month_series(
    rows: &[(DateTime<Utc>, i64)],
    now: DateTime<Utc>,
    months: u32,
) -> Vec<MonthCount> {
    month_buckets(now, months)
        .into_iter()
        .map(|(year, month)| {
            let count = rows
                .iter()
                .find(|(bucket, _)| bucket.year() == year && bucket.month() == month)
                .map(|(_, count)| *count)
                .unwrap_or(0);
            MonthCount { year, month, count }
        })
        .collect()
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Collect the full dashboard payload. The caller decides how a failure
    /// degrades; this function just reports it.
    pub async fn collect(&self) -> Result<DashboardData> {
        let now = Utc::now();

        let (total_posts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.db)
            .await?;

        let (total_subscribers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.db)
            .await?;

        let (posts_this_month,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM articles WHERE created_at >= $1")
                .bind(start_of_month(now))
                .fetch_one(&self.db)
                .await?;

        let (recent_subscribers,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM subscribers WHERE created_at >= $1")
                .bind(now - Duration::days(30))
                .fetch_one(&self.db)
                .await?;

        let recent_posts = sqlx::query_as::<_, (String, DateTime<Utc>)>(
            "SELECT title, created_at FROM articles ORDER BY created_at DESC LIMIT 5",
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(title, created_at)| RecentPost { title, created_at })
        .collect();

        let recent_subscriber_emails = sqlx::query_as::<_, (String, DateTime<Utc>)>(
            "SELECT email, created_at FROM subscribers ORDER BY created_at DESC LIMIT 5",
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(email, created_at)| RecentSubscriber { email, created_at })
        .collect();

        let window_start = start_of_month(now) - Months::new(TREND_MONTHS - 1);

        let post_rows = sqlx::query_as::<_, (DateTime<Utc>, i64)>(
            r#"
            SELECT date_trunc('month', created_at) AS bucket, COUNT(*)
            FROM articles
            WHERE created_at >= $1
            GROUP BY bucket
            ORDER BY bucket
            "#,
        )
        .bind(window_start)
        .fetch_all(&self.db)
        .await?;

        let subscriber_rows = sqlx::query_as::<_, (DateTime<Utc>, i64)>(
            r#"
            SELECT date_trunc('month', created_at) AS bucket, COUNT(*)
            FROM subscribers
            WHERE created_at >= $1
            GROUP BY bucket
            ORDER BY bucket
            "#,
        )
        .bind(window_start)
        .fetch_all(&self.db)
        .await?;

        let posts_by_category = sqlx::query_as::<_, (ArticleCategory, i64)>(
            r#"
            SELECT category, COUNT(*)
            FROM articles
            GROUP BY category
            ORDER BY COUNT(*) DESC
            LIMIT 8
            "#,
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect::<Vec<_>>();

        let top_posts = sqlx::query_as::<_, (String, String, ArticleCategory, i64, DateTime<Utc>)>(
            r#"
            SELECT title, slug, category, view_count, created_at
            FROM articles
            ORDER BY view_count DESC, created_at DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(
            |(title, slug, category, view_count, created_at)| TopPost {
                title,
                slug,
                category,
                view_count,
                created_at,
            },
        )
        .collect();

        let (total_views,): (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(view_count), 0)::BIGINT FROM articles")
                .fetch_one(&self.db)
                .await?;

        let avg_posts_per_month = if total_posts > 0 {
            (total_posts as f64 / 12.0 * 10.0).round() / 10.0
        } else {
            0.0
        };

        let popular_category = posts_by_category.first().cloned();

        Ok(DashboardData {
            stats: DashboardStats {
                total_posts,
                total_subscribers,
                posts_this_month,
                recent_subscribers,
                recent_posts,
                recent_subscriber_emails,
            },
            analytics: DashboardAnalytics {
                posts_per_month: fill_month_series(&post_rows, now, TREND_MONTHS),
                subscribers_per_month: fill_month_series(&subscriber_rows, now, TREND_MONTHS),
                posts_by_category,
                top_posts,
                total_views,
                avg_posts_per_month,
                popular_category,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn start_of_month_truncates() {
        let now = at(2025, 8, 17);
        let start = start_of_month(now);
        assert_eq!((start.year(), start.month(), start.day()), (2025, 8, 1));
        assert_eq!(start.time(), chrono::NaiveTime::MIN);
    }

    #[test]
    fn month_buckets_cross_year_boundary() {
        let buckets = month_buckets(at(2025, 2, 10), 6);
        assert_eq!(
            buckets,
            vec![
                (2024, 9),
                (2024, 10),
                (2024, 11),
                (2024, 12),
                (2025, 1),
                (2025, 2)
            ]
        );
    }

    #[test]
    fn fill_month_series_zero_fills_gaps() {
        let now = at(2025, 6, 20);
        // Only March and June have posts.
        let rows = vec![(at(2025, 3, 1), 4), (at(2025, 6, 1), 2)];

        let series = fill_month_series(&rows, now, 6);
        assert_eq!(series.len(), 6);
        assert_eq!(
            series,
            vec![
                MonthCount { year: 2025, month: 1, count: 0 },
                MonthCount { year: 2025, month: 2, count: 0 },
                MonthCount { year: 2025, month: 3, count: 4 },
                MonthCount { year: 2025, month: 4, count: 0 },
                MonthCount { year: 2025, month: 5, count: 0 },
                MonthCount { year: 2025, month: 6, count: 2 },
            ]
        );
    }

    #[test]
    fn fill_month_series_with_no_rows_is_all_zero() {
        let series = fill_month_series(&[], at(2025, 6, 20), 6);
        assert_eq!(series.len(), 6);
        assert!(series.iter().all(|bucket| bucket.count == 0));
    }
}
