//! Development data seeding.
//!
//! Inserts a couple of users, articles, and subscribers through the same
//! services the handlers use. Safe to re-run: existing records are left
//! alone.

use promontolio_blog::config::Config;
use promontolio_blog::db;
use promontolio_blog::error::Result;
use promontolio_blog::models::article::ArticleCategory;
use promontolio_blog::models::user::{Role, User, UserStatus};
use promontolio_blog::services::article_service::{ArticleInput, ArticleService, SubmitAction};
use promontolio_blog::services::auth_service::hash_password;
use promontolio_blog::services::subscriber_service::SubscriberService;
use promontolio_blog::services::user_service::{NewUser, UserService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    promontolio_blog::telemetry::init_tracing();

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin = ensure_super_user(&pool, &config).await?;
    tracing::info!(username = %admin.username, "Seeding as super user");

    let users = UserService::new(pool.clone());
    let sample_users = [
        ("alice", "alice@promontolioblog.com", "Alice", "Verdi", Role::Author),
        ("marco", "marco@promontolioblog.com", "Marco", "Russo", Role::Editor),
    ];
    for (username, email, first, last, role) in sample_users {
        let result = users
            .create(
                &admin,
                NewUser {
                    username: username.into(),
                    email: email.into(),
                    password: "Seeded-Pass1".into(),
                    first_name: Some(first.into()),
                    last_name: Some(last.into()),
                    role,
                    status: UserStatus::Active,
                    bio: None,
                },
            )
            .await;
        match result {
            Ok(user) => tracing::info!(username = %user.username, "Created user"),
            Err(e) => tracing::debug!(username, error = %e, "Skipping user"),
        }
    }

    let articles = ArticleService::new(pool.clone());
    let sample_articles = [
        (
            "Olive Oil Basics",
            "Everything you need to know about extra virgin olive oil, from \
             pressing to tasting.",
            ArticleCategory::OliveOilGuide,
            SubmitAction::Publish,
        ),
        (
            "Autumn Harvest Notes",
            "Field notes from this year's harvest on the Gargano promontory.",
            ArticleCategory::Production,
            SubmitAction::Publish,
        ),
        (
            "Three Simple Bruschetta Recipes",
            "Bread, tomatoes, and good oil. Three ways to get it right.",
            ArticleCategory::Recipes,
            SubmitAction::SaveDraft,
        ),
    ];
    for (title, content, category, action) in sample_articles {
        let result = articles
            .create(
                admin.id,
                ArticleInput {
                    title: title.into(),
                    content: content.into(),
                    excerpt: None,
                    category,
                    featured_image_url: None,
                    meta_description: None,
                    keywords: None,
                },
                action,
            )
            .await;
        match result {
            Ok(article) => tracing::info!(slug = %article.slug, "Created article"),
            Err(e) => tracing::debug!(title, error = %e, "Skipping article"),
        }
    }

    let subscribers = SubscriberService::new(pool.clone());
    for email in ["reader-one@example.com", "reader-two@example.com"] {
        match subscribers.subscribe(email).await {
            Ok(_) => tracing::info!(email, "Subscribed"),
            Err(e) => tracing::debug!(email, error = %e, "Skipping subscriber"),
        }
    }

    tracing::info!("Seeding complete");
    Ok(())
}

/// The seed needs a super user to act as; create one if the database is
/// empty.
async fn ensure_super_user(pool: &sqlx::PgPool, config: &Config) -> Result<User> {
    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = 'super' LIMIT 1")
        .fetch_optional(pool)
        .await?;
    if let Some(user) = existing {
        return Ok(user);
    }

    let password = config
        .admin_password
        .clone()
        .unwrap_or_else(|| "Seeded-Admin1".to_string());

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, role, status)
        VALUES ($1, $2, $3, $4, 'super', 'active')
        RETURNING *
        "#,
    )
    .bind(uuid::Uuid::new_v4())
    .bind(&config.admin_username)
    .bind(format!("{}@localhost", config.admin_username))
    .bind(hash_password(&password)?)
    .fetch_one(pool)
    .await?;

    Ok(user)
}
