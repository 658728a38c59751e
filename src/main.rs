//! Promontolio Blog - Main Entry Point

use std::sync::Arc;
use std::time::Duration;

use promontolio_blog::api::middleware::rate_limit::RateLimiter;
use promontolio_blog::api::{routes, AppState, SharedState};
use promontolio_blog::config::Config;
use promontolio_blog::error::Result;
use promontolio_blog::models::user::Role;
use promontolio_blog::services::settings_service::SettingsService;
use promontolio_blog::services::user_service::generate_password;
use promontolio_blog::storage::filesystem::FilesystemStore;
use promontolio_blog::views::ScaffoldEngine;
use promontolio_blog::{db, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    telemetry::init_tracing();

    let config = Config::from_env()?;
    tracing::info!("Starting Promontolio blog");

    // Connect to database
    let db_pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Database migrations complete");

    provision_super_user(&db_pool, &config).await?;
    ensure_media_dirs(&config.media_root).await?;

    let store = Arc::new(FilesystemStore::new(&config.media_root));
    let site_title = SettingsService::new(config.settings_path.clone())
        .load()
        .await
        .site
        .title;
    let views = Arc::new(ScaffoldEngine::new(site_title));

    let state: SharedState = Arc::new(AppState::new(config.clone(), db_pool, store, views));

    let general_limiter = Arc::new(RateLimiter::general());
    let login_limiter = Arc::new(RateLimiter::login());
    spawn_sweepers(state.clone(), general_limiter.clone(), login_limiter.clone());

    let app = routes::create_router(state, general_limiter, login_limiter);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Provision the bootstrap super user on first boot.
async fn provision_super_user(db: &sqlx::PgPool, config: &Config) -> Result<()> {
    let existing: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE role = 'super' LIMIT 1")
            .fetch_optional(db)
            .await?;

    if existing.is_some() {
        return Ok(());
    }

    let (password, generated) = match &config.admin_password {
        Some(password) => (password.clone(), false),
        None => (generate_password(), true),
    };

    let password_hash = promontolio_blog::services::auth_service::hash_password(&password)?;

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, role, status)
        VALUES ($1, $2, $3, $4, $5, 'active')
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(uuid::Uuid::new_v4())
    .bind(&config.admin_username)
    .bind(format!("{}@localhost", config.admin_username))
    .bind(&password_hash)
    .bind(Role::Super)
    .execute(db)
    .await?;

    if generated {
        tracing::warn!(
            username = %config.admin_username,
            password = %password,
            "Created initial super user with a generated password; change it after first login"
        );
    } else {
        tracing::info!(username = %config.admin_username, "Created initial super user");
    }

    Ok(())
}

/// Create the type-partitioned upload directories up front so the first
/// upload and ServeDir don't race on them.
async fn ensure_media_dirs(media_root: &str) -> Result<()> {
    for dir in ["images", "documents", "videos", "audio", "thumbnails"] {
        tokio::fs::create_dir_all(std::path::Path::new(media_root).join(dir)).await?;
    }
    Ok(())
}

/// Background maintenance: expired sessions and stale rate-limit windows.
fn spawn_sweepers(
    state: SharedState,
    general_limiter: Arc<RateLimiter>,
    login_limiter: Arc<RateLimiter>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match state.auth().sweep_expired().await {
                Ok(0) => {}
                Ok(swept) => tracing::debug!(swept, "Expired sessions removed"),
                Err(e) => tracing::error!(error = %e, "Session sweep failed"),
            }
            general_limiter.cleanup_expired().await;
            login_limiter.cleanup_expired().await;
        }
    });
}
