//! API module - HTTP handlers and middleware.

pub mod dto;
pub mod flash;
pub mod handlers;
pub mod middleware;
pub mod routes;

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::services::article_service::ArticleService;
use crate::services::auth_service::AuthService;
use crate::services::dashboard_service::DashboardService;
use crate::services::media_service::MediaService;
use crate::services::settings_service::SettingsService;
use crate::services::subscriber_service::SubscriberService;
use crate::services::user_service::UserService;
use crate::storage::MediaStore;
use crate::views::ViewEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    pub store: Arc<dyn MediaStore>,
    pub views: Arc<dyn ViewEngine>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: PgPool,
        store: Arc<dyn MediaStore>,
        views: Arc<dyn ViewEngine>,
    ) -> Self {
        Self {
            config,
            db,
            store,
            views,
        }
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.db.clone(), self.config.session_ttl_hours)
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.db.clone())
    }

    pub fn articles(&self) -> ArticleService {
        ArticleService::new(self.db.clone())
    }

    pub fn media(&self) -> MediaService {
        MediaService::new(self.db.clone(), self.store.clone())
    }

    pub fn subscribers(&self) -> SubscriberService {
        SubscriberService::new(self.db.clone())
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.db.clone())
    }

    pub fn settings(&self) -> SettingsService {
        SettingsService::new(self.config.settings_path.clone())
    }
}

pub type SharedState = Arc<AppState>;
