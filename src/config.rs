//! Application configuration loaded from environment variables.

use crate::error::{AppError, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Server bind address (host:port)
    pub bind_address: String,

    /// Root directory for uploaded media files
    pub media_root: String,

    /// Path of the site settings JSON document
    pub settings_path: String,

    /// Session lifetime in hours
    pub session_ttl_hours: i64,

    /// Username provisioned for the bootstrap super user
    pub admin_username: String,

    /// Password for the bootstrap super user; generated when unset
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Config("DATABASE_URL not set".into()))?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "./public/media".into()),
            settings_path: env::var("SETTINGS_PATH")
                .unwrap_or_else(|_| "./config/settings.json".into()),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "24".into())
                .parse()
                .unwrap_or(24),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
        })
    }
}
