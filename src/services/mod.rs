//! Business logic services.

pub mod article_service;
pub mod auth_service;
pub mod dashboard_service;
pub mod media_service;
pub mod settings_service;
pub mod subscriber_service;
pub mod user_service;
