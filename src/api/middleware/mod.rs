//! HTTP middleware.

pub mod rate_limit;
pub mod security_headers;
pub mod session;
