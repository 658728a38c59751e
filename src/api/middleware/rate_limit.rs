//! Rate limiting middleware.
//!
//! Fixed-window in-memory limiter keyed by user id when authenticated,
//! client IP otherwise.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header::HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;

use super::session::CurrentUser;

/// Rate limiter that tracks requests per key (user id or IP).
#[derive(Debug)]
pub struct RateLimiter {
    /// Map of key -> (request count, window start time)
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    /// Maximum number of requests allowed per window
    max_requests: u32,
    /// Duration of the rate limiting window
    window: Duration,
}

impl RateLimiter {
    /// General traffic limit: 100 requests per 15 minutes.
    pub fn general() -> Self {
        Self::new(100, 15 * 60)
    }

    /// Login attempt limit: 5 per 15 minutes.
    pub fn login() -> Self {
        Self::new(5, 15 * 60)
    }

    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Check if a request should be rate limited.
    ///
    /// Returns `Ok(remaining)` with the number of remaining requests if
    /// allowed, or `Err(retry_after_secs)` if the limit has been exceeded.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, u64> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        let entry = requests.entry(key.to_string()).or_insert((0, now));

        // Window expired: start a fresh one
        if now.duration_since(entry.1) >= self.window {
            entry.0 = 1;
            entry.1 = now;
            return Ok(self.max_requests.saturating_sub(1));
        }

        if entry.0 >= self.max_requests {
            let retry_after = self.window.as_secs() - now.duration_since(entry.1).as_secs();
            return Err(retry_after.max(1));
        }

        entry.0 += 1;
        Ok(self.max_requests.saturating_sub(entry.0))
    }

    /// Clean up expired entries. Called periodically from a background task
    /// to prevent memory bloat.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window);
    }
}

/// Key selection: authenticated user id first, client IP otherwise.
fn rate_limit_key(request: &Request) -> String {
    if let Some(current) = request.extensions().get::<CurrentUser>() {
        return format!("user:{}", current.user.id);
    }
    extract_client_ip(request)
}

fn extract_client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            return format!("ip:{}", first.trim());
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
    {
        return format!("ip:{}", real_ip.trim());
    }

    "ip:unknown".to_string()
}

/// Rate limiting middleware. Returns 429 Too Many Requests with a
/// Retry-After header when the limit is exceeded.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = rate_limit_key(&request);

    match limiter.check_rate_limit(&key).await {
        Ok(_remaining) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(key = %key, retry_after, "Rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later.",
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn allows_up_to_the_limit() {
        let limiter = RateLimiter::new(3, 60);
        assert_eq!(limiter.check_rate_limit("k").await, Ok(2));
        assert_eq!(limiter.check_rate_limit("k").await, Ok(1));
        assert_eq!(limiter.check_rate_limit("k").await, Ok(0));
        assert!(limiter.check_rate_limit("k").await.is_err());
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check_rate_limit("a").await.is_ok());
        assert!(limiter.check_rate_limit("b").await.is_ok());
        assert!(limiter.check_rate_limit("a").await.is_err());
    }

    #[tokio::test]
    async fn retry_after_is_at_least_one_second() {
        let limiter = RateLimiter::new(1, 60);
        let _ = limiter.check_rate_limit("k").await;
        let retry_after = limiter.check_rate_limit("k").await.unwrap_err();
        assert!(retry_after >= 1);
    }

    #[tokio::test]
    async fn cleanup_drops_expired_windows() {
        let limiter = RateLimiter::new(1, 0);
        let _ = limiter.check_rate_limit("stale").await;
        limiter.cleanup_expired().await;
        assert!(limiter.requests.read().await.is_empty());
    }

    #[test]
    fn forwarded_header_wins_for_ip_keying() {
        let request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request), "ip:203.0.113.7");
    }

    #[test]
    fn unknown_ip_fallback() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(extract_client_ip(&request), "ip:unknown");
    }
}
