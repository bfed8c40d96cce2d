//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use docqa_common::config::RateLimitConfig;
use docqa_common::errors::{AppError, Result};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Shared limiter plus the configured rate for error reporting
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<GlobalRateLimiter>,
    requests_per_second: u32,
}

impl RateLimit {
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        let positive = |value: u32, name: &str| {
            NonZeroU32::new(value).ok_or_else(|| AppError::Configuration {
                message: format!("rate_limit.{} must be positive", name),
            })
        };

        let quota = Quota::per_second(positive(config.requests_per_second, "requests_per_second")?)
            .allow_burst(positive(config.burst, "burst")?);

        Ok(Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            requests_per_second: config.requests_per_second,
        })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimit>,
    request: Request,
    next: Next,
) -> Result<Response> {
    match rate_limit.limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            Err(AppError::RateLimited {
                limit: rate_limit.requests_per_second,
            })
        }
    }
}
