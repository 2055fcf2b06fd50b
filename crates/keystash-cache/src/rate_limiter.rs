//! Fixed-window rate limiter backed by the cache store.

use crate::metrics::CacheMetrics;
use crate::CacheStore;
use chrono::{DateTime, Utc};
use keystash_config::RateLimitConfig;
use keystash_core::{CacheKey, KeystashError, KeystashResult, MAX_TTL_SECS};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Entity type used for counter keys.
const RATE_LIMIT_ENTITY: &str = "rate_limit";

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request fits in the current window.
    pub allowed: bool,
    /// Requests counted in the current window, this one included.
    pub count: u64,
    /// Requests allowed per window.
    pub limit: u64,
    /// Time until the current window closes.
    pub retry_after: Duration,
}

impl RateLimitDecision {
    /// Requests left in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

/// Counts requests per subject in fixed windows.
///
/// Each window has its own counter key, `rate_limit:{subject}:{window}`,
/// which the store expires once the window has passed. Counting relies on
/// the store's atomic increment; the limiter itself holds no state.
#[derive(Clone)]
pub struct FixedWindowRateLimiter {
    store: Arc<dyn CacheStore>,
    key_prefix: Option<String>,
    limit: u64,
    window: Duration,
}

impl FixedWindowRateLimiter {
    /// Creates a limiter allowing `limit` requests per `window`.
    pub fn new(store: Arc<dyn CacheStore>, limit: u64, window: Duration) -> KeystashResult<Self> {
        if limit == 0 {
            return Err(KeystashError::Configuration(
                "rate limit must allow at least one request".to_string(),
            ));
        }
        if window.as_secs() == 0 {
            return Err(KeystashError::Configuration(
                "rate limit window must be at least one second".to_string(),
            ));
        }
        if window.as_secs() > MAX_TTL_SECS {
            return Err(KeystashError::Configuration(format!(
                "rate limit window must not exceed {MAX_TTL_SECS} seconds"
            )));
        }
        Ok(Self {
            store,
            key_prefix: None,
            limit,
            window,
        })
    }

    /// Creates a limiter from configuration.
    pub fn from_config(store: Arc<dyn CacheStore>, config: &RateLimitConfig) -> KeystashResult<Self> {
        Self::new(store, config.max_requests, config.window())
    }

    /// Places counter keys under an application prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.key_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Counts a request from `subject` against the current window.
    pub async fn check(&self, subject: &str) -> KeystashResult<RateLimitDecision> {
        self.check_at(subject, Utc::now()).await
    }

    /// Counts a request from `subject` against the window containing `now`.
    pub async fn check_at(
        &self,
        subject: &str,
        now: DateTime<Utc>,
    ) -> KeystashResult<RateLimitDecision> {
        let window_secs = self.window.as_secs();
        let epoch_secs = u64::try_from(now.timestamp()).unwrap_or(0);
        let window_index = epoch_secs / window_secs;

        let key = self.window_key(subject, window_index)?;
        let count = self.store.incr_window(key.as_str(), self.window).await?;

        let decision = RateLimitDecision {
            allowed: count <= self.limit,
            count,
            limit: self.limit,
            retry_after: Duration::from_secs(window_secs - epoch_secs % window_secs),
        };

        if decision.allowed {
            debug!(%key, count, limit = self.limit, "Request allowed");
        } else {
            debug!(%key, count, limit = self.limit, "Rate limit exceeded");
            CacheMetrics::rate_limited(RATE_LIMIT_ENTITY);
        }

        Ok(decision)
    }

    fn window_key(&self, subject: &str, window_index: u64) -> KeystashResult<CacheKey> {
        if subject.trim().is_empty() {
            return Err(KeystashError::invalid_key("rate limit subject must not be empty"));
        }
        CacheKey::new(
            self.key_prefix.as_deref(),
            RATE_LIMIT_ENTITY,
            &format!("{subject}:{window_index}"),
        )
    }
}

impl std::fmt::Debug for FixedWindowRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowRateLimiter")
            .field("backend", &self.store.backend())
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
