//! Application configuration structures.

use keystash_core::{KeyNamespace, KeystashResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Redis configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Cache-aside policy.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Rate limiter configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "keystash".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// Enable Redis. When disabled the in-process store is used.
    pub enabled: bool,
    /// Seconds to wait for a pooled connection.
    pub timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            enabled: true,
            timeout_secs: 5,
        }
    }
}

impl RedisConfig {
    /// Returns the connection wait timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-entity cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Lifetime of values written under this entity type, in seconds.
    pub ttl_secs: u64,
}

/// Cache-aside configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Optional application prefix placed before every key.
    pub key_prefix: Option<String>,
    /// TTL for entity types without their own entry, in seconds.
    pub default_ttl_secs: u64,
    /// Serve from the source of truth when the store is unreachable.
    pub fallback_to_source: bool,
    /// TTL overrides keyed by entity type.
    pub namespaces: HashMap<String, NamespaceConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let namespaces = [
            ("user", 3600),
            ("product", 3600),
            ("search", 900),
            ("api", 7200),
            ("session", 1800),
            ("cart", 86400),
        ]
        .into_iter()
        .map(|(name, ttl_secs)| (name.to_string(), NamespaceConfig { ttl_secs }))
        .collect();

        Self {
            key_prefix: None,
            default_ttl_secs: 3600, // 1 hour
            fallback_to_source: false,
            namespaces,
        }
    }
}

impl CacheConfig {
    /// Returns the default TTL as a Duration.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Returns the TTL for an entity type, falling back to the default.
    #[must_use]
    pub fn ttl_for(&self, entity: &str) -> Duration {
        self.namespaces
            .get(entity)
            .map_or_else(|| self.default_ttl(), |ns| Duration::from_secs(ns.ttl_secs))
    }

    /// Builds the key namespace for an entity type.
    pub fn namespace(&self, entity: &str) -> KeystashResult<KeyNamespace> {
        let ns = KeyNamespace::new(entity, self.ttl_for(entity))?;
        Ok(match &self.key_prefix {
            Some(prefix) => ns.with_prefix(prefix.clone()),
            None => ns,
        })
    }
}

/// Fixed-window rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per subject per window.
    pub max_requests: u64,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    /// Returns the window length as a Duration.
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
    /// Enable metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}
