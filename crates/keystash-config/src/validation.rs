//! Configuration validation module.
//!
//! Collects every problem in one pass so a bad configuration fails at
//! startup with the full list rather than one error at a time.

use crate::AppConfig;
use keystash_core::MAX_TTL_SECS;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Pool size must be at least one.
    EmptyPool,
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: usize, maximum: usize },
    /// A TTL or timeout must be positive.
    NonPositiveDuration { name: String },
    /// A TTL exceeds what the store can represent.
    DurationTooLarge { name: String, value: u64, maximum: u64 },
    /// Rate limiter must allow at least one request.
    ZeroRateLimit,
    /// Entity type names must be non-empty and free of key separators.
    InvalidNamespace { name: String },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {url_type} URL: {message}")
            }
            Self::EmptyPool => write!(f, "Redis pool size must be at least 1"),
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {value} exceeds maximum allowed ({maximum})")
            }
            Self::NonPositiveDuration { name } => {
                write!(f, "'{name}' must be greater than zero")
            }
            Self::DurationTooLarge {
                name,
                value,
                maximum,
            } => {
                write!(f, "'{name}' is {value}s, above the maximum of {maximum}s")
            }
            Self::ZeroRateLimit => write!(f, "rate_limit.max_requests must be greater than zero"),
            Self::InvalidNamespace { name } => {
                write!(f, "Invalid cache namespace '{name}'")
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{value}' (valid: trace, debug, info, warn, error)"
                )
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{value}' (valid: pretty, json)")
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid log formats.
    const VALID_LOG_FORMATS: &'static [&'static str] = &["pretty", "json"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_redis(&config.redis, &mut errors);
        Self::validate_cache(&config.cache, &mut errors);
        Self::validate_rate_limit(&config.rate_limit, &mut errors);
        Self::validate_observability(&config.observability, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_redis(config: &crate::RedisConfig, errors: &mut Vec<ConfigValidationError>) {
        if !config.enabled {
            return;
        }

        match Url::parse(&config.url) {
            Ok(url) if url.scheme() == "redis" || url.scheme() == "rediss" => {}
            Ok(url) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            }),
        }

        if config.pool_size == 0 {
            errors.push(ConfigValidationError::EmptyPool);
        } else if config.pool_size > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: "redis.timeout_secs".to_string(),
            });
        }
    }

    fn validate_cache(config: &crate::CacheConfig, errors: &mut Vec<ConfigValidationError>) {
        Self::validate_ttl("cache.default_ttl_secs", config.default_ttl_secs, errors);

        let mut names: Vec<_> = config.namespaces.keys().collect();
        names.sort();
        for name in names {
            if name.trim().is_empty() || name.contains(keystash_core::KEY_SEPARATOR) {
                errors.push(ConfigValidationError::InvalidNamespace { name: name.clone() });
            }
            Self::validate_ttl(
                &format!("cache.namespaces.{name}.ttl_secs"),
                config.namespaces[name].ttl_secs,
                errors,
            );
        }
    }

    fn validate_ttl(name: &str, secs: u64, errors: &mut Vec<ConfigValidationError>) {
        if secs == 0 {
            errors.push(ConfigValidationError::NonPositiveDuration {
                name: name.to_string(),
            });
        } else if secs > MAX_TTL_SECS {
            errors.push(ConfigValidationError::DurationTooLarge {
                name: name.to_string(),
                value: secs,
                maximum: MAX_TTL_SECS,
            });
        }
    }

    fn validate_rate_limit(config: &crate::RateLimitConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.max_requests == 0 {
            errors.push(ConfigValidationError::ZeroRateLimit);
        }
        Self::validate_ttl("rate_limit.window_secs", config.window_secs, errors);
    }

    fn validate_observability(
        config: &crate::ObservabilityConfig,
        errors: &mut Vec<ConfigValidationError>,
    ) {
        if !Self::VALID_LOG_LEVELS.contains(&config.log_level.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }
        if !Self::VALID_LOG_FORMATS.contains(&config.log_format.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::InvalidLogFormat {
                value: config.log_format.clone(),
            });
        }
    }
}
