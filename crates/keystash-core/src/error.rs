//! Unified error types for the cache layer.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Keystash.
///
/// A cache miss and an identifier unknown to the source of truth are not
/// errors; accessors report them as `Ok(None)`.
#[derive(Error, Debug)]
pub enum KeystashError {
    // ============ Store Errors ============
    /// The external store could not be reached or timed out.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The external store answered but rejected the command.
    #[error("Store error: {0}")]
    Store(String),

    // ============ Data Errors ============
    /// A value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A cache key could not be built.
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    // ============ Collaborator Errors ============
    /// The secondary source of truth failed.
    #[error("Source error: {source_name} - {message}")]
    Source {
        source_name: String,
        message: String,
    },

    // ============ Infrastructure Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KeystashError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Store(_) => "STORE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::InvalidKey(_) => "INVALID_KEY",
            Self::Source { .. } => "SOURCE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a source error for the named collaborator.
    #[must_use]
    pub fn source_failure<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid key error.
    #[must_use]
    pub fn invalid_key<T: Into<String>>(message: T) -> Self {
        Self::InvalidKey(message.into())
    }

    /// Creates a store unavailable error.
    #[must_use]
    pub fn unavailable<T: Into<String>>(message: T) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the external store could not be reached.
    #[must_use]
    pub const fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Checks if this error is retriable.
    ///
    /// Nothing in this crate retries; the flag is for callers.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Source { .. })
    }
}

impl From<serde_json::Error> for KeystashError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for KeystashError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_timeout()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
        {
            Self::StoreUnavailable(err.to_string())
        } else {
            Self::Store(err.to_string())
        }
    }
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::PoolError> for KeystashError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        match err {
            // Connection and command failures are told apart by the client error.
            deadpool_redis::PoolError::Backend(e) => Self::from(e),
            other => Self::StoreUnavailable(format!("Failed to get Redis connection: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(KeystashError::unavailable("down").error_code(), "STORE_UNAVAILABLE");
        assert_eq!(KeystashError::Store("WRONGTYPE".to_string()).error_code(), "STORE_ERROR");
        assert_eq!(KeystashError::invalid_key("empty").error_code(), "INVALID_KEY");
        assert_eq!(KeystashError::source_failure("catalog", "boom").error_code(), "SOURCE_ERROR");
        assert_eq!(KeystashError::internal("oops").error_code(), "INTERNAL_ERROR");
        assert_eq!(
            KeystashError::Configuration("bad".to_string()).error_code(),
            "CONFIGURATION_ERROR"
        );
    }

    #[test]
    fn test_retriable_errors() {
        assert!(KeystashError::unavailable("connection refused").is_retriable());
        assert!(KeystashError::source_failure("catalog", "timeout").is_retriable());
        assert!(!KeystashError::invalid_key("empty").is_retriable());
        assert!(!KeystashError::Serialization("eof".to_string()).is_retriable());
    }

    #[test]
    fn test_is_store_unavailable() {
        assert!(KeystashError::unavailable("down").is_store_unavailable());
        assert!(!KeystashError::Store("WRONGTYPE".to_string()).is_store_unavailable());
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = KeystashError::from(err);
        assert!(matches!(err, KeystashError::Serialization(_)));
    }

    #[test]
    fn test_source_error_display() {
        let err = KeystashError::source_failure("catalog", "row locked");
        let msg = err.to_string();
        assert!(msg.contains("catalog") && msg.contains("row locked"));
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_from_redis_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = KeystashError::from(redis::RedisError::from(io));
        assert!(err.is_store_unavailable());
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_from_redis_command_error() {
        let err = redis::RedisError::from((redis::ErrorKind::TypeError, "WRONGTYPE"));
        let err = KeystashError::from(err);
        assert!(matches!(err, KeystashError::Store(_)));
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_pool_backend_command_error_is_not_unavailable() {
        let redis_err = redis::RedisError::from((redis::ErrorKind::ResponseError, "NOPERM"));
        let err = KeystashError::from(deadpool_redis::PoolError::Backend(redis_err));
        assert!(matches!(err, KeystashError::Store(_)));
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_pool_errors_without_server_reply_are_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let backend = deadpool_redis::PoolError::Backend(redis::RedisError::from(io));
        assert!(KeystashError::from(backend).is_store_unavailable());
        assert!(KeystashError::from(deadpool_redis::PoolError::Closed).is_store_unavailable());
    }
}
