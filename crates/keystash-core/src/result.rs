//! Result type aliases for Keystash.

use crate::KeystashError;

/// A specialized `Result` type for Keystash operations.
pub type KeystashResult<T> = Result<T, KeystashError>;
