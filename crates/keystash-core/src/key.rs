//! Cache key construction.

use crate::{KeystashError, KeystashResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::time::Duration;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

/// Longest TTL a namespace may carry, in seconds.
///
/// Redis rejects `SET EX` values whose expiry in milliseconds, added to the
/// current time, overflows a signed 64-bit integer. Half that range leaves
/// room for the clock.
pub const MAX_TTL_SECS: u64 = 4_611_686_018_427_387;

/// A fully-qualified key addressing one cached value.
///
/// Rendered as `entity:identifier`, or `prefix:entity:identifier` when an
/// application prefix is configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key from an optional application prefix, an entity type,
    /// and an identifier.
    pub fn new(prefix: Option<&str>, entity: &str, identifier: &str) -> KeystashResult<Self> {
        if entity.trim().is_empty() {
            return Err(KeystashError::invalid_key("entity type must not be empty"));
        }
        if identifier.trim().is_empty() {
            return Err(KeystashError::invalid_key(format!(
                "identifier for '{entity}' must not be empty"
            )));
        }

        let key = match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{prefix}{KEY_SEPARATOR}{entity}{KEY_SEPARATOR}{identifier}"),
            None => format!("{entity}{KEY_SEPARATOR}{identifier}"),
        };
        Ok(Self(key))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An entity type sharing one key prefix and one lifetime bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: Option<String>,
    entity: String,
    ttl: Duration,
}

impl KeyNamespace {
    /// Creates a namespace for `entity` with the given TTL.
    pub fn new(entity: impl Into<String>, ttl: Duration) -> KeystashResult<Self> {
        let entity = entity.into();
        if entity.trim().is_empty() {
            return Err(KeystashError::invalid_key("entity type must not be empty"));
        }
        if entity.contains(KEY_SEPARATOR) {
            return Err(KeystashError::invalid_key(format!(
                "entity type '{entity}' must not contain '{KEY_SEPARATOR}'"
            )));
        }
        if ttl.is_zero() {
            return Err(KeystashError::invalid_key(format!(
                "TTL for '{entity}' must be greater than zero"
            )));
        }
        if ttl.as_secs() > MAX_TTL_SECS {
            return Err(KeystashError::invalid_key(format!(
                "TTL for '{entity}' exceeds {MAX_TTL_SECS} seconds"
            )));
        }
        Ok(Self {
            prefix: None,
            entity,
            ttl,
        })
    }

    /// Places every key of this namespace under an application prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Builds the key for an identifier.
    pub fn key(&self, identifier: &str) -> KeystashResult<CacheKey> {
        CacheKey::new(self.prefix.as_deref(), &self.entity, identifier)
    }

    /// Returns the entity type.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the lifetime bound applied to values written here.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}
