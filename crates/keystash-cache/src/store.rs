//! Cache store trait for the external key-value server.

use async_trait::async_trait;
use keystash_core::KeystashResult;
use std::time::Duration;

/// Operations the cache layer needs from the external store.
///
/// Values are opaque bytes. Expiry is enforced by the store: once a TTL
/// lapses the value must no longer be returned by [`CacheStore::get_raw`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the raw bytes stored under `key`.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get_raw(&self, key: &str) -> KeystashResult<Option<Vec<u8>>>;

    /// Store bytes under `key`, replacing any previous value and TTL.
    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> KeystashResult<()>;

    /// Delete a key.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> KeystashResult<bool>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> KeystashResult<bool>;

    /// Remaining lifetime of a key.
    ///
    /// Returns `None` if the key is absent or has no expiry.
    async fn ttl(&self, key: &str) -> KeystashResult<Option<Duration>>;

    /// Increment the counter at `key` and (re)arm its expiry to `window`.
    ///
    /// Returns the counter value after the increment.
    async fn incr_window(&self, key: &str, window: Duration) -> KeystashResult<u64>;

    /// Round-trip check against the store.
    async fn ping(&self) -> KeystashResult<()>;

    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;
}

/// Extension trait with typed JSON helpers.
#[async_trait]
pub trait CacheExt: CacheStore {
    /// Get a typed value from the store.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> KeystashResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Serialize a value as JSON and store it with a TTL.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> KeystashResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set_raw(key, &bytes, ttl).await
    }
}

// Blanket implementation for all CacheStore implementations
impl<T: CacheStore + ?Sized> CacheExt for T {}
