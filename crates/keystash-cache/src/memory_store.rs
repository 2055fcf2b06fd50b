//! In-process cache store.

use crate::CacheStore;
use async_trait::async_trait;
use keystash_core::{KeystashError, KeystashResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Map size below which writes never sweep.
const MIN_SWEEP_LEN: usize = 64;

#[derive(Debug)]
struct Entries {
    map: HashMap<String, Entry>,
    /// Length at which the next write sweeps expired entries.
    sweep_at: usize,
}

impl Default for Entries {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            sweep_at: MIN_SWEEP_LEN,
        }
    }
}

impl Entries {
    fn live_entry(&mut self, key: &str) -> Option<&mut Entry> {
        let now = Instant::now();
        if self.map.get(key).is_some_and(|e| !e.is_live(now)) {
            self.map.remove(key);
        }
        self.map.get_mut(key)
    }

    /// Inserts an entry, dropping expired ones once the map has doubled
    /// since the last sweep.
    fn insert(&mut self, key: &str, entry: Entry) {
        self.map.insert(key.to_string(), entry);

        if self.map.len() >= self.sweep_at {
            let now = Instant::now();
            let before = self.map.len();
            self.map.retain(|_, e| e.is_live(now));
            self.sweep_at = (self.map.len() * 2).max(MIN_SWEEP_LEN);
            debug!(
                swept = before - self.map.len(),
                remaining = self.map.len(),
                "Swept expired keys"
            );
        }
    }
}

fn expiry(ttl: Duration) -> KeystashResult<Instant> {
    Instant::now()
        .checked_add(ttl)
        .ok_or_else(|| KeystashError::Store(format!("invalid expire time: {ttl:?}")))
}

/// Cache store kept in process memory.
///
/// Honours TTLs lazily: expired entries are dropped when next touched, and
/// writes periodically sweep the rest. Used when Redis is disabled and in
/// tests.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<Entries>,
}

impl InMemoryCacheStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    /// Returns true if no live entries remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries held in memory, expired ones included.
    #[cfg(test)]
    pub(crate) fn stored_entries(&self) -> usize {
        self.entries.lock().map.len()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get_raw(&self, key: &str) -> KeystashResult<Option<Vec<u8>>> {
        let mut entries = self.entries.lock();
        Ok(entries.live_entry(key).map(|e| e.value.clone()))
    }

    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> KeystashResult<()> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Some(expiry(ttl)?),
        };
        self.entries.lock().insert(key, entry);
        debug!(key, ?ttl, "Stored key in memory");
        Ok(())
    }

    async fn delete(&self, key: &str) -> KeystashResult<bool> {
        let mut entries = self.entries.lock();
        let existed = entries.live_entry(key).is_some();
        entries.map.remove(key);
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> KeystashResult<bool> {
        let mut entries = self.entries.lock();
        Ok(entries.live_entry(key).is_some())
    }

    async fn ttl(&self, key: &str) -> KeystashResult<Option<Duration>> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        Ok(entries
            .live_entry(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now)))
    }

    async fn incr_window(&self, key: &str, window: Duration) -> KeystashResult<u64> {
        let expires_at = expiry(window)?;
        let mut entries = self.entries.lock();
        let current = match entries.live_entry(key) {
            Some(entry) => std::str::from_utf8(&entry.value)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| {
                    KeystashError::Store(format!("value at '{key}' is not an integer"))
                })?,
            None => 0,
        };

        let next = current.checked_add(1).ok_or_else(|| {
            KeystashError::Store(format!("increment of '{key}' would overflow"))
        })?;
        entries.insert(
            key,
            Entry {
                value: next.to_string().into_bytes(),
                expires_at: Some(expires_at),
            },
        );
        Ok(next)
    }

    async fn ping(&self) -> KeystashResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
