//! Cache-aside accessor.

use crate::metrics::CacheMetrics;
use crate::{CacheExt, CacheStore, RecordSource};
use keystash_config::CacheConfig;
use keystash_core::{CacheKey, KeyNamespace, KeystashResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Behaviour switches for [`CacheAside`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Serve `get` from the source when the store is unreachable.
    ///
    /// Nothing is written back in that case.
    pub fallback_to_source: bool,
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            fallback_to_source: config.fallback_to_source,
        }
    }
}

/// Read-through cache for one entity type.
///
/// Reads check the store, then the source, writing the source's record back
/// with the namespace TTL. Writes go to the source, then drop the cached
/// key. There is no locking between the two: a `get` racing an `update` can
/// put the pre-update record back until its TTL runs out.
pub struct CacheAside<S: RecordSource> {
    store: Arc<dyn CacheStore>,
    source: Arc<S>,
    namespace: KeyNamespace,
    policy: CachePolicy,
}

impl<S: RecordSource> CacheAside<S> {
    /// Creates an accessor with the default policy.
    pub fn new(store: Arc<dyn CacheStore>, source: Arc<S>, namespace: KeyNamespace) -> Self {
        Self {
            store,
            source,
            namespace,
            policy: CachePolicy::default(),
        }
    }

    /// Creates an accessor for `entity` using the configured prefix, TTL,
    /// and policy.
    pub fn from_config(
        store: Arc<dyn CacheStore>,
        source: Arc<S>,
        config: &CacheConfig,
        entity: &str,
    ) -> KeystashResult<Self> {
        Ok(Self::new(store, source, config.namespace(entity)?).with_policy(config.into()))
    }

    /// Replaces the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the namespace this accessor reads and writes.
    #[must_use]
    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    /// Returns the source of truth.
    #[must_use]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Builds the cache key for an identifier.
    pub fn key(&self, identifier: &str) -> KeystashResult<CacheKey> {
        self.namespace.key(identifier)
    }

    /// Looks up a record, populating the cache on a miss.
    ///
    /// Returns `Ok(None)` when neither the cache nor the source knows the
    /// identifier. Absent records are not cached.
    pub async fn get(&self, identifier: &str) -> KeystashResult<Option<S::Record>> {
        let key = self.key(identifier)?;
        let entity = self.namespace.entity();

        let cached = match self.store.get_raw(key.as_str()).await {
            Ok(cached) => cached,
            Err(e) if e.is_store_unavailable() && self.policy.fallback_to_source => {
                warn!(%key, error = %e, "Store unavailable, reading from source");
                CacheMetrics::fallback(entity);
                return self.source.fetch(identifier).await;
            }
            Err(e) => return Err(e),
        };

        if let Some(bytes) = cached {
            match serde_json::from_slice::<S::Record>(&bytes) {
                Ok(record) => {
                    debug!(%key, "Cache hit");
                    CacheMetrics::hit(entity);
                    return Ok(Some(record));
                }
                Err(e) => {
                    warn!(%key, error = %e, "Cached value failed to decode, refreshing from source");
                    CacheMetrics::decode_failure(entity);
                }
            }
        } else {
            debug!(%key, "Cache miss");
        }

        CacheMetrics::miss(entity);
        self.load_from_source(&key, identifier).await
    }

    /// Removes the cached value. Succeeds whether or not the key existed.
    pub async fn invalidate(&self, identifier: &str) -> KeystashResult<()> {
        let key = self.key(identifier)?;
        let existed = self.store.delete(key.as_str()).await?;
        debug!(%key, existed, "Invalidated");
        CacheMetrics::invalidation(self.namespace.entity());
        Ok(())
    }

    /// Persists a record to the source, then invalidates its cached value.
    ///
    /// If the source write fails the cache is left untouched.
    pub async fn update(&self, identifier: &str, record: &S::Record) -> KeystashResult<()> {
        // Validate before touching the source.
        let key = self.key(identifier)?;

        self.source.persist(identifier, record).await?;
        debug!(%key, source = self.source.name(), "Persisted");

        self.invalidate(identifier).await
    }

    /// Remaining lifetime of the cached value, if any.
    pub async fn remaining_ttl(&self, identifier: &str) -> KeystashResult<Option<Duration>> {
        let key = self.key(identifier)?;
        self.store.ttl(key.as_str()).await
    }

    async fn load_from_source(
        &self,
        key: &CacheKey,
        identifier: &str,
    ) -> KeystashResult<Option<S::Record>> {
        let entity = self.namespace.entity();

        let Some(record) = self.source.fetch(identifier).await? else {
            debug!(%key, source = self.source.name(), "Not found in source");
            CacheMetrics::source_not_found(entity);
            return Ok(None);
        };

        // The fetched record is authoritative; a failed write-back only
        // costs the next reader another fetch.
        match self
            .store
            .set_json(key.as_str(), &record, self.namespace.ttl())
            .await
        {
            Ok(()) => {
                debug!(%key, ttl = ?self.namespace.ttl(), "Cached record from source");
                CacheMetrics::write(entity);
            }
            Err(e) => {
                warn!(%key, error = %e, "Failed to cache record");
                CacheMetrics::write_failure(entity, e.error_code());
            }
        }

        Ok(Some(record))
    }
}

impl<S: RecordSource> std::fmt::Debug for CacheAside<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside")
            .field("backend", &self.store.backend())
            .field("source", &self.source.name())
            .field("namespace", &self.namespace)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryCacheStore;
    use async_trait::async_trait;
    use keystash_core::KeystashError;
    use mockall::{mock, predicate::eq, Sequence};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
    }

    fn ann() -> Profile {
        Profile {
            name: "Ann".to_string(),
        }
    }

    mock! {
        Source {}

        #[async_trait]
        impl RecordSource for Source {
            type Record = Profile;

            async fn fetch(&self, identifier: &str) -> KeystashResult<Option<Profile>>;
            async fn persist(&self, identifier: &str, record: &Profile) -> KeystashResult<()>;
            fn name(&self) -> &'static str;
        }
    }

    mock! {
        Store {}

        #[async_trait]
        impl CacheStore for Store {
            async fn get_raw(&self, key: &str) -> KeystashResult<Option<Vec<u8>>>;
            async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> KeystashResult<()>;
            async fn delete(&self, key: &str) -> KeystashResult<bool>;
            async fn exists(&self, key: &str) -> KeystashResult<bool>;
            async fn ttl(&self, key: &str) -> KeystashResult<Option<Duration>>;
            async fn incr_window(&self, key: &str, window: Duration) -> KeystashResult<u64>;
            async fn ping(&self) -> KeystashResult<()>;
            fn backend(&self) -> &'static str;
        }
    }

    fn users() -> KeyNamespace {
        KeyNamespace::new("user", Duration::from_secs(3600)).unwrap()
    }

    fn source_named(mut source: MockSource) -> MockSource {
        source.expect_name().return_const("mock-source");
        source
    }

    #[tokio::test]
    async fn test_miss_fetches_and_populates() {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut source = MockSource::new();
        source
            .expect_fetch()
            .with(eq("u1"))
            .times(1)
            .returning(|_| Ok(Some(ann())));
        let accessor = CacheAside::new(store.clone(), Arc::new(source_named(source)), users());

        assert_eq!(accessor.get("u1").await.unwrap(), Some(ann()));
        assert_eq!(accessor.get("u1").await.unwrap(), Some(ann()));

        let ttl = store.ttl("user:u1").await.unwrap().unwrap();
        assert!(ttl > Duration::ZERO && ttl <= Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_absent_record_is_not_cached() {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut source = MockSource::new();
        source.expect_fetch().times(2).returning(|_| Ok(None));
        let accessor = CacheAside::new(store.clone(), Arc::new(source_named(source)), users());

        assert_eq!(accessor.get("u404").await.unwrap(), None);
        assert_eq!(accessor.get("u404").await.unwrap(), None);
        assert!(!store.exists("user:u404").await.unwrap());
    }

    #[tokio::test]
    async fn test_undecodable_value_is_refreshed() {
        let store = Arc::new(InMemoryCacheStore::new());
        store
            .set_raw("user:u1", b"not json", Duration::from_secs(60))
            .await
            .unwrap();
        let mut source = MockSource::new();
        source.expect_fetch().times(1).returning(|_| Ok(Some(ann())));
        let accessor = CacheAside::new(store.clone(), Arc::new(source_named(source)), users());

        assert_eq!(accessor.get("u1").await.unwrap(), Some(ann()));
        let repaired: Option<Profile> = store.get_json("user:u1").await.unwrap();
        assert_eq!(repaired, Some(ann()));
    }

    #[tokio::test]
    async fn test_store_unavailable_is_surfaced() {
        let mut store = MockStore::new();
        store
            .expect_get_raw()
            .returning(|_| Err(KeystashError::unavailable("connection refused")));
        store.expect_set_raw().never();
        let mut source = MockSource::new();
        source.expect_fetch().never();
        let accessor = CacheAside::new(Arc::new(store), Arc::new(source_named(source)), users());

        let err = accessor.get("u1").await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[tokio::test]
    async fn test_fallback_reads_source_without_write_back() {
        let mut store = MockStore::new();
        store
            .expect_get_raw()
            .returning(|_| Err(KeystashError::unavailable("timed out")));
        store.expect_set_raw().never();
        let mut source = MockSource::new();
        source.expect_fetch().times(1).returning(|_| Ok(Some(ann())));
        let accessor = CacheAside::new(Arc::new(store), Arc::new(source_named(source)), users())
            .with_policy(CachePolicy {
                fallback_to_source: true,
            });

        assert_eq!(accessor.get("u1").await.unwrap(), Some(ann()));
    }

    #[tokio::test]
    async fn test_command_errors_do_not_fall_back() {
        let mut store = MockStore::new();
        store
            .expect_get_raw()
            .returning(|_| Err(KeystashError::Store("WRONGTYPE".to_string())));
        let mut source = MockSource::new();
        source.expect_fetch().never();
        let accessor = CacheAside::new(Arc::new(store), Arc::new(source_named(source)), users())
            .with_policy(CachePolicy {
                fallback_to_source: true,
            });

        let err = accessor.get("u1").await.unwrap_err();
        assert!(matches!(err, KeystashError::Store(_)));
    }

    #[tokio::test]
    async fn test_failed_write_back_still_returns_record() {
        let mut store = MockStore::new();
        store.expect_get_raw().returning(|_| Ok(None));
        store
            .expect_set_raw()
            .times(1)
            .returning(|_, _, _| Err(KeystashError::unavailable("connection reset")));
        let mut source = MockSource::new();
        source.expect_fetch().returning(|_| Ok(Some(ann())));
        let accessor = CacheAside::new(Arc::new(store), Arc::new(source_named(source)), users());

        assert_eq!(accessor.get("u1").await.unwrap(), Some(ann()));
    }

    #[tokio::test]
    async fn test_update_persists_before_invalidating() {
        let mut seq = Sequence::new();
        let mut source = MockSource::new();
        let mut store = MockStore::new();

        source
            .expect_persist()
            .withf(|id, record| id == "u1" && record.name == "Bea")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        store
            .expect_delete()
            .with(eq("user:u1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));

        let accessor = CacheAside::new(Arc::new(store), Arc::new(source_named(source)), users());
        let bea = Profile {
            name: "Bea".to_string(),
        };
        accessor.update("u1", &bea).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_cache_alone() {
        let mut source = MockSource::new();
        source
            .expect_persist()
            .returning(|_, _| Err(KeystashError::source_failure("users-db", "deadlock")));
        let mut store = MockStore::new();
        store.expect_delete().never();

        let accessor = CacheAside::new(Arc::new(store), Arc::new(source_named(source)), users());
        let err = accessor.update("u1", &ann()).await.unwrap_err();
        assert!(matches!(err, KeystashError::Source { .. }));
    }

    #[tokio::test]
    async fn test_invalidate_absent_key_succeeds() {
        let store = Arc::new(InMemoryCacheStore::new());
        let source = MockSource::new();
        let accessor = CacheAside::new(store, Arc::new(source_named(source)), users());

        accessor.invalidate("u1").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_identifier_rejected() {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut source = MockSource::new();
        source.expect_fetch().never();
        let accessor = CacheAside::new(store, Arc::new(source_named(source)), users());

        let err = accessor.get("").await.unwrap_err();
        assert!(matches!(err, KeystashError::InvalidKey(_)));
    }

    #[test]
    fn test_unbounded_ttl_rejected_at_construction() {
        let config = CacheConfig {
            default_ttl_secs: u64::MAX,
            ..CacheConfig::default()
        };
        let store = Arc::new(InMemoryCacheStore::new());
        let result = CacheAside::from_config(
            store,
            Arc::new(source_named(MockSource::new())),
            &config,
            "wishlist",
        );
        assert!(matches!(result, Err(KeystashError::InvalidKey(_))));
    }

    #[test]
    fn test_policy_from_config() {
        let config = CacheConfig {
            fallback_to_source: true,
            ..CacheConfig::default()
        };
        assert!(CachePolicy::from(&config).fallback_to_source);
    }
}
