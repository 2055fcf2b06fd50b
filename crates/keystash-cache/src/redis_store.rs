//! Redis-backed cache store.

use crate::CacheStore;
use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config, Pool, Runtime};
use keystash_config::RedisConfig;
use keystash_core::{KeystashError, KeystashResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Create a Redis connection pool and verify the server answers.
pub async fn create_pool(config: &RedisConfig) -> KeystashResult<Pool> {
    info!("Creating Redis connection pool...");

    let pool = Config::from_url(&config.url)
        .builder()
        .map_err(|e| KeystashError::Configuration(format!("Invalid Redis config: {e}")))?
        .max_size(config.pool_size)
        .wait_timeout(Some(config.timeout()))
        .create_timeout(Some(config.timeout()))
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| KeystashError::Configuration(format!("Failed to create pool: {e}")))?;

    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut *conn).await?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Redis-based cache store.
///
/// Owns its connection pool; dropping the store closes the pool.
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Arc<Pool>,
}

impl RedisCacheStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the pool from configuration and wrap it.
    pub async fn connect(config: &RedisConfig) -> KeystashResult<Self> {
        Ok(Self::new(create_pool(config).await?))
    }

    async fn conn(&self) -> KeystashResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    /// Redis expiries are whole seconds; sub-second TTLs round up to one.
    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get_raw(&self, key: &str) -> KeystashResult<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;

        match &value {
            Some(_) => debug!(key, "Redis hit"),
            None => debug!(key, "Redis miss"),
        }

        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> KeystashResult<()> {
        let mut conn = self.conn().await?;
        let ttl_secs = Self::ttl_secs(ttl);

        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;

        debug!(key, ttl_secs, "Stored key");
        Ok(())
    }

    async fn delete(&self, key: &str) -> KeystashResult<bool> {
        let mut conn = self.conn().await?;
        let deleted: i64 = conn.del(key).await?;

        debug!(key, deleted = deleted > 0, "Deleted key");
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> KeystashResult<bool> {
        let mut conn = self.conn().await?;
        Ok(conn.exists(key).await?)
    }

    async fn ttl(&self, key: &str) -> KeystashResult<Option<Duration>> {
        let mut conn = self.conn().await?;
        // -2: no such key, -1: no expiry
        let millis: i64 = conn.pttl(key).await?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    async fn incr_window(&self, key: &str, window: Duration) -> KeystashResult<u64> {
        let mut conn = self.conn().await?;

        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(key, 1u64)
            .cmd("EXPIRE")
            .arg(key)
            .arg(Self::ttl_secs(window))
            .ignore()
            .query_async(&mut *conn)
            .await?;

        Ok(count)
    }

    async fn ping(&self) -> KeystashResult<()> {
        let mut conn = self.conn().await?;
        let pong: String = redis::cmd("PING").query_async(&mut *conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(KeystashError::Store(format!("unexpected PING reply: {pong}")))
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("pool_size", &self.pool.status().max_size)
            .finish()
    }
}
