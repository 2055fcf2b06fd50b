//! # Keystash Cache
//!
//! Cache-aside access to an external key-value store.
//!
//! [`CacheAside`] looks a key up in a [`CacheStore`], falls back to a
//! [`RecordSource`] on a miss, and writes the record back with the
//! namespace's TTL. Updates go to the source first and invalidate the key
//! afterwards. Expiry, eviction, and atomicity belong to the store.

mod accessor;
pub mod metrics;
mod memory_store;
mod rate_limiter;
mod redis_store;
mod source;
mod store;

pub use accessor::{CacheAside, CachePolicy};
pub use memory_store::InMemoryCacheStore;
pub use rate_limiter::{FixedWindowRateLimiter, RateLimitDecision};
pub use redis_store::{create_pool, RedisCacheStore};
pub use source::RecordSource;
pub use store::{CacheExt, CacheStore};
