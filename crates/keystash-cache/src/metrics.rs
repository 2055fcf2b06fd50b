//! Metrics for cache-aside lookups.
//!
//! Counters are labelled by namespace (entity type). Nothing is recorded
//! unless the application installs a `metrics` recorder.

use metrics::{counter, describe_counter};

/// Metric names for the cache layer.
pub mod names {
    /// Lookups answered from the store.
    pub const CACHE_HITS_TOTAL: &str = "keystash_cache_hits_total";
    /// Lookups that fell through to the source.
    pub const CACHE_MISSES_TOTAL: &str = "keystash_cache_misses_total";
    /// Source fetches that returned no record.
    pub const SOURCE_NOT_FOUND_TOTAL: &str = "keystash_source_not_found_total";
    /// Records written back after a miss.
    pub const CACHE_WRITES_TOTAL: &str = "keystash_cache_writes_total";
    /// Write-backs that failed after a successful fetch.
    pub const CACHE_WRITE_FAILURES_TOTAL: &str = "keystash_cache_write_failures_total";
    /// Cached values that could not be decoded.
    pub const CACHE_DECODE_FAILURES_TOTAL: &str = "keystash_cache_decode_failures_total";
    /// Explicit invalidations.
    pub const CACHE_INVALIDATIONS_TOTAL: &str = "keystash_cache_invalidations_total";
    /// Lookups served by the source because the store was unreachable.
    pub const CACHE_FALLBACKS_TOTAL: &str = "keystash_cache_fallbacks_total";
    /// Requests rejected by the rate limiter.
    pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "keystash_rate_limit_rejections_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(
        names::SOURCE_NOT_FOUND_TOTAL,
        "Total number of misses the source of truth could not answer"
    );
    describe_counter!(
        names::CACHE_WRITES_TOTAL,
        "Total number of records written back to the cache"
    );
    describe_counter!(
        names::CACHE_WRITE_FAILURES_TOTAL,
        "Total number of failed write-backs"
    );
    describe_counter!(
        names::CACHE_DECODE_FAILURES_TOTAL,
        "Total number of cached values that failed to decode"
    );
    describe_counter!(
        names::CACHE_INVALIDATIONS_TOTAL,
        "Total number of explicit cache invalidations"
    );
    describe_counter!(
        names::CACHE_FALLBACKS_TOTAL,
        "Total number of lookups served from the source during a store outage"
    );
    describe_counter!(
        names::RATE_LIMIT_REJECTIONS_TOTAL,
        "Total number of requests rejected by the rate limiter"
    );
}

/// Cache metrics recorder.
#[derive(Clone, Copy, Debug)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a cache hit.
    pub fn hit(namespace: &str) {
        counter!(names::CACHE_HITS_TOTAL, "namespace" => namespace.to_string()).increment(1);
    }

    /// Record a cache miss.
    pub fn miss(namespace: &str) {
        counter!(names::CACHE_MISSES_TOTAL, "namespace" => namespace.to_string()).increment(1);
    }

    /// Record a miss the source could not answer.
    pub fn source_not_found(namespace: &str) {
        counter!(names::SOURCE_NOT_FOUND_TOTAL, "namespace" => namespace.to_string())
            .increment(1);
    }

    /// Record a write-back.
    pub fn write(namespace: &str) {
        counter!(names::CACHE_WRITES_TOTAL, "namespace" => namespace.to_string()).increment(1);
    }

    /// Record a failed write-back.
    pub fn write_failure(namespace: &str, error_code: &'static str) {
        counter!(
            names::CACHE_WRITE_FAILURES_TOTAL,
            "namespace" => namespace.to_string(),
            "error_code" => error_code
        )
        .increment(1);
    }

    /// Record an undecodable cached value.
    pub fn decode_failure(namespace: &str) {
        counter!(names::CACHE_DECODE_FAILURES_TOTAL, "namespace" => namespace.to_string())
            .increment(1);
    }

    /// Record an invalidation.
    pub fn invalidation(namespace: &str) {
        counter!(names::CACHE_INVALIDATIONS_TOTAL, "namespace" => namespace.to_string())
            .increment(1);
    }

    /// Record a lookup served from the source during a store outage.
    pub fn fallback(namespace: &str) {
        counter!(names::CACHE_FALLBACKS_TOTAL, "namespace" => namespace.to_string())
            .increment(1);
    }

    /// Record a rate-limited request.
    pub fn rate_limited(scope: &str) {
        counter!(names::RATE_LIMIT_REJECTIONS_TOTAL, "scope" => scope.to_string()).increment(1);
    }
}
