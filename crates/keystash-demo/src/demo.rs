//! Scripted walk-throughs of the cache patterns.

use crate::catalog::{Product, ProductCatalog};
use anyhow::Context;
use keystash_cache::{CacheAside, CacheStore, FixedWindowRateLimiter, RateLimitDecision};
use keystash_config::{CacheConfig, RateLimitConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// What the product cache walk-through observed.
#[derive(Debug)]
pub struct CacheWalkthrough {
    pub first_read: Option<Product>,
    pub second_read: Option<Product>,
    pub ttl_after_miss: Option<Duration>,
    pub after_update: Option<Product>,
    pub missing: Option<Product>,
    pub catalog_queries: u64,
}

/// Miss, hit, update, re-read, and an unknown product.
pub async fn product_cache(
    store: Arc<dyn CacheStore>,
    config: &CacheConfig,
) -> anyhow::Result<CacheWalkthrough> {
    let catalog = Arc::new(ProductCatalog::seeded());
    let products = CacheAside::from_config(store, catalog.clone(), config, "product")?;
    let id = "PROD_123";

    products.invalidate(id).await?;

    let started = Instant::now();
    let first_read = products.get(id).await?;
    info!(product_id = id, elapsed = ?started.elapsed(), "First read (cache miss)");

    let started = Instant::now();
    let second_read = products.get(id).await?;
    info!(product_id = id, elapsed = ?started.elapsed(), "Second read (cache hit)");

    let ttl_after_miss = products.remaining_ttl(id).await?;
    info!(product_id = id, ttl = ?ttl_after_miss, "Cached product TTL");

    let mut repriced = first_read.clone().context("seeded product missing")?;
    repriced.price = 949.99;
    repriced.stock -= 1;
    products.update(id, &repriced).await?;
    info!(product_id = id, price = repriced.price, "Product updated, cache invalidated");

    let after_update = products.get(id).await?;
    info!(
        product_id = id,
        price = ?after_update.as_ref().map(|p| p.price),
        "Read after update"
    );

    let missing = products.get("PROD_404").await?;
    info!(product_id = "PROD_404", found = missing.is_some(), "Unknown product");

    Ok(CacheWalkthrough {
        first_read,
        second_read,
        ttl_after_miss,
        after_update,
        missing,
        catalog_queries: catalog.queries(),
    })
}

/// Counts a burst of requests for one API key.
pub async fn rate_limiting(
    store: Arc<dyn CacheStore>,
    config: &RateLimitConfig,
    subject: &str,
    requests: usize,
) -> anyhow::Result<Vec<RateLimitDecision>> {
    let limiter = FixedWindowRateLimiter::from_config(store, config)?;
    let mut decisions = Vec::with_capacity(requests);

    for _ in 0..requests {
        let decision = limiter.check(subject).await?;
        info!(
            subject,
            allowed = decision.allowed,
            count = decision.count,
            limit = decision.limit,
            "Rate limit check"
        );
        decisions.push(decision);
    }

    Ok(decisions)
}
