//! # Keystash Demo
//!
//! Runs the cache-aside and rate-limiting walk-throughs against Redis, or
//! against the in-process store when `redis.enabled` is false.

use keystash_cache::{metrics, CacheStore, InMemoryCacheStore, RedisCacheStore};
use keystash_config::{AppConfig, ConfigLoader, ObservabilityConfig};
use std::sync::Arc;
use tracing::{error, info};

mod catalog;
mod demo;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Demo failed: {:#}", e);
        eprintln!("Demo failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ConfigLoader::from_default_location()?.get().await;

    init_logging(&config.observability);

    info!("Starting Keystash demo...");
    info!("Version: {}", config.app.version);
    info!("Environment: {}", config.app.environment);

    if config.observability.metrics_enabled {
        metrics::register_metrics();
    }

    let store = build_store(&config).await?;
    store.ping().await?;
    info!(backend = store.backend(), "Store ready");

    let report = demo::product_cache(store.clone(), &config.cache).await?;
    info!(
        catalog_queries = report.catalog_queries,
        "Product cache walk-through complete"
    );

    let decisions = demo::rate_limiting(store, &config.rate_limit, "api_key_abc123", 3).await?;
    let allowed = decisions.iter().filter(|d| d.allowed).count();
    info!(allowed, total = decisions.len(), "Rate limiting walk-through complete");

    Ok(())
}

/// Builds the store handle passed to every component.
async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    if config.redis.enabled {
        Ok(Arc::new(RedisCacheStore::connect(&config.redis).await?))
    } else {
        info!("Redis disabled, using in-process store");
        Ok(Arc::new(InMemoryCacheStore::new()))
    }
}

fn init_logging(config: &ObservabilityConfig) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{level},keystash=debug", level = config.log_level))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}
