//! Product catalog standing in for the database behind the cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keystash_cache::RecordSource;
use keystash_core::KeystashResult;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Simulated query latency of the catalog database.
const QUERY_LATENCY: Duration = Duration::from_millis(50);

/// Product details as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub stock: u32,
    pub rating: f32,
    pub reviews_count: u32,
    pub updated_at: DateTime<Utc>,
}

/// In-memory product table.
#[derive(Debug, Default)]
pub struct ProductCatalog {
    products: RwLock<HashMap<String, Product>>,
    queries: AtomicU64,
}

impl ProductCatalog {
    /// Catalog seeded with a few electronics.
    #[must_use]
    pub fn seeded() -> Self {
        let now = Utc::now();
        let rows: [(&str, &str, f64, &str, u32, f32, u32); 3] = [
            ("PROD_123", "iPhone 15 Pro", 999.99, "Apple", 50, 4.8, 1250),
            ("PROD_456", "Galaxy S24", 849.00, "Samsung", 75, 4.6, 980),
            ("PROD_789", "Pixel 8", 699.00, "Google", 30, 4.5, 610),
        ];

        let products = rows
            .into_iter()
            .map(|(id, name, price, brand, stock, rating, reviews_count)| {
                let product = Product {
                    id: id.to_string(),
                    name: name.to_string(),
                    price,
                    description: format!("{name} by {brand}"),
                    category: "Electronics".to_string(),
                    brand: brand.to_string(),
                    stock,
                    rating,
                    reviews_count,
                    updated_at: now,
                };
                (id.to_string(), product)
            })
            .collect();

        Self {
            products: RwLock::new(products),
            queries: AtomicU64::new(0),
        }
    }

    /// Number of reads served so far.
    #[must_use]
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordSource for ProductCatalog {
    type Record = Product;

    async fn fetch(&self, identifier: &str) -> KeystashResult<Option<Product>> {
        tokio::time::sleep(QUERY_LATENCY).await;
        self.queries.fetch_add(1, Ordering::Relaxed);
        debug!(product_id = identifier, "Catalog query");
        Ok(self.products.read().get(identifier).cloned())
    }

    async fn persist(&self, identifier: &str, record: &Product) -> KeystashResult<()> {
        tokio::time::sleep(QUERY_LATENCY).await;
        let mut product = record.clone();
        product.updated_at = Utc::now();
        self.products.write().insert(identifier.to_string(), product);
        debug!(product_id = identifier, "Catalog write");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "product-catalog"
    }
}
