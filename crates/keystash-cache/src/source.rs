//! Secondary source of truth consulted on a cache miss.

use async_trait::async_trait;
use keystash_core::KeystashResult;
use serde::{de::DeserializeOwned, Serialize};

/// Authoritative store behind the cache, typically a database.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Record type held by the source. Cached values are its JSON form.
    type Record: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Fetch the record for an identifier.
    ///
    /// Returns `None` when the source has no such record.
    async fn fetch(&self, identifier: &str) -> KeystashResult<Option<Self::Record>>;

    /// Persist a record under an identifier.
    async fn persist(&self, identifier: &str, record: &Self::Record) -> KeystashResult<()>;

    /// Name used in logs and errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
