//! Shared fixtures for cache-aside integration tests.

use async_trait::async_trait;
use keystash_cache::RecordSource;
use keystash_core::{KeystashError, KeystashResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A user record as stored in the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

impl User {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// In-memory user table that counts how often it is read.
#[derive(Default)]
pub struct UserTable {
    rows: Mutex<HashMap<String, User>>,
    fetches: AtomicUsize,
    fail_persist: bool,
}

impl UserTable {
    pub fn with_rows(rows: &[(&str, &str)]) -> Self {
        let table = Self::default();
        {
            let mut guard = table.rows.lock();
            for (id, name) in rows {
                guard.insert((*id).to_string(), User::named(name));
            }
        }
        table
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn row(&self, id: &str) -> Option<User> {
        self.rows.lock().get(id).cloned()
    }
}

#[async_trait]
impl RecordSource for UserTable {
    type Record = User;

    async fn fetch(&self, identifier: &str) -> KeystashResult<Option<User>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().get(identifier).cloned())
    }

    async fn persist(&self, identifier: &str, record: &User) -> KeystashResult<()> {
        if self.fail_persist {
            return Err(KeystashError::source_failure("users", "write rejected"));
        }
        self.rows.lock().insert(identifier.to_string(), record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "users"
    }
}
