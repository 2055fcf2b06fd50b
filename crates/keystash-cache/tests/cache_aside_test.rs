//! Cache-aside behaviour against the in-process store.

mod common;

use common::{User, UserTable};
use keystash_cache::{CacheAside, CacheExt, CacheStore, InMemoryCacheStore};
use keystash_config::CacheConfig;
use keystash_core::{KeyNamespace, KeystashError};
use std::sync::Arc;
use std::time::Duration;

fn accessor(
    store: &Arc<InMemoryCacheStore>,
    table: UserTable,
) -> (CacheAside<UserTable>, Arc<UserTable>) {
    let table = Arc::new(table);
    let ns = KeyNamespace::new("user", Duration::from_secs(3600)).unwrap();
    (CacheAside::new(store.clone(), table.clone(), ns), table)
}

#[tokio::test]
async fn second_get_is_served_from_cache() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (users, table) = accessor(&store, UserTable::with_rows(&[("u1", "Ann")]));

    let first = users.get("u1").await.unwrap();
    let second = users.get("u1").await.unwrap();

    assert_eq!(first, Some(User::named("Ann")));
    assert_eq!(second, first);
    assert_eq!(table.fetches(), 1);
}

#[tokio::test]
async fn miss_leaves_value_with_positive_ttl() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (users, _) = accessor(&store, UserTable::with_rows(&[("u1", "Ann")]));

    users.get("u1").await.unwrap();

    let cached: Option<User> = store.get_json("user:u1").await.unwrap();
    assert_eq!(cached, Some(User::named("Ann")));
    let ttl = users.remaining_ttl("u1").await.unwrap().unwrap();
    assert!(ttl > Duration::ZERO);
}

#[tokio::test]
async fn invalidate_forces_source_read() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (users, table) = accessor(&store, UserTable::with_rows(&[("u1", "Ann")]));

    users.get("u1").await.unwrap();
    users.invalidate("u1").await.unwrap();
    users.get("u1").await.unwrap();

    assert_eq!(table.fetches(), 2);
}

#[tokio::test]
async fn invalidate_absent_key_is_ok() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (users, _) = accessor(&store, UserTable::default());

    users.invalidate("u1").await.unwrap();
    users.invalidate("u1").await.unwrap();
}

#[tokio::test]
async fn update_then_get_returns_new_record() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (users, table) = accessor(&store, UserTable::with_rows(&[("u1", "Ann")]));

    users.get("u1").await.unwrap();
    users.update("u1", &User::named("Bea")).await.unwrap();

    assert!(!store.exists("user:u1").await.unwrap());
    assert_eq!(users.get("u1").await.unwrap(), Some(User::named("Bea")));
    assert_eq!(table.row("u1"), Some(User::named("Bea")));
}

#[tokio::test]
async fn failed_update_keeps_cached_value() {
    let store = Arc::new(InMemoryCacheStore::new());
    store
        .set_json("user:u1", &User::named("Ann"), Duration::from_secs(60))
        .await
        .unwrap();
    let (users, _) = accessor(&store, UserTable::failing_writes());

    let err = users.update("u1", &User::named("Bea")).await.unwrap_err();

    assert!(matches!(err, KeystashError::Source { .. }));
    assert!(store.exists("user:u1").await.unwrap());
}

#[tokio::test]
async fn unknown_identifier_is_absent_and_not_cached() {
    let store = Arc::new(InMemoryCacheStore::new());
    let (users, table) = accessor(&store, UserTable::default());

    assert_eq!(users.get("u404").await.unwrap(), None);
    assert!(!store.exists("user:u404").await.unwrap());
    assert!(store.is_empty());

    users.get("u404").await.unwrap();
    assert_eq!(table.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn expired_value_is_refetched() {
    let store = Arc::new(InMemoryCacheStore::new());
    let config = CacheConfig::default();
    let table = Arc::new(UserTable::with_rows(&[("PROD_123", "iPhone 15 Pro")]));
    let products = CacheAside::from_config(store.clone(), table.clone(), &config, "search").unwrap();

    products.get("PROD_123").await.unwrap();
    tokio::time::advance(Duration::from_secs(901)).await;
    products.get("PROD_123").await.unwrap();

    assert_eq!(products.namespace().ttl(), Duration::from_secs(900));
    assert_eq!(table.fetches(), 2);
}

#[tokio::test]
async fn namespaces_do_not_collide() {
    let store = Arc::new(InMemoryCacheStore::new());
    let config = CacheConfig {
        key_prefix: Some("shop".to_string()),
        ..CacheConfig::default()
    };
    let table = Arc::new(UserTable::with_rows(&[("42", "Ann")]));
    let users = CacheAside::from_config(store.clone(), table.clone(), &config, "user").unwrap();
    let sessions = CacheAside::from_config(store.clone(), table.clone(), &config, "session").unwrap();

    users.get("42").await.unwrap();
    sessions.get("42").await.unwrap();

    assert!(store.exists("shop:user:42").await.unwrap());
    assert!(store.exists("shop:session:42").await.unwrap());
    assert_eq!(table.fetches(), 2);
}
