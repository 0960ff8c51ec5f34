use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use identity_service::models::GlobalConfig;
use identity_service::services::{
    secrets::COOKIE_SECRET_KEY, GlobalConfigStore, MockStore, SecretProvisioner, StoreError,
};
use secrecy::ExposeSecret;
use tokio::sync::Barrier;

/// Holds the first two reads until both callers have missed, so both go on
/// to insert.
struct RaceStore {
    inner: MockStore,
    barrier: Barrier,
    reads: AtomicUsize,
    inserted: AtomicUsize,
    duplicates: AtomicUsize,
}

impl RaceStore {
    fn new() -> Self {
        Self {
            inner: MockStore::new(),
            barrier: Barrier::new(2),
            reads: AtomicUsize::new(0),
            inserted: AtomicUsize::new(0),
            duplicates: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GlobalConfigStore for RaceStore {
    async fn get_by_key(&self, key: &str) -> Result<Option<GlobalConfig>, StoreError> {
        let read = self.inner.get_by_key(key).await;
        if self.reads.fetch_add(1, Ordering::SeqCst) < 2 {
            self.barrier.wait().await;
        }
        read
    }

    async fn insert(&self, config: &GlobalConfig) -> Result<(), StoreError> {
        let result = self.inner.insert(config).await;
        match &result {
            Ok(()) => self.inserted.fetch_add(1, Ordering::SeqCst),
            Err(StoreError::Duplicate) => self.duplicates.fetch_add(1, Ordering::SeqCst),
            Err(_) => 0,
        };
        result
    }
}

#[tokio::test]
async fn test_concurrent_starters_converge_on_one_secret() {
    let store = Arc::new(RaceStore::new());
    let first = SecretProvisioner::new(store.clone());
    let second = SecretProvisioner::new(store.clone());

    let (a, b) = tokio::join!(first.cookie_secret(), second.cookie_secret());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.expose_secret(), b.expose_secret());
    assert_eq!(store.inserted.load(Ordering::SeqCst), 1);
    assert_eq!(store.duplicates.load(Ordering::SeqCst), 1);
    // two misses plus exactly one re-read by the loser
    assert_eq!(store.reads.load(Ordering::SeqCst), 3);

    let stored = store
        .inner
        .get_by_key(COOKIE_SECRET_KEY)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.value, a.expose_secret().as_str());
}

#[tokio::test]
async fn test_existing_secret_is_reused() {
    let store = Arc::new(MockStore::new());
    store
        .insert(&GlobalConfig {
            key: COOKIE_SECRET_KEY.to_string(),
            value: "already-there".to_string(),
        })
        .await
        .unwrap();

    let secret = SecretProvisioner::new(store)
        .cookie_secret()
        .await
        .unwrap();
    assert_eq!(secret.expose_secret(), "already-there");
}

#[tokio::test]
async fn test_store_failure_is_reported() {
    let store = Arc::new(MockStore::new());
    store.set_unavailable(true);

    assert!(SecretProvisioner::new(store).cookie_secret().await.is_err());
}
