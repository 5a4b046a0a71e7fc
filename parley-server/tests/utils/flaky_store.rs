use async_trait::async_trait;
use parley_server::store::{KeyedStore, MemoryStore, Subscription};
use parley_server::{RelayError, RelayResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Store that fails a configurable number of operations before delegating
/// to a [`MemoryStore`], or fails everything while marked down.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failures_left: Arc<AtomicUsize>,
    down: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` operations fail with a store outage.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Operations attempted so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> RelayResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(RelayError::StoreUnavailable("store is down".into()));
        }
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(RelayError::StoreUnavailable("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyedStore for FlakyStore {
    async fn get_string(&self, key: &str) -> RelayResult<Option<String>> {
        self.check()?;
        self.inner.get_string(key).await
    }

    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()> {
        self.check()?;
        self.inner.set_string(key, value, ttl).await
    }

    async fn delete_key(&self, key: &str) -> RelayResult<()> {
        self.check()?;
        self.inner.delete_key(key).await
    }

    async fn get_all_fields(&self, key: &str) -> RelayResult<HashMap<String, String>> {
        self.check()?;
        self.inner.get_all_fields(key).await
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> RelayResult<()> {
        self.check()?;
        self.inner.set_field(key, field, value).await
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> RelayResult<()> {
        self.check()?;
        self.inner.refresh_ttl(key, ttl).await
    }

    async fn append_to_list(&self, key: &str, value: &str) -> RelayResult<()> {
        self.check()?;
        self.inner.append_to_list(key, value).await
    }

    async fn read_list(&self, key: &str) -> RelayResult<Vec<String>> {
        self.check()?;
        self.inner.read_list(key).await
    }

    async fn publish(&self, channel: &str, payload: &str) -> RelayResult<()> {
        self.check()?;
        self.inner.publish(channel, payload).await
    }

    async fn subscribe(&self, channel: &str) -> RelayResult<Subscription> {
        self.check()?;
        self.inner.subscribe(channel).await
    }

    async fn ping(&self) -> RelayResult<()> {
        self.check()?;
        self.inner.ping().await
    }
}
