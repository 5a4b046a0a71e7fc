//! Keyed store the room state lives in.
//!
//! The relay keeps no room state of its own: every request reads and writes
//! through a [`KeyedStore`], so any number of relay instances can share one
//! backing store.

mod memory_store;
mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::RelayResult;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Live payloads published on one channel. Dropping it unsubscribes.
pub type Subscription = BoxStream<'static, String>;

#[async_trait]
pub trait KeyedStore: Send + Sync + 'static {
    async fn get_string(&self, key: &str) -> RelayResult<Option<String>>;

    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> RelayResult<()>;

    async fn delete_key(&self, key: &str) -> RelayResult<()>;

    /// All fields of a hash; empty when the key does not exist.
    async fn get_all_fields(&self, key: &str) -> RelayResult<HashMap<String, String>>;

    async fn set_field(&self, key: &str, field: &str, value: &str) -> RelayResult<()>;

    /// Restarts the expiry of an existing key. Missing keys are left alone.
    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> RelayResult<()>;

    async fn append_to_list(&self, key: &str, value: &str) -> RelayResult<()>;

    /// The whole list in append order; empty when the key does not exist.
    async fn read_list(&self, key: &str) -> RelayResult<Vec<String>>;

    async fn publish(&self, channel: &str, payload: &str) -> RelayResult<()>;

    async fn subscribe(&self, channel: &str) -> RelayResult<Subscription>;

    async fn ping(&self) -> RelayResult<()>;
}

pub async fn connect(config: &StoreConfig) -> RelayResult<Arc<dyn KeyedStore>> {
    match config.backend {
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.redis_url).await?;
            info!("Connected to redis store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-process memory store; state is not shared between instances");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
