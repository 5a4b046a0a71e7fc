use crate::config::Config;
use crate::relay::RelayDirectory;
use crate::room::{DEFAULT_WORKER_IDLE, RoomManager, RoomPolicy};
use crate::store::KeyedStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub service_name: String,
    /// Interval of SSE keep-alive comments on candidate streams.
    pub keepalive: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            service_name: "parley-relay".to_string(),
            keepalive: Duration::from_secs(15),
        }
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            service_name: config.server.service_name.clone(),
            keepalive: config.room.keepalive(),
        }
    }
}

struct SignalingInner {
    rooms: RoomManager,
    store: Arc<dyn KeyedStore>,
    relay: RelayDirectory,
    settings: ServiceSettings,
    shutdown: CancellationToken,
}

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(
        rooms: RoomManager,
        store: Arc<dyn KeyedStore>,
        relay: RelayDirectory,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                rooms,
                store,
                relay,
                settings,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn KeyedStore>) -> Self {
        let rooms = RoomManager::new(store.clone(), config.room.policy(), config.room.worker_idle());
        let relay = RelayDirectory::new(config.relay.clone());
        Self::new(rooms, store, relay, ServiceSettings::from(config))
    }

    /// Default policies over `store`, with the given relay directory.
    pub fn with_store(store: Arc<dyn KeyedStore>, relay: RelayDirectory) -> Self {
        let rooms = RoomManager::new(store.clone(), RoomPolicy::default(), DEFAULT_WORKER_IDLE);
        Self::new(rooms, store, relay, ServiceSettings::default())
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.inner.rooms
    }

    pub fn store(&self) -> &Arc<dyn KeyedStore> {
        &self.inner.store
    }

    pub fn relay(&self) -> &RelayDirectory {
        &self.inner.relay
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.inner.settings
    }

    /// Fires when the service shuts down; open candidate streams end.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}
