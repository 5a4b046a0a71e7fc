use anyhow::{Context, Result};
use parley_core::{ClientId, RoomId};
use parley_server::config::RelayConfig;
use parley_server::room::{DEFAULT_WORKER_IDLE, RetryPolicy};
use parley_server::{
    KeyedStore, MemoryStore, RelayDirectory, RoomManager, RoomPolicy, ServiceSettings,
    SignalingService, server,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Level;

/// Timeout for anything a test waits on (ms).
pub const WAIT_TIMEOUT_MS: u64 = 5000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Room policy with millisecond backoff so retry tests stay fast.
pub fn fast_policy() -> RoomPolicy {
    RoomPolicy {
        ttl: Duration::from_secs(15 * 60),
        retry: RetryPolicy {
            max_retries: 3,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
    }
}

pub fn memory_store() -> Arc<dyn KeyedStore> {
    Arc::new(MemoryStore::new())
}

pub fn test_rooms(store: Arc<dyn KeyedStore>) -> RoomManager {
    RoomManager::new(store, fast_policy(), DEFAULT_WORKER_IDLE)
}

pub fn test_service(store: Arc<dyn KeyedStore>) -> SignalingService {
    test_service_with_relay(store, RelayConfig::default())
}

pub fn test_service_with_relay(
    store: Arc<dyn KeyedStore>,
    relay: RelayConfig,
) -> SignalingService {
    SignalingService::new(
        test_rooms(store.clone()),
        store,
        RelayDirectory::new(relay),
        ServiceSettings {
            service_name: "parley-test".into(),
            keepalive: Duration::from_secs(1),
        },
    )
}

pub fn room(name: &str) -> RoomId {
    RoomId::parse(name).expect("valid room id")
}

pub fn client(name: &str) -> ClientId {
    ClientId::parse(name).expect("valid client id")
}

/// A relay served over real TCP on an ephemeral port.
pub struct TestRelay {
    pub base_url: String,
    pub service: SignalingService,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestRelay {
    pub async fn start(store: Arc<dyn KeyedStore>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind test listener")?;
        let addr = listener.local_addr()?;
        let service = test_service(store);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::serve(listener, service.clone(), async move {
            let _ = shutdown_rx.await;
        }));

        Ok(Self {
            base_url: format!("http://{addr}"),
            service,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_millis(WAIT_TIMEOUT_MS), &mut self.handle)
            .await
            .context("Relay did not shut down in time")???;
        Ok(())
    }
}
