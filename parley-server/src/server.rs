use crate::signaling::{SignalingService, router};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Serves the relay on `listener` until `shutdown` resolves.
///
/// On shutdown open candidate streams are ended first so that graceful
/// shutdown does not wait on them.
pub async fn serve<F>(
    listener: TcpListener,
    service: SignalingService,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(service.clone());
    if let Ok(addr) = listener.local_addr() {
        info!("Relay listening on http://{}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutting down, closing candidate streams");
            service.shutdown();
        })
        .await
}
