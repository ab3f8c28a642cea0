//! Server startup: connectivity check and the serve loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::api::{create_router, AppState};
use crate::store::DirectoryStore;

/// How long the startup check may take before it is reported as failed.
pub const STARTUP_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the connectivity check, giving up after `limit`. Failure is logged
/// and reported but never stops the server; later requests fail on their own.
pub async fn check_connectivity(store: &dyn DirectoryStore, limit: Duration) -> bool {
    match tokio::time::timeout(limit, store.ping()).await {
        Ok(Ok(())) => {
            info!("Connected to the database.");
            true
        }
        Ok(Err(e)) => {
            error!("Error connecting to the database: {}", e);
            false
        }
        Err(_) => {
            error!(
                "Error connecting to the database: no answer within {}s",
                limit.as_secs_f64()
            );
            false
        }
    }
}

/// Run the startup check in the background so it never delays the listener.
pub fn spawn_connectivity_check(
    store: Arc<dyn DirectoryStore>,
    limit: Duration,
) -> JoinHandle<bool> {
    tokio::spawn(async move { check_connectivity(store.as_ref(), limit).await })
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Server is running on http://{}", addr);
    }

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
