//! Shutdown on operator signal.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel `cancel` once `signal` fires.
///
/// A signal listener that fails to install leaves the collector running;
/// it can still be stopped by killing the process.
pub async fn cancel_on_signal<F>(signal: F, cancel: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Ctrl+C received, shutting down");
            cancel.cancel();
        }
        Err(err) => error!(error = %err, "failed to listen for Ctrl+C, shutdown by signal disabled"),
    }
}
