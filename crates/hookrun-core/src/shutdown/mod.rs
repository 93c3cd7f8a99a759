//! Signal-derived cancellation and queue release.

use std::{future::Future, sync::Arc};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hookrun_queue::QueueBackend;

/// Derive a context that is cancelled when `parent` is, or when `signal` resolves.
///
/// The listener task exits as soon as either context is cancelled, so a derived context that
/// is cancelled early does not leak a waiting task.
pub fn derive<F>(parent: &CancellationToken, signal: F) -> CancellationToken
where
    F: Future<Output = ()> + Send + 'static,
{
    let derived = parent.child_token();
    let token = derived.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = signal => {
                info!("termination signal received");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
    derived
}

/// Derive a context cancelled on Ctrl-C and, on unix, on SIGTERM.
pub fn with_termination_signals(parent: &CancellationToken) -> CancellationToken {
    derive(parent, termination())
}

async fn termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => log_ctrl_c(res),
                    _ = sigterm.recv() => debug!("SIGTERM"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    }

    log_ctrl_c(tokio::signal::ctrl_c().await);
}

fn log_ctrl_c(res: std::io::Result<()>) {
    match res {
        Ok(()) => debug!("SIGINT"),
        Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
    }
}

/// Disconnect `queue` once `ctx` is cancelled.
///
/// Await the returned handle to make sure the connection was released before exiting.
pub fn release_on_cancel(ctx: &CancellationToken, queue: Arc<dyn QueueBackend>) -> JoinHandle<()> {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        ctx.cancelled().await;
        queue.disconnect().await;
        debug!(backend = %queue.kind(), "queue released");
    })
}
