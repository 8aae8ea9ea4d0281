use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::controller::{TaskController, TerminationAction};

/// Installs SIGINT/SIGTERM handling that calls `terminate_after(0, Exit)`.
/// Returns a handle the caller should abort once `run_until_termination`
/// returns, so the listener doesn't outlive the engine — the Rust
/// equivalent of "restoring the original handlers on exit".
pub fn install_signal_handlers(controller: Arc<TaskController>) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("received SIGINT, shutting down");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                }
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received ctrl-c, shutting down");
            }
        }
        controller.terminate_after(Duration::ZERO, TerminationAction::Exit);
    })
}
