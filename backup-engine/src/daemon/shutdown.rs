//! Graceful shutdown handling for SIGTERM and SIGINT.
//!
//! The coordinator owns the cancellation token handed to the HTTP server and
//! the backup scheduler. A backup or restore already holding the operation
//! lock is allowed to finish before the process exits.

use crate::engine::BackupEngine;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token cancelled once a shutdown signal arrives
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for shutdown signal (SIGTERM or SIGINT), then cancel the token
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            _ = self.token.cancelled() => {}
        }

        self.token.cancel();
    }

    /// Wait up to `timeout` for any in-flight backup or restore to release
    /// the operation lock.
    pub async fn drain(&self, engine: &BackupEngine, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, engine.context().lock()).await {
            Ok(_guard) => {
                info!("Graceful shutdown complete");
                true
            }
            Err(_) => {
                warn!("Backup operation still running after {:?}, exiting anyway", timeout);
                false
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
