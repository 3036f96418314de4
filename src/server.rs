//! Listener lifecycle and graceful shutdown

use axum::Router;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::Result;

/// Cancellable context shared by the listener and whoever may stop it
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown; idempotent
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once shutdown has been requested
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger `shutdown` on Ctrl-C or SIGTERM
pub fn watch_os_signals(shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl-C"),
            _ = terminate => info!("Received SIGTERM"),
            _ = shutdown.triggered() => return,
        }

        shutdown.trigger();
    });
}

/// Serve `app` until `shutdown` fires, then drain for at most `grace_period`.
///
/// Requests still running when the grace period ends are abandoned.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: ShutdownSignal,
    grace_period: Duration,
) -> Result<()> {
    let drain = {
        let shutdown = shutdown.clone();
        async move {
            shutdown.triggered().await;
            info!(grace_secs = grace_period.as_secs(), "Shutting down server");
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(drain)
        .into_future();
    tokio::pin!(server);

    let deadline = async {
        shutdown.triggered().await;
        tokio::time::sleep(grace_period).await;
    };

    tokio::select! {
        result = &mut server => {
            result?;
            info!("Server stopped");
        }
        _ = deadline => {
            warn!("Grace period elapsed, abandoning in-flight requests");
        }
    }

    Ok(())
}
