//! Startup and shutdown sequence of the daemon.
//!
//! Registrations made by dynamic update never expire, so every path that
//! publishes must also end in an unpublish.

use std::future::Future;
use std::io;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use shared::types::ServiceRecord;
use crate::api::routes::{self, AppState};
use crate::discovery::ServiceDiscovery;
use crate::error::DiscoveryError;

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("failed to bind API listener to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Publish(#[from] DiscoveryError),
}

/// Binds the API listener and then publishes `record`.
///
/// Nothing is published when the listener cannot be bound.
pub async fn start(
    discovery: &dyn ServiceDiscovery,
    record: &ServiceRecord,
    listen: &str,
) -> Result<TcpListener, StartError> {
    let listener = TcpListener::bind(listen).await.map_err(|source| StartError::Bind {
        addr: listen.to_string(),
        source,
    })?;
    tracing::info!("API listening on {}", listen);

    discovery.publish(record).await?;
    Ok(listener)
}

/// Serves the API until `shutdown` resolves, then unpublishes the instance
/// in `state`.
pub async fn run<F>(state: AppState, listener: TcpListener, shutdown: F) -> Result<(), DiscoveryError>
where
    F: Future<Output = &'static str>,
{
    let discovery = state.discovery.clone();
    let record = state.instance.clone();
    let app = routes::router(state);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    let received = shutdown.await;
    tracing::info!("{} received, shutting down", received);

    cancel.cancel();
    let _ = server_handle.await;

    discovery.unpublish(&record).await
}

/// Resolves with the signal name on the first SIGINT, SIGTERM or SIGHUP.
///
/// Handlers are installed before this returns.
pub fn shutdown_signal() -> io::Result<impl Future<Output = &'static str>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
            _ = hangup.recv() => "SIGHUP",
        }
    })
}
