//! Graceful shutdown: stop accepting on a signal, drain in-flight requests, force after a grace period.

use crate::error::BootstrapError;
use axum::Router;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All in-flight requests completed within the grace period.
    Drained,
    /// The grace period elapsed; remaining connections were dropped.
    Forced,
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

/// Serve `app` until `signal` resolves, then drain for at most `grace`.
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    grace: Duration,
) -> Result<ShutdownOutcome, BootstrapError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.wait_for(|stop| *stop).await;
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut server => {
            flatten(joined)?;
            return Ok(ShutdownOutcome::Drained);
        }
        _ = signal => {}
    }

    tracing::info!(grace_secs = grace.as_secs(), "draining in-flight requests");
    let _ = stop_tx.send(true);
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => {
            flatten(joined)?;
            tracing::info!("shutdown complete");
            Ok(ShutdownOutcome::Drained)
        }
        Err(_) => {
            tracing::warn!("grace period elapsed, forcing shutdown");
            server.abort();
            Ok(ShutdownOutcome::Forced)
        }
    }
}

fn flatten(joined: Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<(), BootstrapError> {
    match joined {
        Ok(res) => Ok(res?),
        Err(e) => Err(BootstrapError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))),
    }
}
