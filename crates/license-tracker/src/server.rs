//! HTTP server runtime.

use std::future::Future;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::http::{router, AppState};

/// Open the store, bind the configured address and serve until Ctrl-C or
/// SIGTERM.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the address cannot be
/// bound, or the server fails.
pub async fn run(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let listener = TcpListener::bind(config.bind_addr()?).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    serve(listener, state, shutdown_signal()).await
}

/// Serve the application on an already bound listener until `shutdown`
/// completes.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
