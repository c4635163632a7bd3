//! HTTP server lifecycle: bind, serve, shut down.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::{router, AppState};
use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;
use crate::uploads::LocalFileStore;

/// Open storage, prepare the upload root and build the shared state.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the upload
/// directories cannot be created.
pub fn build_state(config: &Config) -> Result<AppState> {
    let storage = Storage::open(config.database_path())?;

    let files = LocalFileStore::new(
        config.upload_root(),
        config.uploads.url_prefix.clone(),
        config.uploads.max_file_size_bytes,
    );
    files.ensure_dirs()?;

    Ok(AppState::new(storage, Arc::new(files)))
}

/// Serve the API on `config.server.bind` until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if startup fails or the listener cannot be bound.
pub async fn serve(config: &Config) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr()?).await?;
    serve_on(listener, config, shutdown_signal()).await
}

/// Serve the API on an already bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if startup fails or the server stops abnormally.
pub async fn serve_on(
    listener: TcpListener,
    config: &Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let state = build_state(config)?;
    let app = router(state, config);

    info!(
        addr = %listener.local_addr()?,
        database = %config.database_path().display(),
        uploads = %config.upload_root().display(),
        "kidtalk listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
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
                tracing::warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
