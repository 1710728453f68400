use std::future::Future;
use std::sync::Arc;

use pushr_store::{recover_from_dir, restore_or_empty, save, ReleaseStore};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// pushr release server.
///
/// Owns the store for the life of the process: restored (or empty) on
/// construction, saved once after the listener has shut down.
pub struct PushrServer {
    config: ServerConfig,
    state: AppState,
}

impl PushrServer {
    /// Prepare the data directory and restore the store from its snapshot.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let mut store = restore_or_empty(&config.snapshot_path());
        if store.is_empty() && config.recover_from_data_dir {
            let (recovered, report) = recover_from_dir(&config.data_dir, &config.content_types())?;
            info!(
                indexed = report.indexed,
                skipped = report.skipped.len(),
                "index rebuilt from data directory"
            );
            store = recovered;
        }
        Self::with_store(config, store)
    }

    /// Serve an existing store, skipping snapshot restore.
    pub fn with_store(config: ServerConfig, store: ReleaseStore) -> ServerResult<Self> {
        config.validate()?;
        let state = AppState::new(Arc::new(store), &config);
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &ReleaseStore {
        &self.state.store
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Write the store to its snapshot file.
    pub fn save_snapshot(&self) -> ServerResult<()> {
        save(&self.state.store, &self.config.snapshot_path())?;
        Ok(())
    }

    /// Serve on the configured address until SIGINT or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then save the snapshot.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("pushr server listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!("listener closed, saving snapshot");
        let store = Arc::clone(&self.state.store);
        let path = self.config.snapshot_path();
        tokio::task::spawn_blocking(move || save(&store, &path))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))??;
        Ok(())
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where available.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl-C");
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
                tracing::warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C, shutting down gracefully"),
        _ = terminate => info!("received SIGTERM, shutting down gracefully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushr_store::Payload;

    fn config_in(dir: &std::path::Path) -> ServerConfig {
        ServerConfig {
            data_dir: dir.to_path_buf(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn server_construction() {
        let dir = tempfile::tempdir().unwrap();
        let server = PushrServer::new(config_in(dir.path())).unwrap();
        assert!(server.store().is_empty());
        assert_eq!(server.config().bind_addr.port(), 7000);
        let _router = server.router();
    }

    #[test]
    fn restores_saved_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let server = PushrServer::new(config.clone()).unwrap();
        server
            .store()
            .add_version(
                "test",
                "1.0.0",
                Payload {
                    extension: ".zip".into(),
                    content_type: "application/zip".into(),
                    size: 3,
                },
            )
            .unwrap();
        server.save_snapshot().unwrap();

        let again = PushrServer::new(config).unwrap();
        assert_eq!(again.store().snapshot(), server.store().snapshot());
    }

    #[test]
    fn recovers_from_data_dir_when_snapshot_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("test-1.2.3.zip"), b"abc").unwrap();

        let plain = PushrServer::new(config_in(dir.path())).unwrap();
        assert!(plain.store().is_empty());

        let config = ServerConfig {
            recover_from_data_dir: true,
            ..config_in(dir.path())
        };
        let server = PushrServer::new(config).unwrap();
        assert_eq!(server.store().version("test", "1.2.3").unwrap().size, 3);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            chunk_size: 0,
            ..config_in(dir.path())
        };
        assert!(matches!(PushrServer::new(config), Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn graceful_shutdown_saves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let snapshot = config.snapshot_path();
        let server = PushrServer::new(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        server.serve_on(listener, async {}).await.unwrap();
        assert!(snapshot.exists());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn shutdown_save_runs_off_the_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let server = PushrServer::new(config.clone()).unwrap();
        server
            .store()
            .add_version(
                "test",
                "2.0.0",
                Payload {
                    extension: ".tgz".into(),
                    content_type: "application/gzip".into(),
                    size: 5,
                },
            )
            .unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        server.serve_on(listener, async {}).await.unwrap();

        let restored = PushrServer::new(config).unwrap();
        assert_eq!(restored.store().version("test", "2.0.0").unwrap().size, 5);
    }
}
