use log::{error, info};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::StorageError;
use crate::server::routes::{AppState, router};
use crate::storage::Sandbox;

pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    /// Prepares the server root and binds the listening socket.
    pub async fn new(config: ServerConfig) -> Result<Self, StorageError> {
        let sandbox = Sandbox::open(&config.server_root_path()).inspect_err(|e| {
            error!(
                "Failed to prepare server root {}: {}",
                config.server_root, e
            )
        })?;
        info!("Server root directory: {}", sandbox.root().display());

        let addr = config
            .socket_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("Server bound to {}", addr);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", addr, e);
                return Err(e.into());
            }
        };

        Ok(Self {
            state: Arc::new(AppState { sandbox }),
            listener,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until Ctrl-C.
    pub async fn start(self) -> Result<(), StorageError> {
        info!(
            "Starting RAX file manager on {} (uploads up to {} MB)",
            self.local_addr()?,
            self.config.max_upload_size_mb
        );

        let app = router(self.state, self.config.max_upload_size_bytes());

        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
