use std::sync::Arc;

use pod_store::ContentStore;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// Content store HTTP server.
pub struct PodStoreServer {
    config: ServerConfig,
    store: Arc<dyn ContentStore>,
}

impl PodStoreServer {
    pub fn new(config: ServerConfig, store: Arc<dyn ContentStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState {
            store: Arc::clone(&self.store),
            max_object_size: self.config.max_object_size,
        })
    }

    /// Bind the configured address and serve requests.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve requests on an already-bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> ServerResult<()> {
        let app = self.router();
        let addr = listener.local_addr()?;
        tracing::info!(%addr, max_object_size = self.config.max_object_size, "content store listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
