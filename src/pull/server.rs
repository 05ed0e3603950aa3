use crate::{
    config::PullConfig,
    error::{PullError, RelayError, Result},
    state::PoseStateStore,
};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handlers::{
    cors_middleware, health_handler, not_found_handler, pose_handler, viewer_handler,
};

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) store: Arc<PoseStateStore>,
    pub(crate) pose_path: Arc<str>,
}

/// HTTP server answering pose snapshot requests
pub struct PoseServer {
    pub(crate) config: PullConfig,
    pub(crate) store: Arc<PoseStateStore>,
}

impl PoseServer {
    pub fn new(config: PullConfig, store: Arc<PoseStateStore>) -> Self {
        Self { config, store }
    }

    /// Routes with CORS applied to every response, including the fallback
    pub fn router(&self) -> Router {
        let state = ServerState {
            store: Arc::clone(&self.store),
            pose_path: Arc::from(self.config.path.as_str()),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/viewer", get(viewer_handler))
            .route(&self.config.path, get(pose_handler))
            .fallback(not_found_handler)
            .layer(middleware::from_fn(cors_middleware))
            .with_state(state)
    }

    /// Bind the listening socket. Failure here is fatal for the pull server only.
    pub async fn bind(&self) -> std::result::Result<TcpListener, PullError> {
        let addr = self.config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| PullError::BindFailed {
                address: addr.clone(),
                source: e,
            })?;

        info!(
            "Pose pull server listening on http://{}{}",
            listener.local_addr().map(|a| a.to_string()).unwrap_or(addr),
            self.config.path
        );
        Ok(listener)
    }

    /// Serve requests on an already bound listener until shutdown
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> std::result::Result<(), PullError> {
        serve_router(self.router(), listener, shutdown).await
    }

    /// Bind and serve
    pub async fn start(self, shutdown: CancellationToken) -> std::result::Result<(), PullError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }
}

/// Serve a built router until shutdown
pub async fn serve_router(
    app: Router,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> std::result::Result<(), PullError> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| PullError::ServeFailed {
            details: format!("Server error: {}", e),
        })?;

    info!("Pose pull server stopped");
    Ok(())
}

/// Pose server builder for configuration
#[derive(Default)]
pub struct PoseServerBuilder {
    config: Option<PullConfig>,
    store: Option<Arc<PoseStateStore>>,
}

impl PoseServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pull configuration
    pub fn config(mut self, config: PullConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the store the server reads from
    pub fn store(mut self, store: Arc<PoseStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<PoseServer> {
        let config = self.config.ok_or_else(|| {
            RelayError::Pull(PullError::Incomplete {
                what: "pull configuration".to_string(),
            })
        })?;

        let store = self.store.ok_or_else(|| {
            RelayError::Pull(PullError::Incomplete {
                what: "pose state store".to_string(),
            })
        })?;

        if let Err(details) = config.check_path() {
            return Err(RelayError::Pull(PullError::InvalidPath {
                path: config.path,
                details: details.to_string(),
            }));
        }

        Ok(PoseServer::new(config, store))
    }
}
