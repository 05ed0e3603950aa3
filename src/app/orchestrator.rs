use super::types::{ComponentState, ShutdownReason};
use crate::config::RelayConfig;
use crate::error::PullError;
use crate::ingest::IngestStats;
use crate::pose::{PoseCaptureLoop, PoseEstimator};
use crate::sink::{FrameSinkAdapter, SinkDeviceFactory};
use crate::state::PoseStateStore;
use crate::transport::PoseDispatcher;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

type SharedShutdownSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

/// Main application coordinator for the three relay components.
///
/// Pose capture, video ingestion and the pull server start and stop
/// independently; a failure in one never takes down the others.
pub struct RelayOrchestrator {
    pub(super) config: RelayConfig,
    pub(super) store: Arc<PoseStateStore>,

    // Injected capabilities, consumed at start
    pub(super) estimator: Option<Box<dyn PoseEstimator>>,
    pub(super) sink_factory: Option<Arc<dyn SinkDeviceFactory>>,

    // Running components
    pub(super) pose_task: Option<JoinHandle<PoseCaptureLoop>>,
    pub(super) ingest_task: Option<JoinHandle<(IngestStats, FrameSinkAdapter)>>,
    pub(super) pull_task: Option<JoinHandle<std::result::Result<(), PullError>>>,
    pub(super) dispatcher: Option<PoseDispatcher>,
    pub(super) ingest_addr: Option<SocketAddr>,
    pub(super) pull_addr: Option<SocketAddr>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: SharedShutdownSender,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) pose_token: CancellationToken,
    pub(super) ingest_token: CancellationToken,
    pub(super) pull_token: CancellationToken,
}

impl RelayOrchestrator {
    pub fn new(config: RelayConfig) -> Self {
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            store: Arc::new(PoseStateStore::new()),
            estimator: None,
            sink_factory: None,
            pose_task: None,
            ingest_task: None,
            pull_task: None,
            dispatcher: None,
            ingest_addr: None,
            pull_addr: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            pose_token: CancellationToken::new(),
            ingest_token: CancellationToken::new(),
            pull_token: CancellationToken::new(),
        }
    }

    /// Use this estimator instead of the configured input source
    pub fn with_estimator(mut self, estimator: Box<dyn PoseEstimator>) -> Self {
        info!("Using injected pose estimator '{}'", estimator.name());
        self.estimator = Some(estimator);
        self
    }

    /// Use this sink factory instead of the platform virtual camera
    pub fn with_sink_factory(mut self, factory: Arc<dyn SinkDeviceFactory>) -> Self {
        info!("Using injected sink factory '{}'", factory.name());
        self.sink_factory = Some(factory);
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Store shared by the dispatcher and the pull server
    pub fn store(&self) -> Arc<PoseStateStore> {
        Arc::clone(&self.store)
    }

    /// Address the ingestion server bound to, once started
    pub fn ingest_addr(&self) -> Option<SocketAddr> {
        self.ingest_addr
    }

    /// Address the pull server bound to, once started
    pub fn pull_addr(&self) -> Option<SocketAddr> {
        self.pull_addr
    }

    /// Handle that can end `run` from another task
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: Arc::clone(&self.shutdown_sender),
        }
    }
}

/// Requests a graceful shutdown of a running orchestrator
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: SharedShutdownSender,
}

impl ShutdownHandle {
    /// Returns false if shutdown was already requested
    pub async fn request(&self, reason: ShutdownReason) -> bool {
        match self.sender.lock().await.take() {
            Some(sender) => sender.send(reason).is_ok(),
            None => false,
        }
    }
}
