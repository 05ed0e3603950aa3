use super::types::{INGEST, POSE_CAPTURE, PULL_SERVER};
use super::{ComponentState, RelayOrchestrator};
use crate::error::{RelayError, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info};

const COMPONENT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

impl RelayOrchestrator {
    /// Release every resource in order: estimator, capture device, ingestion
    /// socket and sink device, outbound pose socket, pull server.
    ///
    /// Each step runs even if an earlier one failed. Returns the process exit
    /// code: 0 when every step succeeded, 1 otherwise.
    pub async fn shutdown(&mut self) -> i32 {
        info!("Beginning graceful shutdown");

        let mut exit_code = 0;

        if let Err(e) = self.stop_pose_capture().await {
            error!("Error stopping {}: {}", POSE_CAPTURE, e);
            exit_code = 1;
        }

        if let Err(e) = self.stop_ingest().await {
            error!("Error stopping {}: {}", INGEST, e);
            exit_code = 1;
        }

        self.close_pose_transport();

        if let Err(e) = self.stop_pull_server().await {
            error!("Error stopping {}: {}", PULL_SERVER, e);
            exit_code = 1;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        exit_code
    }

    async fn stop_pose_capture(&mut self) -> Result<()> {
        self.pose_token.cancel();
        let Some(task) = self.pose_task.take() else {
            return Ok(());
        };
        self.set_component_state(POSE_CAPTURE, ComponentState::Stopping)
            .await;

        let mut capture = match join_component(POSE_CAPTURE, task).await {
            Ok(capture) => capture,
            Err(e) => {
                self.set_component_state(POSE_CAPTURE, ComponentState::Failed)
                    .await;
                return Err(e);
            }
        };

        let closed = capture.close_estimator().await;
        if closed.is_ok() {
            info!("Pose estimator closed");
        }
        let released = capture.release_capture().await;
        if released.is_ok() {
            info!("Capture device released");
        }
        self.dispatcher = Some(capture.into_dispatcher());

        match closed.and(released) {
            Ok(()) => {
                self.set_component_state(POSE_CAPTURE, ComponentState::Stopped)
                    .await;
                Ok(())
            }
            Err(e) => {
                self.set_component_state(POSE_CAPTURE, ComponentState::Failed)
                    .await;
                Err(e.into())
            }
        }
    }

    async fn stop_ingest(&mut self) -> Result<()> {
        self.ingest_token.cancel();
        let Some(task) = self.ingest_task.take() else {
            return Ok(());
        };
        self.set_component_state(INGEST, ComponentState::Stopping)
            .await;

        let (stats, mut adapter) = match join_component(INGEST, task).await {
            Ok(stopped) => stopped,
            Err(e) => {
                self.set_component_state(INGEST, ComponentState::Failed)
                    .await;
                return Err(e);
            }
        };
        info!(
            "Ingestion socket closed ({} frames received, {} delivered)",
            stats.frames_received, stats.frames_delivered
        );

        match adapter.close() {
            Ok(()) => {
                self.set_component_state(INGEST, ComponentState::Stopped)
                    .await;
                Ok(())
            }
            Err(e) => {
                self.set_component_state(INGEST, ComponentState::Failed)
                    .await;
                Err(e.into())
            }
        }
    }

    fn close_pose_transport(&mut self) {
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.close();
        }
    }

    async fn stop_pull_server(&mut self) -> Result<()> {
        self.pull_token.cancel();
        let Some(task) = self.pull_task.take() else {
            return Ok(());
        };
        self.set_component_state(PULL_SERVER, ComponentState::Stopping)
            .await;

        let result = match join_component(PULL_SERVER, task).await {
            Ok(served) => served.map_err(RelayError::from),
            Err(e) => Err(e),
        };

        let state = if result.is_ok() {
            ComponentState::Stopped
        } else {
            ComponentState::Failed
        };
        self.set_component_state(PULL_SERVER, state).await;
        result
    }
}

/// Wait for a component task to hand back its resources, aborting it on timeout
async fn join_component<T>(component: &str, mut task: JoinHandle<T>) -> Result<T> {
    match timeout(COMPONENT_STOP_TIMEOUT, &mut task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RelayError::component(
            component.to_string(),
            format!("task failed: {}", e),
        )),
        Err(_) => {
            task.abort();
            Err(RelayError::component(
                component.to_string(),
                "stop timeout".to_string(),
            ))
        }
    }
}
