use super::types::{INGEST, POSE_CAPTURE, PULL_SERVER};
use super::{ComponentState, RelayOrchestrator};
use crate::error::{RelayError, Result};
use crate::ingest::FrameIngestServer;
use crate::pose::{open_estimator, PoseCaptureLoop};
use crate::pull::{serve_router, PoseServerBuilder};
use crate::sink::{self, FrameSinkAdapter};
use crate::transport::{PoseChannel, PoseDispatcher};
use std::sync::Arc;
use tracing::{error, info, warn};

impl RelayOrchestrator {
    /// Register the enabled components
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing relay components");

        let mut states = self.component_states.lock().await;
        if self.config.pose.enabled {
            states.insert(POSE_CAPTURE.to_string(), ComponentState::Stopped);
        }
        if self.config.ingest.enabled {
            states.insert(INGEST.to_string(), ComponentState::Stopped);
        }
        if self.config.pull.enabled {
            states.insert(PULL_SERVER.to_string(), ComponentState::Stopped);
        }
        let registered = states.len();
        drop(states);

        if registered == 0 {
            return Err(RelayError::system("All components are disabled"));
        }

        info!("{} components registered", registered);
        Ok(())
    }

    /// Start every registered component.
    ///
    /// Each start is independent. This fails only when nothing could start.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting avatar relay");

        if self.get_component_state(POSE_CAPTURE).await.is_some() {
            self.start_component(POSE_CAPTURE).await;
        }
        if self.get_component_state(INGEST).await.is_some() {
            self.start_component(INGEST).await;
        }
        if self.get_component_state(PULL_SERVER).await.is_some() {
            self.start_component(PULL_SERVER).await;
        }

        let running = self.running_components().await;
        if running == 0 {
            error!("No relay component could be started");
            return Err(RelayError::system("No relay component could be started"));
        }

        info!("Avatar relay started ({} components running)", running);
        Ok(())
    }

    async fn start_component(&mut self, component: &str) {
        self.set_component_state(component, ComponentState::Starting)
            .await;

        let result = match component {
            POSE_CAPTURE => self.start_pose_capture().await,
            INGEST => self.start_ingest().await,
            PULL_SERVER => self.start_pull_server().await,
            other => Err(RelayError::component(other, "unknown component")),
        };

        match result {
            Ok(()) => {
                // The task may already have finished and recorded its own state
                if self
                    .transition_component_state(
                        component,
                        ComponentState::Starting,
                        ComponentState::Running,
                    )
                    .await
                {
                    info!("{} component started", component);
                } else {
                    info!("{} component finished during startup", component);
                }
            }
            Err(e) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("Failed to start {} component: {}", component, e);
            }
        }
    }

    async fn start_pose_capture(&mut self) -> Result<()> {
        let mut estimator = match self.estimator.take() {
            Some(estimator) => estimator,
            None => open_estimator(&self.config.estimator).await?,
        };

        let channel = match PoseChannel::from_config(&self.config.pose).await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = estimator.close().await {
                    warn!("Failed to close estimator: {}", close_err);
                }
                return Err(e.into());
            }
        };

        let dispatcher = PoseDispatcher::new(Arc::clone(&self.store), channel);
        let capture = PoseCaptureLoop::new(estimator, dispatcher, self.config.pose.tick_interval());

        let token = self.pose_token.clone();
        let states = Arc::clone(&self.component_states);
        self.pose_task = Some(tokio::spawn(async move {
            let capture = capture.run(token.clone()).await;
            if !token.is_cancelled() {
                info!("Pose estimator input ended, pose capture idle");
                states
                    .lock()
                    .await
                    .insert(POSE_CAPTURE.to_string(), ComponentState::Stopped);
            }
            capture
        }));

        Ok(())
    }

    async fn start_ingest(&mut self) -> Result<()> {
        let server = FrameIngestServer::bind(&self.config.ingest).await?;
        self.ingest_addr = Some(server.local_addr());

        let factory = match self.sink_factory.take() {
            Some(factory) => factory,
            None => sink::default_factory(&self.config.sink),
        };
        let adapter = FrameSinkAdapter::new(factory, self.config.sink.fps);

        self.ingest_task = Some(tokio::spawn(
            server.run(adapter, self.ingest_token.clone()),
        ));
        Ok(())
    }

    async fn start_pull_server(&mut self) -> Result<()> {
        let server = PoseServerBuilder::new()
            .config(self.config.pull.clone())
            .store(Arc::clone(&self.store))
            .build()?;

        let app = server.router();
        let listener = server.bind().await?;
        self.pull_addr = Some(listener.local_addr()?);

        let token = self.pull_token.clone();
        self.pull_task = Some(tokio::spawn(async move {
            let result = serve_router(app, listener, token).await;
            if let Err(e) = &result {
                error!("Pose pull server error: {}", e);
            }
            result
        }));
        Ok(())
    }
}
