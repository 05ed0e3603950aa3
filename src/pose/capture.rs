use super::estimator::PoseEstimator;
use super::payload::PosePayload;
use crate::clock::now_ms;
use crate::error::PoseError;
use crate::transport::PoseDispatcher;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause after a failed estimate before asking again
pub const ESTIMATOR_ERROR_BACKOFF: Duration = Duration::from_millis(100);

const STATS_LOG_INTERVAL: u64 = 500;

/// Counters for the capture loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub ticks: u64,
    pub detections: u64,
    pub empty_ticks: u64,
    pub estimator_errors: u64,
}

/// Result of a single capture tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A payload was built and handed to the dispatcher
    Dispatched { updated_ms: i64 },
    /// The estimator saw no body; nothing was stored or sent
    NoDetection,
    /// The estimate failed; the loop backs off and continues
    EstimatorError,
    /// The estimator has no more input
    Finished,
}

/// Sequential estimate → build → dispatch → pace loop
pub struct PoseCaptureLoop {
    estimator: Box<dyn PoseEstimator>,
    dispatcher: PoseDispatcher,
    tick_interval: Duration,
    stats: CaptureStats,
}

impl PoseCaptureLoop {
    pub fn new(
        estimator: Box<dyn PoseEstimator>,
        dispatcher: PoseDispatcher,
        tick_interval: Duration,
    ) -> Self {
        Self {
            estimator,
            dispatcher,
            tick_interval,
            stats: CaptureStats::default(),
        }
    }

    /// Run one tick
    pub async fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        match self.estimator.estimate().await {
            Ok(Some(landmarks)) => {
                let payload = PosePayload::from_landmarks(&landmarks, now_ms());
                debug!(
                    "Estimated {} landmarks, {} segments",
                    payload.landmarks().len(),
                    payload.segments().len()
                );
                self.stats.detections += 1;
                let updated_ms = self.dispatcher.dispatch(payload).await;
                TickOutcome::Dispatched { updated_ms }
            }
            Ok(None) => {
                self.stats.empty_ticks += 1;
                TickOutcome::NoDetection
            }
            Err(PoseError::EstimatorClosed) => {
                info!("Estimator {} has no more input", self.estimator.name());
                TickOutcome::Finished
            }
            Err(e) => {
                self.stats.estimator_errors += 1;
                warn!("Ignoring failed pose estimate: {}", e);
                TickOutcome::EstimatorError
            }
        }
    }

    /// Tick until the estimator finishes or shutdown is requested.
    ///
    /// Hands the loop back so the caller can release its resources in order.
    pub async fn run(mut self, shutdown: CancellationToken) -> Self {
        info!(
            "Pose capture loop started (estimator {}, transport {:?}, tick {:?})",
            self.estimator.name(),
            self.dispatcher.mode(),
            self.tick_interval
        );

        loop {
            let outcome = tokio::select! {
                _ = shutdown.cancelled() => break,
                outcome = self.tick() => outcome,
            };

            let pause = match outcome {
                TickOutcome::Finished => break,
                TickOutcome::EstimatorError => ESTIMATOR_ERROR_BACKOFF,
                TickOutcome::Dispatched { .. } | TickOutcome::NoDetection => self.tick_interval,
            };

            if self.stats.ticks % STATS_LOG_INTERVAL == 0 {
                let dispatch = self.dispatcher.stats();
                info!(
                    "Pose stats: {} ticks, {} detections, {} empty, {} estimator errors, {} sent, {} failed sends",
                    self.stats.ticks,
                    self.stats.detections,
                    self.stats.empty_ticks,
                    self.stats.estimator_errors,
                    dispatch.sent,
                    dispatch.failed
                );
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(pause) => {}
            }
        }

        info!(
            "Pose capture loop stopped after {} ticks ({} detections)",
            self.stats.ticks, self.stats.detections
        );
        self
    }

    pub async fn close_estimator(&mut self) -> Result<(), PoseError> {
        self.estimator.close().await
    }

    pub async fn release_capture(&mut self) -> Result<(), PoseError> {
        self.estimator.release_capture().await
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn dispatcher(&self) -> &PoseDispatcher {
        &self.dispatcher
    }

    /// Give up the dispatcher so its socket can be closed separately
    pub fn into_dispatcher(self) -> PoseDispatcher {
        self.dispatcher
    }
}
