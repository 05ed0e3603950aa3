use super::estimator::PoseEstimator;
use super::payload::RawLandmark;
use crate::error::PoseError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Scripted estimator for running the relay without a real model.
///
/// Replays the queued results in order, then reports end of input.
/// Lifecycle calls are appended to a shared log.
pub struct ScriptedEstimator {
    script: VecDeque<Option<Vec<RawLandmark>>>,
    lifecycle: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedEstimator {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Option<Vec<RawLandmark>>>,
    {
        Self {
            script: script.into_iter().collect(),
            lifecycle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared log of `close` / `release_capture` calls
    pub fn lifecycle(&self) -> Arc<Mutex<Vec<&'static str>>> {
        Arc::clone(&self.lifecycle)
    }
}

#[async_trait::async_trait]
impl PoseEstimator for ScriptedEstimator {
    async fn estimate(&mut self) -> Result<Option<Vec<RawLandmark>>, PoseError> {
        match self.script.pop_front() {
            Some(result) => Ok(result),
            None => {
                debug!("Scripted estimator exhausted");
                Err(PoseError::EstimatorClosed)
            }
        }
    }

    async fn close(&mut self) -> Result<(), PoseError> {
        self.lifecycle.lock().push("estimator_closed");
        Ok(())
    }

    async fn release_capture(&mut self) -> Result<(), PoseError> {
        self.lifecycle.lock().push("capture_released");
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
