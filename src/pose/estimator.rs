use super::payload::RawLandmark;
use crate::config::{EstimatorConfig, EstimatorSource};
use crate::error::PoseError;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

/// Black-box producer of one landmark result set per tick.
///
/// The estimator owns whatever capture device feeds it, so shutdown closes
/// the estimator first and then releases the device.
#[async_trait::async_trait]
pub trait PoseEstimator: Send {
    /// Estimate the current pose. `Ok(None)` means nothing was detected.
    async fn estimate(&mut self) -> Result<Option<Vec<RawLandmark>>, PoseError>;

    /// Release the estimation model
    async fn close(&mut self) -> Result<(), PoseError> {
        Ok(())
    }

    /// Release the capture device feeding the estimator
    async fn release_capture(&mut self) -> Result<(), PoseError> {
        Ok(())
    }

    /// Name used in logs
    fn name(&self) -> &str;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LandmarkRecord {
    Tuple([f64; 4]),
    Object {
        x: f64,
        y: f64,
        z: f64,
        #[serde(default)]
        visibility: f64,
    },
}

impl From<LandmarkRecord> for RawLandmark {
    fn from(record: LandmarkRecord) -> Self {
        match record {
            LandmarkRecord::Tuple([x, y, z, visibility]) => RawLandmark::new(x, y, z, visibility),
            LandmarkRecord::Object {
                x,
                y,
                z,
                visibility,
            } => RawLandmark::new(x, y, z, visibility),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EstimateLine {
    Wrapped {
        pose_landmarks: Option<Vec<LandmarkRecord>>,
    },
    Bare(Option<Vec<LandmarkRecord>>),
}

/// Parse one line of estimator output.
///
/// Accepts a bare array of `[x, y, z, visibility]` tuples or
/// `{"pose_landmarks": [{"x":..,"y":..,"z":..,"visibility":..}]}`.
/// Blank lines, `null` and empty arrays mean no detection.
pub fn parse_estimate_line(line: &str) -> Result<Option<Vec<RawLandmark>>, PoseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let parsed: EstimateLine =
        serde_json::from_str(line).map_err(|e| PoseError::InvalidEstimate {
            details: e.to_string(),
        })?;

    let records = match parsed {
        EstimateLine::Wrapped { pose_landmarks } => pose_landmarks,
        EstimateLine::Bare(records) => records,
    };

    Ok(records
        .filter(|records| !records.is_empty())
        .map(|records| records.into_iter().map(RawLandmark::from).collect()))
}

/// Estimator fed by newline-delimited JSON results from an external process
pub struct JsonLinesEstimator<R> {
    lines: Option<Lines<R>>,
    source: String,
    lines_read: u64,
}

impl<R> JsonLinesEstimator<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            lines: Some(reader.lines()),
            source: source.into(),
            lines_read: 0,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

#[async_trait::async_trait]
impl<R> PoseEstimator for JsonLinesEstimator<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn estimate(&mut self) -> Result<Option<Vec<RawLandmark>>, PoseError> {
        let lines = self.lines.as_mut().ok_or(PoseError::EstimatorClosed)?;

        match lines.next_line().await? {
            Some(line) => {
                self.lines_read += 1;
                parse_estimate_line(&line)
            }
            None => {
                debug!("Estimator input {} reached end of stream", self.source);
                self.lines = None;
                Err(PoseError::EstimatorClosed)
            }
        }
    }

    async fn close(&mut self) -> Result<(), PoseError> {
        if self.lines.take().is_some() {
            info!(
                "Closed estimator input {} after {} lines",
                self.source, self.lines_read
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.source
    }
}

/// Open the estimator described by the configuration
pub async fn open_estimator(config: &EstimatorConfig) -> Result<Box<dyn PoseEstimator>, PoseError> {
    match config.source {
        EstimatorSource::Stdin => {
            info!("Reading pose estimates from stdin");
            Ok(Box::new(JsonLinesEstimator::new(
                BufReader::new(tokio::io::stdin()),
                "stdin",
            )))
        }
        EstimatorSource::File => {
            let file = tokio::fs::File::open(&config.path)
                .await
                .map_err(|e| PoseError::EstimatorInit {
                    details: format!("cannot open {}: {}", config.path, e),
                })?;
            info!("Reading pose estimates from {}", config.path);
            Ok(Box::new(JsonLinesEstimator::new(
                BufReader::new(file),
                config.path.clone(),
            )))
        }
    }
}
