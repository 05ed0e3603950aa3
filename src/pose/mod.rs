mod capture;
mod estimator;
pub mod landmarks;
mod mock;
mod payload;

pub use capture::{CaptureStats, PoseCaptureLoop, TickOutcome, ESTIMATOR_ERROR_BACKOFF};
pub use estimator::{open_estimator, parse_estimate_line, JsonLinesEstimator, PoseEstimator};
pub use landmarks::{LANDMARK_COUNT, LANDMARK_NAMES, SEGMENTS};
pub use mock::ScriptedEstimator;
pub use payload::{
    round_landmark_value, PoseLandmark, PosePayload, PoseSegment, RawLandmark, LANDMARK_PRECISION,
};
