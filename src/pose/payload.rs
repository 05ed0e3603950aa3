use super::landmarks::{landmark_name, LANDMARK_COUNT, LANDMARK_NAMES, SEGMENTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decimal places kept on every transmitted landmark field
pub const LANDMARK_PRECISION: i32 = 6;

/// Round a value to [`LANDMARK_PRECISION`] decimal places
pub fn round_landmark_value(value: f64) -> f64 {
    let scale = 10f64.powi(LANDMARK_PRECISION);
    (value * scale).round() / scale
}

/// One landmark as reported by the estimator, before naming or rounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawLandmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

impl RawLandmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
        }
    }
}

/// Named, rounded landmark carried in a payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseLandmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

impl From<RawLandmark> for PoseLandmark {
    fn from(raw: RawLandmark) -> Self {
        Self {
            x: round_landmark_value(raw.x),
            y: round_landmark_value(raw.y),
            z: round_landmark_value(raw.z),
            visibility: round_landmark_value(raw.visibility),
        }
    }
}

/// Skeletal line derived from two present landmarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSegment {
    pub start_name: String,
    pub end_name: String,
    pub start_point: PoseLandmark,
    pub end_point: PoseLandmark,
}

/// Timestamped snapshot of every detected landmark and derived segment for a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosePayload {
    timestamp_ms: i64,
    landmarks: BTreeMap<String, PoseLandmark>,
    segments: BTreeMap<String, PoseSegment>,
}

impl PosePayload {
    /// Build a payload from an estimator result in topological index order.
    ///
    /// Entries past the fixed landmark table are ignored.
    pub fn from_landmarks(raw: &[RawLandmark], timestamp_ms: i64) -> Self {
        let named = raw
            .iter()
            .take(LANDMARK_COUNT)
            .enumerate()
            .filter_map(|(index, landmark)| landmark_name(index).map(|name| (name, *landmark)));

        Self::from_named_landmarks(named, timestamp_ms)
    }

    /// Build a payload from landmarks keyed by name; unknown names are dropped
    pub fn from_named_landmarks<'a, I>(named: I, timestamp_ms: i64) -> Self
    where
        I: IntoIterator<Item = (&'a str, RawLandmark)>,
    {
        let landmarks: BTreeMap<String, PoseLandmark> = named
            .into_iter()
            .filter(|(name, _)| LANDMARK_NAMES.contains(name))
            .map(|(name, raw)| (name.to_string(), PoseLandmark::from(raw)))
            .collect();

        let segments = SEGMENTS
            .iter()
            .filter_map(|def| {
                let start_point = *landmarks.get(def.start)?;
                let end_point = *landmarks.get(def.end)?;
                Some((
                    def.name.to_string(),
                    PoseSegment {
                        start_name: def.start.to_string(),
                        end_name: def.end.to_string(),
                        start_point,
                        end_point,
                    },
                ))
            })
            .collect();

        Self {
            timestamp_ms,
            landmarks,
            segments,
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn landmarks(&self) -> &BTreeMap<String, PoseLandmark> {
        &self.landmarks
    }

    pub fn segments(&self) -> &BTreeMap<String, PoseSegment> {
        &self.segments
    }

    pub fn landmark(&self, name: &str) -> Option<&PoseLandmark> {
        self.landmarks.get(name)
    }

    /// Present landmarks ordered by their estimator index
    pub fn landmarks_in_index_order(&self) -> impl Iterator<Item = &PoseLandmark> + '_ {
        LANDMARK_NAMES
            .iter()
            .filter_map(move |name| self.landmarks.get(*name))
    }
}
