/// Number of body landmarks reported per detection
pub const LANDMARK_COUNT: usize = 33;

/// Landmark names in estimator index order
pub const LANDMARK_NAMES: [&str; LANDMARK_COUNT] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

/// Named skeletal segment joining two landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDef {
    pub name: &'static str,
    pub start: &'static str,
    pub end: &'static str,
}

const fn segment(name: &'static str, start: &'static str, end: &'static str) -> SegmentDef {
    SegmentDef { name, start, end }
}

/// Adjacency table used to derive segments from landmarks
pub const SEGMENTS: [SegmentDef; 12] = [
    segment("shoulders", "left_shoulder", "right_shoulder"),
    segment("hips", "left_hip", "right_hip"),
    segment("left_torso", "left_shoulder", "left_hip"),
    segment("right_torso", "right_shoulder", "right_hip"),
    segment("left_upper_arm", "left_shoulder", "left_elbow"),
    segment("left_forearm", "left_elbow", "left_wrist"),
    segment("right_upper_arm", "right_shoulder", "right_elbow"),
    segment("right_forearm", "right_elbow", "right_wrist"),
    segment("left_thigh", "left_hip", "left_knee"),
    segment("left_shin", "left_knee", "left_ankle"),
    segment("right_thigh", "right_hip", "right_knee"),
    segment("right_shin", "right_knee", "right_ankle"),
];

/// Name of the landmark at `index`, if the index is within the fixed table
pub fn landmark_name(index: usize) -> Option<&'static str> {
    LANDMARK_NAMES.get(index).copied()
}
