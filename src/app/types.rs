/// Component lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// System shutdown reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
}

/// Component names used in the state table
pub const POSE_CAPTURE: &str = "pose_capture";
pub const INGEST: &str = "ingest";
pub const PULL_SERVER: &str = "pull_server";
