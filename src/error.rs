use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Pose error: {0}")]
    Pose(#[from] PoseError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Pull server error: {0}")]
    Pull(#[from] PullError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl RelayError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while reading the framed video protocol
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to bind ingest listener on {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection closed after {received} of {expected} {section} bytes")]
    Truncated {
        section: &'static str,
        received: usize,
        expected: usize,
    },

    #[error("Malformed frame header {width}x{height}: {details}")]
    MalformedHeader {
        width: u32,
        height: u32,
        details: String,
    },

    #[error("Read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid frame: {0}")]
    Frame(#[from] FrameError),
}

/// Frame construction errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGB")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Frame dimensions {width}x{height} overflow the addressable size")]
    Overflow { width: u32, height: u32 },
}

/// Virtual camera device errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to open virtual camera {device} at {width}x{height}@{fps}: {details}")]
    DeviceOpen {
        device: String,
        width: u32,
        height: u32,
        fps: u32,
        details: String,
    },

    #[error("Failed to send frame to virtual camera: {details}")]
    Send { details: String },

    #[error("Frame {frame_width}x{frame_height} does not match device {device_width}x{device_height}")]
    DimensionMismatch {
        frame_width: u32,
        frame_height: u32,
        device_width: u32,
        device_height: u32,
    },

    #[error("Virtual camera backend unavailable: {details}")]
    Unavailable { details: String },
}

/// Pose estimation errors
#[derive(Error, Debug)]
pub enum PoseError {
    #[error("Failed to initialize pose estimator: {details}")]
    EstimatorInit { details: String },

    #[error("Estimator produced an unreadable result: {details}")]
    InvalidEstimate { details: String },

    #[error("Estimator input closed")]
    EstimatorClosed,

    #[error("Estimator read failed: {0}")]
    Read(#[from] std::io::Error),
}

/// Pose push transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind UDP socket: {0}")]
    UdpBind(#[source] std::io::Error),

    #[error("UDP send to {target} failed: {source}")]
    UdpSend {
        target: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid push target {target}: {details}")]
    InvalidTarget { target: String, details: String },

    #[error("HTTP push failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP push rejected with status {status}")]
    HttpStatus { status: u16 },

    #[error("Payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Pull server errors
#[derive(Error, Debug)]
pub enum PullError {
    #[error("Failed to bind pull server on {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Pull server failed: {details}")]
    ServeFailed { details: String },

    #[error("Invalid pull path '{path}': {details}")]
    InvalidPath { path: String, details: String },

    #[error("Pull server is missing {what}")]
    Incomplete { what: String },
}

pub type Result<T> = std::result::Result<T, RelayError>;
