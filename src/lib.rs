pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pose;
pub mod pull;
pub mod sink;
pub mod state;
pub mod transport;

pub use app::{ComponentState, RelayOrchestrator, ShutdownHandle, ShutdownReason};
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use frame::Frame;
pub use ingest::FrameIngestServer;
pub use pose::{PoseCaptureLoop, PoseEstimator, PosePayload};
pub use pull::{PoseServer, PoseServerBuilder};
pub use sink::{FrameSinkAdapter, SinkDevice, SinkDeviceFactory};
pub use state::{PoseStateSnapshot, PoseStateStore};
pub use transport::{PoseChannel, PoseDispatcher};
