mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::{RelayOrchestrator, ShutdownHandle};
pub use types::{ComponentState, ShutdownReason, INGEST, POSE_CAPTURE, PULL_SERVER};
