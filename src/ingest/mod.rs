mod protocol;
mod server;

pub use protocol::{encode_frame, read_frame, FrameHeader, DEFAULT_MAX_FRAME_BYTES, HEADER_LEN};
pub use server::{FrameIngestServer, IngestStats};
