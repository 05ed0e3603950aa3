mod dispatcher;
mod http;
mod udp;

pub use dispatcher::{DispatchStats, PoseChannel, PoseDispatcher};
pub use http::HttpPoseSender;
pub use udp::{encode_datagram, UdpPoseSender};
