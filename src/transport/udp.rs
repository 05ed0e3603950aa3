use crate::error::TransportError;
use crate::pose::{PoseLandmark, PosePayload};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{info, trace};

#[derive(Serialize)]
struct PoseDatagram<'a> {
    pose_landmarks: Vec<&'a PoseLandmark>,
}

/// Encode a payload as the UDP wire format:
/// `{"pose_landmarks":[{"x":..,"y":..,"z":..,"visibility":..}, ...]}` in landmark index order.
pub fn encode_datagram(payload: &PosePayload) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&PoseDatagram {
        pose_landmarks: payload.landmarks_in_index_order().collect(),
    })
}

/// Best-effort UDP pose pusher
pub struct UdpPoseSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpPoseSender {
    /// Resolve `target` and bind an ephemeral local socket for sending
    pub async fn bind(target: &str) -> Result<Self, TransportError> {
        let target_addr = tokio::net::lookup_host(target)
            .await
            .map_err(|e| TransportError::InvalidTarget {
                target: target.to_string(),
                details: e.to_string(),
            })?
            .next()
            .ok_or_else(|| TransportError::InvalidTarget {
                target: target.to_string(),
                details: "address did not resolve".to_string(),
            })?;

        let local = if target_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(TransportError::UdpBind)?;

        info!("Sending pose datagrams to {}", target_addr);

        Ok(Self {
            socket,
            target: target_addr,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send one datagram, returning the number of bytes written
    pub async fn send(&self, payload: &PosePayload) -> Result<usize, TransportError> {
        let datagram = encode_datagram(payload)?;
        let sent = self
            .socket
            .send_to(&datagram, self.target)
            .await
            .map_err(|source| TransportError::UdpSend {
                target: self.target,
                source,
            })?;

        trace!("Sent {} byte pose datagram to {}", sent, self.target);
        Ok(sent)
    }
}
