use super::protocol::read_frame;
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::sink::{DeliveryOutcome, FrameSinkAdapter};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Ingestion counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub connections: u64,
    pub frames_received: u64,
    pub frames_delivered: u64,
    pub malformed: u64,
    pub truncated: u64,
}

/// How a client connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    Disconnected,
    Dropped,
    Shutdown,
}

/// TCP server receiving header-framed RGB video, one client at a time
pub struct FrameIngestServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    accept_timeout: Duration,
    max_frame_bytes: usize,
    stats: IngestStats,
}

impl FrameIngestServer {
    /// Bind the listening socket. Failure here is fatal for the video relay.
    pub async fn bind(config: &IngestConfig) -> Result<Self, IngestError> {
        let address = config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| IngestError::BindFailed {
                address: address.clone(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;

        info!("Frame ingestion listening on {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            accept_timeout: config.accept_timeout(),
            max_frame_bytes: config.max_frame_bytes,
            stats: IngestStats::default(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Serve clients until shutdown.
    ///
    /// The listening socket is closed when this returns; the adapter is handed
    /// back so the caller can release the sink device.
    pub async fn run(
        mut self,
        mut adapter: FrameSinkAdapter,
        shutdown: CancellationToken,
    ) -> (IngestStats, FrameSinkAdapter) {
        info!("Frame ingestion server started");

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = timeout(self.accept_timeout, self.listener.accept()) => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(Ok(connection)) => connection,
                Ok(Err(e)) => {
                    warn!("Failed to accept video client: {}", e);
                    continue;
                }
                Err(_) => {
                    trace!("No video client within {:?}", self.accept_timeout);
                    continue;
                }
            };

            self.stats.connections += 1;
            info!("Video client connected from {}", peer);

            let end = self
                .serve_connection(stream, &mut adapter, &shutdown)
                .await;
            info!("Video client {} finished ({:?})", peer, end);

            if end == ConnectionEnd::Shutdown {
                break;
            }
        }

        info!(
            "Frame ingestion server stopped: {} connections, {} frames, {} malformed, {} truncated",
            self.stats.connections,
            self.stats.frames_received,
            self.stats.malformed,
            self.stats.truncated
        );

        (self.stats, adapter)
    }

    async fn serve_connection(
        &mut self,
        stream: TcpStream,
        adapter: &mut FrameSinkAdapter,
        shutdown: &CancellationToken,
    ) -> ConnectionEnd {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY on video client: {}", e);
        }
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, stream);

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => return ConnectionEnd::Shutdown,
                next = read_frame(&mut reader, self.max_frame_bytes) => next,
            };

            match next {
                Ok(Some(frame)) => {
                    self.stats.frames_received += 1;
                    trace!(
                        "Received frame {} ({}x{})",
                        self.stats.frames_received,
                        frame.width(),
                        frame.height()
                    );
                    if adapter.deliver(&frame).await == DeliveryOutcome::Sent {
                        self.stats.frames_delivered += 1;
                    }
                }
                Ok(None) => return ConnectionEnd::Disconnected,
                Err(e @ IngestError::Truncated { .. }) => {
                    self.stats.truncated += 1;
                    warn!("Dropping video client: {}", e);
                    return ConnectionEnd::Dropped;
                }
                Err(e) => {
                    self.stats.malformed += 1;
                    warn!("Dropping video client: {}", e);
                    return ConnectionEnd::Dropped;
                }
            }
        }
    }
}
