use super::http::HttpPoseSender;
use super::udp::UdpPoseSender;
use crate::config::{PoseConfig, PoseDeliveryMode};
use crate::error::TransportError;
use crate::pose::PosePayload;
use crate::state::PoseStateStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The single push channel chosen at startup
pub enum PoseChannel {
    Udp(UdpPoseSender),
    Http(HttpPoseSender),
    None,
}

impl PoseChannel {
    /// Build the channel selected by `pose.transport`
    pub async fn from_config(config: &PoseConfig) -> Result<Self, TransportError> {
        match config.transport {
            PoseDeliveryMode::Udp => Ok(Self::Udp(
                UdpPoseSender::bind(&config.udp.address()).await?,
            )),
            PoseDeliveryMode::Http => Ok(Self::Http(HttpPoseSender::new(&config.http)?)),
            PoseDeliveryMode::None => {
                info!("Pose push disabled; payloads are only available via the pull server");
                Ok(Self::None)
            }
        }
    }

    pub fn mode(&self) -> PoseDeliveryMode {
        match self {
            Self::Udp(_) => PoseDeliveryMode::Udp,
            Self::Http(_) => PoseDeliveryMode::Http,
            Self::None => PoseDeliveryMode::None,
        }
    }
}

/// Delivery counters for the push channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub sent: u64,
    pub failed: u64,
}

/// Stores every payload and pushes it through the configured channel.
///
/// Sends are at-most-once: a failed push is logged and never retried.
pub struct PoseDispatcher {
    store: Arc<PoseStateStore>,
    channel: PoseChannel,
    stats: DispatchStats,
    consecutive_failures: u64,
}

impl PoseDispatcher {
    pub fn new(store: Arc<PoseStateStore>, channel: PoseChannel) -> Self {
        Self {
            store,
            channel,
            stats: DispatchStats::default(),
            consecutive_failures: 0,
        }
    }

    /// Update the pose store, then push the payload. Returns the store update time.
    pub async fn dispatch(&mut self, payload: PosePayload) -> i64 {
        let payload = Arc::new(payload);
        let updated_ms = self.store.set_shared(Arc::clone(&payload));
        self.stats.dispatched += 1;

        let result = match &self.channel {
            PoseChannel::Udp(sender) => sender.send(&payload).await.map(|_| ()),
            PoseChannel::Http(sender) => sender.send(&payload).await.map(|_| ()),
            PoseChannel::None => return updated_ms,
        };

        match result {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    info!(
                        "Pose push recovered after {} failed sends",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                self.stats.sent += 1;
            }
            Err(e) => {
                self.stats.failed += 1;
                self.consecutive_failures += 1;
                if self.consecutive_failures == 1 {
                    warn!("Pose push via {:?} failed: {}", self.channel.mode(), e);
                } else {
                    debug!(
                        "Pose push via {:?} failed ({} in a row): {}",
                        self.channel.mode(),
                        self.consecutive_failures,
                        e
                    );
                }
            }
        }

        updated_ms
    }

    pub fn mode(&self) -> PoseDeliveryMode {
        self.channel.mode()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn store(&self) -> &Arc<PoseStateStore> {
        &self.store
    }

    /// Release the outbound socket or HTTP client
    pub fn close(self) {
        info!(
            "Closing pose {:?} channel ({} dispatched, {} sent, {} failed)",
            self.channel.mode(),
            self.stats.dispatched,
            self.stats.sent,
            self.stats.failed
        );
        drop(self.channel);
    }
}
