use crate::error::SinkError;
use crate::frame::Frame;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Output device bound to one resolution and frame rate
#[async_trait::async_trait]
pub trait SinkDevice: Send {
    /// Bound (width, height)
    fn dimensions(&self) -> (u32, u32);

    /// Forward one frame; the frame matches the bound dimensions
    async fn send(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Wait for the device's next frame slot
    async fn sleep_until_next_frame(&mut self);

    /// Release the device
    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Opens sink devices at a given resolution
pub trait SinkDeviceFactory: Send + Sync {
    fn open(&self, width: u32, height: u32, fps: u32) -> Result<Box<dyn SinkDevice>, SinkError>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Fixed-rate slot timer used to pace device sends
pub struct FramePacer {
    ticker: Interval,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        let period = Duration::from_micros(1_000_000u64 / fps.max(1) as u64);
        let mut ticker = interval(period);
        // Late frames push the schedule back rather than bursting to catch up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker }
    }

    pub fn period(&self) -> Duration {
        self.ticker.period()
    }

    /// Wait for the next slot
    pub async fn wait(&mut self) {
        self.ticker.tick().await;
    }
}

/// Factory used when no virtual camera backend is compiled in
pub struct UnavailableSinkFactory {
    reason: String,
}

impl UnavailableSinkFactory {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SinkDeviceFactory for UnavailableSinkFactory {
    fn open(&self, _width: u32, _height: u32, _fps: u32) -> Result<Box<dyn SinkDevice>, SinkError> {
        Err(SinkError::Unavailable {
            details: self.reason.clone(),
        })
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
