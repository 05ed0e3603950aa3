use super::device::{SinkDevice, SinkDeviceFactory};
use crate::error::SinkError;
use crate::frame::Frame;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// What happened to a delivered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// No device is open; the frame was discarded
    Dropped,
    /// The device rejected the frame
    Failed,
}

/// Sink adapter statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub send_failures: u64,
    pub device_opens: u64,
    pub open_failures: u64,
}

/// Resolution-aware front for the virtual camera.
///
/// Opens a device sized to the first frame and reopens it whenever the frame
/// dimensions change. When opening fails the adapter keeps running without a
/// device and drops frames until a later dimension change opens one.
pub struct FrameSinkAdapter {
    factory: Arc<dyn SinkDeviceFactory>,
    fps: u32,
    device: Option<Box<dyn SinkDevice>>,
    requested: Option<(u32, u32)>,
    stats: SinkStats,
}

impl FrameSinkAdapter {
    pub fn new(factory: Arc<dyn SinkDeviceFactory>, fps: u32) -> Self {
        Self {
            factory,
            fps,
            device: None,
            requested: None,
            stats: SinkStats::default(),
        }
    }

    /// Forward a frame to the device, reopening it on a resolution change
    pub async fn deliver(&mut self, frame: &Frame) -> DeliveryOutcome {
        let dimensions = frame.dimensions();
        if self.requested != Some(dimensions) {
            self.reopen(dimensions);
        }

        let Some(device) = self.device.as_mut() else {
            self.stats.frames_dropped += 1;
            trace!(
                "No virtual camera open, dropping {}x{} frame",
                dimensions.0,
                dimensions.1
            );
            return DeliveryOutcome::Dropped;
        };

        let outcome = match device.send(frame).await {
            Ok(()) => {
                self.stats.frames_sent += 1;
                DeliveryOutcome::Sent
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!("Virtual camera send failed: {}", e);
                DeliveryOutcome::Failed
            }
        };

        device.sleep_until_next_frame().await;
        outcome
    }

    fn reopen(&mut self, (width, height): (u32, u32)) {
        if let Some(mut device) = self.device.take() {
            let (old_width, old_height) = device.dimensions();
            info!(
                "Frame size changed from {}x{} to {}x{}, reopening virtual camera",
                old_width, old_height, width, height
            );
            if let Err(e) = device.close() {
                warn!("Failed to close virtual camera: {}", e);
            }
        }

        self.requested = Some((width, height));

        match self.factory.open(width, height, self.fps) {
            Ok(device) => {
                self.stats.device_opens += 1;
                info!(
                    "Virtual camera ({}) opened at {}x{}@{}fps",
                    self.factory.name(),
                    width,
                    height,
                    self.fps
                );
                self.device = Some(device);
            }
            Err(e) => {
                self.stats.open_failures += 1;
                warn!(
                    "Could not open virtual camera at {}x{}, continuing without it: {}",
                    width, height, e
                );
            }
        }
    }

    /// Dimensions of the open device, if any
    pub fn bound_dimensions(&self) -> Option<(u32, u32)> {
        self.device.as_ref().map(|device| device.dimensions())
    }

    pub fn stats(&self) -> &SinkStats {
        &self.stats
    }

    /// Release the device
    pub fn close(&mut self) -> Result<(), SinkError> {
        self.requested = None;
        match self.device.take() {
            Some(mut device) => {
                debug!("Closing virtual camera");
                device.close()
            }
            None => Ok(()),
        }
    }
}
