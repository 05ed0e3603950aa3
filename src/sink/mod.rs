mod adapter;
mod device;
#[cfg(all(target_os = "linux", feature = "virtual_camera"))]
mod virtual_camera;
#[cfg(test)]
mod tests;

pub use adapter::{DeliveryOutcome, FrameSinkAdapter, SinkStats};
pub use device::{FramePacer, SinkDevice, SinkDeviceFactory, UnavailableSinkFactory};
#[cfg(all(target_os = "linux", feature = "virtual_camera"))]
pub use virtual_camera::GstVirtualCameraFactory;

use crate::config::SinkConfig;
use std::sync::Arc;

/// Virtual camera factory for this platform
#[cfg(all(target_os = "linux", feature = "virtual_camera"))]
pub fn default_factory(config: &SinkConfig) -> Arc<dyn SinkDeviceFactory> {
    match GstVirtualCameraFactory::new(config.device.clone()) {
        Ok(factory) => Arc::new(factory),
        Err(e) => {
            tracing::warn!("Virtual camera disabled: {}", e);
            Arc::new(UnavailableSinkFactory::new(e.to_string()))
        }
    }
}

/// Virtual camera factory for this platform
#[cfg(not(all(target_os = "linux", feature = "virtual_camera")))]
pub fn default_factory(_config: &SinkConfig) -> Arc<dyn SinkDeviceFactory> {
    tracing::warn!("Virtual camera output requires Linux and the virtual_camera feature");
    Arc::new(UnavailableSinkFactory::new(
        "built without the virtual_camera feature",
    ))
}
