use super::device::{FramePacer, SinkDevice, SinkDeviceFactory};
use crate::error::SinkError;
use crate::frame::Frame;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSrc;
use tracing::{debug, info, warn};

/// Opens GStreamer pipelines that write raw RGB frames into a v4l2loopback device
pub struct GstVirtualCameraFactory {
    device: String,
}

impl GstVirtualCameraFactory {
    pub fn new(device: impl Into<String>) -> Result<Self, SinkError> {
        gstreamer::init().map_err(|e| SinkError::Unavailable {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        Ok(Self {
            device: device.into(),
        })
    }

    fn pipeline_description(&self, width: u32, height: u32, fps: u32) -> String {
        format!(
            "appsrc name=src is-live=true format=time do-timestamp=true block=false \
             caps=video/x-raw,format=RGB,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=2 leaky=downstream ! \
             videoconvert ! video/x-raw,format=YUY2 ! \
             v4l2sink device={} sync=false",
            width, height, fps, self.device
        )
    }

    fn open_error(&self, width: u32, height: u32, fps: u32, details: String) -> SinkError {
        SinkError::DeviceOpen {
            device: self.device.clone(),
            width,
            height,
            fps,
            details,
        }
    }
}

impl SinkDeviceFactory for GstVirtualCameraFactory {
    fn open(&self, width: u32, height: u32, fps: u32) -> Result<Box<dyn SinkDevice>, SinkError> {
        let pipeline_desc = self.pipeline_description(width, height, fps);
        info!("Creating virtual camera pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| self.open_error(width, height, fps, format!("parse failed: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| {
                self.open_error(width, height, fps, "not a pipeline".to_string())
            })?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| self.open_error(width, height, fps, "missing appsrc".to_string()))?
            .downcast::<AppSrc>()
            .map_err(|_| {
                self.open_error(width, height, fps, "src is not an appsrc".to_string())
            })?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(self.open_error(
                width,
                height,
                fps,
                format!("failed to start pipeline: {}", e),
            ));
        }

        Ok(Box::new(GstVirtualCamera {
            pipeline,
            appsrc,
            width,
            height,
            pacer: FramePacer::new(fps),
            frames_pushed: 0,
        }))
    }

    fn name(&self) -> &str {
        &self.device
    }
}

struct GstVirtualCamera {
    pipeline: Pipeline,
    appsrc: AppSrc,
    width: u32,
    height: u32,
    pacer: FramePacer,
    frames_pushed: u64,
}

#[async_trait::async_trait]
impl SinkDevice for GstVirtualCamera {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(SinkError::DimensionMismatch {
                frame_width: frame.width(),
                frame_height: frame.height(),
                device_width: self.width,
                device_height: self.height,
            });
        }

        let buffer = gstreamer::Buffer::from_slice(frame.pixels().clone());
        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| SinkError::Send {
                details: format!("appsrc rejected buffer: {:?}", e),
            })?;

        self.frames_pushed += 1;
        Ok(())
    }

    async fn sleep_until_next_frame(&mut self) {
        self.pacer.wait().await;
    }

    fn close(&mut self) -> Result<(), SinkError> {
        debug!(
            "Stopping virtual camera pipeline after {} frames",
            self.frames_pushed
        );
        let _ = self.appsrc.end_of_stream();
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| SinkError::Send {
                details: format!("failed to stop pipeline: {}", e),
            })?;
        Ok(())
    }
}

impl Drop for GstVirtualCamera {
    fn drop(&mut self) {
        if self.pipeline.current_state() != gstreamer::State::Null {
            if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
                warn!("Failed to stop virtual camera pipeline: {}", e);
            }
        }
    }
}
