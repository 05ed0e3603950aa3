use super::*;
use crate::error::SinkError;
use crate::frame::Frame;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum DeviceEvent {
    Opened(u32, u32, u32),
    Frame(u32, u32),
    Closed(u32, u32),
}

/// Factory that records every device interaction, optionally refusing some sizes
#[derive(Clone, Default)]
struct RecordingFactory {
    events: Arc<Mutex<Vec<DeviceEvent>>>,
    refuse: Arc<Mutex<Vec<(u32, u32)>>>,
    fail_sends: bool,
}

impl RecordingFactory {
    fn refusing(sizes: &[(u32, u32)]) -> Self {
        let factory = Self::default();
        factory.refuse.lock().extend_from_slice(sizes);
        factory
    }

    fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().clone()
    }
}

impl SinkDeviceFactory for RecordingFactory {
    fn open(&self, width: u32, height: u32, fps: u32) -> Result<Box<dyn SinkDevice>, SinkError> {
        if self.refuse.lock().contains(&(width, height)) {
            return Err(SinkError::DeviceOpen {
                device: "recording".to_string(),
                width,
                height,
                fps,
                details: "refused".to_string(),
            });
        }
        self.events
            .lock()
            .push(DeviceEvent::Opened(width, height, fps));
        Ok(Box::new(RecordingDevice {
            width,
            height,
            events: Arc::clone(&self.events),
            fail_sends: self.fail_sends,
        }))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct RecordingDevice {
    width: u32,
    height: u32,
    events: Arc<Mutex<Vec<DeviceEvent>>>,
    fail_sends: bool,
}

#[async_trait::async_trait]
impl SinkDevice for RecordingDevice {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if self.fail_sends {
            return Err(SinkError::Send {
                details: "device gone".to_string(),
            });
        }
        self.events
            .lock()
            .push(DeviceEvent::Frame(frame.width(), frame.height()));
        Ok(())
    }

    async fn sleep_until_next_frame(&mut self) {}

    fn close(&mut self) -> Result<(), SinkError> {
        self.events
            .lock()
            .push(DeviceEvent::Closed(self.width, self.height));
        Ok(())
    }
}

fn frame(width: u32, height: u32) -> Frame {
    let len = crate::frame::rgb_len(width, height).unwrap();
    Frame::new(width, height, vec![0x10; len]).unwrap()
}

#[tokio::test]
async fn test_first_frame_opens_device_at_its_size() {
    let factory = RecordingFactory::default();
    let mut adapter = FrameSinkAdapter::new(Arc::new(factory.clone()), 30);

    assert_eq!(adapter.bound_dimensions(), None);
    assert_eq!(adapter.deliver(&frame(640, 480)).await, DeliveryOutcome::Sent);
    assert_eq!(adapter.deliver(&frame(640, 480)).await, DeliveryOutcome::Sent);

    assert_eq!(adapter.bound_dimensions(), Some((640, 480)));
    assert_eq!(
        factory.events(),
        vec![
            DeviceEvent::Opened(640, 480, 30),
            DeviceEvent::Frame(640, 480),
            DeviceEvent::Frame(640, 480),
        ]
    );
    assert_eq!(adapter.stats().device_opens, 1);
    assert_eq!(adapter.stats().frames_sent, 2);
}

#[tokio::test]
async fn test_resolution_change_reopens_device() {
    let factory = RecordingFactory::default();
    let mut adapter = FrameSinkAdapter::new(Arc::new(factory.clone()), 30);

    adapter.deliver(&frame(640, 480)).await;
    adapter.deliver(&frame(320, 240)).await;

    assert_eq!(adapter.bound_dimensions(), Some((320, 240)));
    assert_eq!(
        factory.events(),
        vec![
            DeviceEvent::Opened(640, 480, 30),
            DeviceEvent::Frame(640, 480),
            DeviceEvent::Closed(640, 480),
            DeviceEvent::Opened(320, 240, 30),
            DeviceEvent::Frame(320, 240),
        ]
    );
}

#[tokio::test]
async fn test_failed_open_drops_frames_and_continues() {
    let factory = RecordingFactory::refusing(&[(640, 480)]);
    let mut adapter = FrameSinkAdapter::new(Arc::new(factory.clone()), 30);

    assert_eq!(adapter.deliver(&frame(640, 480)).await, DeliveryOutcome::Dropped);
    // Same size is not retried
    assert_eq!(adapter.deliver(&frame(640, 480)).await, DeliveryOutcome::Dropped);
    assert_eq!(adapter.stats().open_failures, 1);
    assert_eq!(adapter.stats().frames_dropped, 2);
    assert_eq!(adapter.bound_dimensions(), None);

    // A new size gets a fresh attempt
    assert_eq!(adapter.deliver(&frame(320, 240)).await, DeliveryOutcome::Sent);
    assert_eq!(adapter.bound_dimensions(), Some((320, 240)));
    assert_eq!(
        factory.events(),
        vec![
            DeviceEvent::Opened(320, 240, 30),
            DeviceEvent::Frame(320, 240),
        ]
    );
}

#[tokio::test]
async fn test_unavailable_backend_never_blocks_delivery() {
    let mut adapter = FrameSinkAdapter::new(Arc::new(UnavailableSinkFactory::new("no backend")), 30);

    for _ in 0..3 {
        assert_eq!(adapter.deliver(&frame(4, 4)).await, DeliveryOutcome::Dropped);
    }
    assert_eq!(adapter.stats().frames_dropped, 3);
    assert!(adapter.close().is_ok());
}

#[tokio::test]
async fn test_send_failure_is_counted() {
    let factory = RecordingFactory {
        fail_sends: true,
        ..Default::default()
    };
    let mut adapter = FrameSinkAdapter::new(Arc::new(factory), 30);

    assert_eq!(adapter.deliver(&frame(8, 8)).await, DeliveryOutcome::Failed);
    assert_eq!(adapter.stats().send_failures, 1);
    // Device stays bound after a failed send
    assert_eq!(adapter.bound_dimensions(), Some((8, 8)));
}

#[tokio::test]
async fn test_close_releases_device() {
    let factory = RecordingFactory::default();
    let mut adapter = FrameSinkAdapter::new(Arc::new(factory.clone()), 30);

    adapter.deliver(&frame(16, 9)).await;
    adapter.close().unwrap();

    assert_eq!(adapter.bound_dimensions(), None);
    assert_eq!(factory.events().last(), Some(&DeviceEvent::Closed(16, 9)));
}

#[tokio::test]
async fn test_frame_pacer_period() {
    let pacer = FramePacer::new(30);
    assert_eq!(pacer.period(), Duration::from_micros(33_333));

    // fps of zero is clamped rather than dividing by zero
    let pacer = FramePacer::new(0);
    assert_eq!(pacer.period(), Duration::from_secs(1));
}
