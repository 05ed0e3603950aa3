use crate::clock::now_ms;
use crate::pose::PosePayload;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Copy of the pose store contents at one instant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseStateSnapshot {
    pub payload: Option<Arc<PosePayload>>,
    pub updated_ms: Option<i64>,
}

impl PoseStateSnapshot {
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }
}

/// Single-slot, last-write-wins cache of the latest pose payload.
///
/// Payload and timestamp are replaced together under one lock, so readers
/// never observe a payload from one `set` paired with another's timestamp.
#[derive(Debug, Default)]
pub struct PoseStateStore {
    slot: Mutex<PoseStateSnapshot>,
}

impl PoseStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored payload, returning the recorded update time
    pub fn set(&self, payload: PosePayload) -> i64 {
        self.set_shared(Arc::new(payload))
    }

    /// Replace the stored payload with an already shared one
    pub fn set_shared(&self, payload: Arc<PosePayload>) -> i64 {
        let mut slot = self.slot.lock();
        let updated_ms = now_ms();
        *slot = PoseStateSnapshot {
            payload: Some(payload),
            updated_ms: Some(updated_ms),
        };
        trace!("Pose state updated at {}", updated_ms);
        updated_ms
    }

    /// Consistent copy of the current snapshot
    pub fn get(&self) -> PoseStateSnapshot {
        self.slot.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::RawLandmark;
    use std::thread;

    fn payload_with(value: f64, timestamp_ms: i64) -> PosePayload {
        let landmarks = vec![RawLandmark::new(value, value, value, value); 33];
        PosePayload::from_landmarks(&landmarks, timestamp_ms)
    }

    #[test]
    fn test_empty_before_first_set() {
        let store = PoseStateStore::new();
        let snapshot = store.get();

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.updated_ms, None);
    }

    #[test]
    fn test_set_then_get() {
        let store = PoseStateStore::new();
        let before = now_ms();
        let payload = payload_with(0.25, 123);

        let updated_ms = store.set(payload.clone());
        let snapshot = store.get();

        assert_eq!(snapshot.payload.as_deref(), Some(&payload));
        assert_eq!(snapshot.updated_ms, Some(updated_ms));
        assert!(updated_ms >= before);
    }

    #[test]
    fn test_last_write_wins() {
        let store = PoseStateStore::new();
        store.set(payload_with(0.1, 1));
        store.set(payload_with(0.2, 2));

        let snapshot = store.get();
        assert_eq!(snapshot.payload.unwrap().timestamp_ms(), 2);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_payloads() {
        let store = Arc::new(PoseStateStore::new());

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..2_000 {
                    store.set(payload_with(i as f64 / 10_000.0, i));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        if let Some(payload) = store.get().payload {
                            // Every landmark of one payload carries the same value
                            let first = payload.landmark("nose").unwrap().x;
                            assert!(payload.landmarks().values().all(|l| l.x == first));
                            assert_eq!(
                                crate::pose::round_landmark_value(
                                    payload.timestamp_ms() as f64 / 10_000.0
                                ),
                                first
                            );
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
