//! Mock input backend for testing.
//!
//! This backend logs input events instead of handing them to the OS and
//! keeps a copy of each one so tests can inspect what the pipeline
//! produced. Clones share the same record.

use super::{AbsAxis, ActivityEvent, ActivityIndicator, BackendError, InputBackend, Key};
use log::info;
use std::sync::{Arc, Mutex};

/// One recorded input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    MtSlot { finger: u8, down: bool },
    Abs { axis: AbsAxis, value: i32 },
    Key { scan: u8, key: Key, down: bool },
    Time { sec: u64, usec: u32 },
    Sync,
}

/// Mock input backend that logs and records events.
#[derive(Clone, Debug, Default)]
pub struct MockInputBackend {
    events: Arc<Mutex<Vec<(usize, InputEvent)>>>,
}

impl MockInputBackend {
    /// Create a new mock input backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, dev: usize, event: InputEvent) -> Result<(), BackendError> {
        self.events
            .lock()
            .map_err(|e| BackendError::Operation(e.to_string()))?
            .push((dev, event));
        Ok(())
    }

    /// Everything recorded so far, in order
    pub fn events(&self) -> Vec<(usize, InputEvent)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events recorded for one device
    pub fn events_for(&self, dev: usize) -> Vec<InputEvent> {
        self.events()
            .into_iter()
            .filter(|(d, _)| *d == dev)
            .map(|(_, e)| e)
            .collect()
    }

    /// Last reported (x, y) for one device
    pub fn last_position(&self, dev: usize) -> Option<(i32, i32)> {
        let mut x = None;
        let mut y = None;
        for event in self.events_for(dev) {
            match event {
                InputEvent::Abs { axis: AbsAxis::MtPositionX, value } => x = Some(value),
                InputEvent::Abs { axis: AbsAxis::MtPositionY, value } => y = Some(value),
                _ => {}
            }
        }
        Some((x?, y?))
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl InputBackend for MockInputBackend {
    fn mt_slot(&self, dev: usize, finger: u8, down: bool) -> Result<(), BackendError> {
        info!("[MOCK INPUT {}] MT slot {} {}", dev, finger, if down { "DOWN" } else { "UP" });
        self.record(dev, InputEvent::MtSlot { finger, down })
    }

    fn report_abs(&self, dev: usize, axis: AbsAxis, value: i32) -> Result<(), BackendError> {
        info!("[MOCK INPUT {}] {:?} = {}", dev, axis, value);
        self.record(dev, InputEvent::Abs { axis, value })
    }

    fn report_key(&self, dev: usize, scan: u8, key: Key, down: bool) -> Result<(), BackendError> {
        info!(
            "[MOCK INPUT {}] Key {} (scan {}) {}",
            dev,
            key.name(),
            scan,
            if down { "DOWN" } else { "UP" }
        );
        self.record(dev, InputEvent::Key { scan, key, down })
    }

    fn report_time(&self, dev: usize, sec: u64, usec: u32) -> Result<(), BackendError> {
        info!("[MOCK INPUT {}] Time {}.{:06}", dev, sec, usec);
        self.record(dev, InputEvent::Time { sec, usec })
    }

    fn sync(&self, dev: usize) -> Result<(), BackendError> {
        info!("[MOCK INPUT {}] SYNC", dev);
        self.record(dev, InputEvent::Sync)
    }
}

/// Activity indicator that logs and records what it was asked to show.
#[derive(Clone, Debug, Default)]
pub struct MockActivityIndicator {
    shown: Arc<Mutex<Vec<ActivityEvent>>>,
}

impl MockActivityIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<ActivityEvent> {
        self.shown.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ActivityIndicator for MockActivityIndicator {
    fn show(&self, event: ActivityEvent) {
        info!("[MOCK LED] {:?} (#{:06X})", event, event.color());
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_input_records() {
        let backend = MockInputBackend::new();
        let shared = backend.clone();

        assert!(backend.mt_slot(1, 0, true).is_ok());
        assert!(backend.report_abs(1, AbsAxis::MtPositionX, 10).is_ok());
        assert!(backend.report_abs(1, AbsAxis::MtPositionY, 20).is_ok());
        assert!(backend.sync(1).is_ok());
        assert!(backend.report_key(2, 0, Key::Back, true).is_ok());

        assert_eq!(shared.events().len(), 5);
        assert_eq!(shared.events_for(2), vec![InputEvent::Key { scan: 0, key: Key::Back, down: true }]);
        assert_eq!(shared.last_position(1), Some((10, 20)));
        assert_eq!(shared.last_position(2), None);

        shared.clear();
        assert!(backend.events().is_empty());
    }
}
