//! Input reconstruction pipeline
//!
//! Turns decoded touch and button samples from a remote into OS input
//! events on the virtual device owned by its connection slot. Touch samples
//! run through the smoothing filters in [`filter`]; each slot also keeps a
//! logical clock, advanced by the deltas the remote reports, which stamps
//! every frame handed to the input layer.
//!
//! Slot indices (`which`) are validated by the caller. An out of range
//! index is a bug and panics.

pub mod clock;
pub mod filter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use filter::{FilterParams, FilterState, TouchpadGeometry};

use crate::athome::constants::{AAH_BT_UNKNOWN_TS_DELTA, ATHOME_MAX_FINGERS, ATHOME_RMT_MAX_CONNS};
use crate::backend::{AbsAxis, ActivityEvent, ActivityIndicator, BackendError, InputBackend, Key};
use log::{debug, info, trace};
use std::sync::Arc;
use std::time::Duration;

/// Logging switches for the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputLogging {
    /// Finger down/up and button changes
    pub events: bool,
    /// Every filtered sample
    pub spew: bool,
}

/// Input state of one connection slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSlot {
    /// Bit i set while finger i is down
    pub fingers_down: u8,
    pub filter: FilterState,
    /// Logical time of the latest event
    pub last_evt: Duration,
    /// Logical time of the latest filtered touch sample
    pub last_touch_evt: Duration,
    /// Samples since the finger went down
    pub touch_count: u32,
}

impl InputSlot {
    pub fn is_finger_down(&self, finger: u8) -> bool {
        self.fingers_down & (1 << finger) != 0
    }
}

/// Log touch samples less often the longer a finger stays down
pub fn should_report_touch(count: u32) -> bool {
    if count < 0x3F00 {
        count & 0x3F == 0
    } else if count < 0x3FF00 {
        count & 0x3FF == 0
    } else {
        count & 0x3FFF == 0
    }
}

pub struct InputPipeline<I: InputBackend> {
    backend: I,
    params: FilterParams,
    geometry: TouchpadGeometry,
    logging: InputLogging,
    slots: [InputSlot; ATHOME_RMT_MAX_CONNS],
    clock: Arc<dyn Clock>,
    activity: Option<Box<dyn ActivityIndicator + Send>>,
    last_activity: Option<ActivityEvent>,
}

impl<I: InputBackend> InputPipeline<I> {
    pub fn new(backend: I, clock: Arc<dyn Clock>) -> Self {
        let mut pipeline = Self {
            backend,
            params: FilterParams::default(),
            geometry: TouchpadGeometry::default(),
            logging: InputLogging::default(),
            slots: [InputSlot::default(); ATHOME_RMT_MAX_CONNS],
            clock,
            activity: None,
            last_activity: None,
        };
        for which in 0..ATHOME_RMT_MAX_CONNS {
            pipeline.reset_time(which);
        }
        pipeline
    }

    pub fn backend(&self) -> &I {
        &self.backend
    }

    pub fn filter_params(&self) -> FilterParams {
        self.params
    }

    pub fn set_filter_params(&mut self, params: FilterParams) {
        info!(
            "touch filter, alpha = {}, beta = {}, enabled = {}",
            params.alpha, params.beta, params.enabled
        );
        self.params = params;
    }

    pub fn set_geometry(&mut self, geometry: TouchpadGeometry) {
        self.geometry = geometry;
    }

    pub fn set_logging(&mut self, logging: InputLogging) {
        self.logging = logging;
    }

    pub fn set_activity_indicator(&mut self, indicator: Box<dyn ActivityIndicator + Send>) {
        self.activity = Some(indicator);
        self.last_activity = None;
    }

    /// Show an activity event, skipping repeats of the last one
    pub fn show_activity(&mut self, event: ActivityEvent) {
        if self.last_activity == Some(event) {
            return;
        }
        self.last_activity = Some(event);
        if let Some(indicator) = &self.activity {
            indicator.show(event);
        }
    }

    pub fn slot(&self, which: usize) -> &InputSlot {
        assert!(which < ATHOME_RMT_MAX_CONNS, "input slot {} out of range", which);
        &self.slots[which]
    }

    /// Resynchronize a slot's logical clock with the wall clock
    pub fn reset_time(&mut self, which: usize) {
        assert!(which < ATHOME_RMT_MAX_CONNS, "input slot {} out of range", which);
        let now = self.clock.now();
        let slot = &mut self.slots[which];
        slot.last_evt = now;
        slot.last_touch_evt = now;
    }

    /// Advance a slot's logical clock; [`AAH_BT_UNKNOWN_TS_DELTA`] (or any
    /// negative delta) resynchronizes it instead
    pub fn calculate_time(&mut self, which: usize, usec_since_last: i64) {
        assert!(which < ATHOME_RMT_MAX_CONNS, "input slot {} out of range", which);
        if usec_since_last == AAH_BT_UNKNOWN_TS_DELTA || usec_since_last < 0 {
            self.reset_time(which);
        } else {
            self.slots[which].last_evt += Duration::from_micros(usec_since_last as u64);
        }
    }

    /// Report one finger sample
    pub fn send_touch(
        &mut self,
        which: usize,
        finger: u8,
        x: u16,
        y: u16,
        is_down: bool,
    ) -> Result<(), BackendError> {
        assert!(which < ATHOME_RMT_MAX_CONNS, "input slot {} out of range", which);
        assert!((finger as usize) < ATHOME_MAX_FINGERS, "finger {} out of range", finger);

        let mask = 1u8 << finger;
        let was_down = self.slots[which].fingers_down & mask != 0;

        if is_down && !was_down {
            self.show_activity(ActivityEvent::TouchDown);
            let slot = &mut self.slots[which];
            slot.last_touch_evt = slot.last_evt;
            slot.filter.reset(x, y);
            slot.touch_count = 0;
        } else if !is_down && was_down {
            self.show_activity(ActivityEvent::InputUp);
        }

        if !is_down && !was_down {
            return Ok(());
        }

        self.backend.mt_slot(which, finger, is_down)?;

        let params = self.params;
        let geometry = self.geometry;
        let logging = self.logging;
        let slot = &mut self.slots[which];
        slot.touch_count = slot.touch_count.wrapping_add(1);

        if is_down {
            let (mut fx, mut fy) = (x, y);
            if params.enabled {
                let dt = slot.last_evt.saturating_sub(slot.last_touch_evt).as_millis() as i64;
                (fx, fy) = slot.filter.apply_ab(&params, dt, fx, fy);
                slot.last_touch_evt = slot.last_evt;
                (fx, fy) = slot.filter.apply_distance(&params, &geometry, fx, fy);
            }

            self.backend.report_abs(which, AbsAxis::MtPositionX, fx as i32)?;
            self.backend.report_abs(which, AbsAxis::MtPositionY, fy as i32)?;
            if logging.events && should_report_touch(slot.touch_count) {
                debug!(
                    "[{}] finger down, {:4} touch events, x = {:5}, y = {:5}",
                    finger, slot.touch_count, fx, fy
                );
            }

            slot.fingers_down |= mask;

            if logging.spew {
                trace!(
                    "[{}] raw: ({:5} , {:5}), predicted: ({:5} , {:5}), delta ({}, {})",
                    finger,
                    x,
                    y,
                    slot.filter.px,
                    slot.filter.py,
                    x as i64 - slot.filter.px,
                    y as i64 - slot.filter.py
                );
            }
        } else {
            slot.fingers_down &= !mask;
            if logging.events {
                debug!("[{}] finger release after {:4} touch events", finger, slot.touch_count);
            }
            slot.touch_count = 0;
        }
        Ok(())
    }

    /// Report the full key table from a button bitmask
    pub fn send_buttons(&mut self, which: usize, mask: u32) -> Result<(), BackendError> {
        assert!(which < ATHOME_RMT_MAX_CONNS, "input slot {} out of range", which);
        if self.logging.events {
            debug!("[{}] button mask = 0x{:08X}", which, mask);
        }
        self.show_activity(if mask != 0 {
            ActivityEvent::ButtonDown
        } else {
            ActivityEvent::InputUp
        });

        let mut bits = mask;
        for (scan, key) in Key::TABLE.iter().enumerate() {
            self.backend.report_key(which, scan as u8, *key, bits & 1 != 0)?;
            bits >>= 1;
        }
        Ok(())
    }

    /// Report a single key; ids past the key table are dropped
    pub fn send_button(&mut self, which: usize, id: u8, down: bool) -> Result<(), BackendError> {
        assert!(which < ATHOME_RMT_MAX_CONNS, "input slot {} out of range", which);
        if self.logging.events {
            debug!("[{}] button {} {}", which, id, if down { "down" } else { "up" });
        }
        self.show_activity(if down {
            ActivityEvent::ButtonDown
        } else {
            ActivityEvent::InputUp
        });

        if let Some(key) = Key::from_index(id) {
            self.backend.report_key(which, id, key, down)?;
        }
        Ok(())
    }

    /// Stamp and flush the events reported since the last frame
    pub fn frame(&mut self, which: usize) -> Result<(), BackendError> {
        assert!(which < ATHOME_RMT_MAX_CONNS, "input slot {} out of range", which);
        let last_evt = self.slots[which].last_evt;
        self.backend
            .report_time(which, last_evt.as_secs(), last_evt.subsec_micros())?;
        self.backend.sync(which)
    }

    /// Lift every finger still down, e.g. when the remote goes away
    pub fn release_all(&mut self, which: usize) -> Result<(), BackendError> {
        assert!(which < ATHOME_RMT_MAX_CONNS, "input slot {} out of range", which);
        let down = self.slots[which].fingers_down;
        if down == 0 {
            return Ok(());
        }
        for finger in 0..ATHOME_MAX_FINGERS as u8 {
            if down & (1 << finger) != 0 {
                self.send_touch(which, finger, 0, 0, false)?;
            }
        }
        self.frame(which)
    }
}
