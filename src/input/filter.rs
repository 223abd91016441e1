//! Touch smoothing filters
//!
//! Two filters run on every sample while a finger stays down: an
//! alpha-beta tracker that smooths the position (and optionally follows
//! its velocity), then a dead-zone that holds the previous output while
//! the finger moves less than a minimum physical distance.

use crate::athome::constants::{
    AAH_BT_TOUCHPAD_HEIGHT, AAH_BT_TOUCHPAD_WIDTH, AAH_RAW_X_MAX, AAH_RAW_Y_MAX,
};
use serde::{Deserialize, Serialize};

/// Filter tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Both filters are bypassed when off
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Position gain, in hundredths
    #[serde(default = "default_alpha")]
    pub alpha: u16,

    /// Velocity gain, in hundredths
    #[serde(default)]
    pub beta: u16,

    /// Dead-zone radius squared, in (0.1 mm)^2
    #[serde(default = "default_min_square_distance")]
    pub min_square_distance: u16,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            enabled: true,
            alpha: default_alpha(),
            beta: 0,
            min_square_distance: default_min_square_distance(),
        }
    }
}

fn default_true() -> bool { true }
fn default_alpha() -> u16 { 50 }
fn default_min_square_distance() -> u16 { 9 }

/// Physical touchpad size, used to turn raw deltas into distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchpadGeometry {
    #[serde(default = "default_width")]
    pub width_mm: u32,

    #[serde(default = "default_height")]
    pub height_mm: u32,
}

impl Default for TouchpadGeometry {
    fn default() -> Self {
        Self {
            width_mm: default_width(),
            height_mm: default_height(),
        }
    }
}

fn default_width() -> u32 { AAH_BT_TOUCHPAD_WIDTH }
fn default_height() -> u32 { AAH_BT_TOUCHPAD_HEIGHT }

impl TouchpadGeometry {
    /// Raw units per mm on each axis, as advertised to the input layer
    pub fn resolution(&self) -> (i32, i32) {
        (
            AAH_RAW_X_MAX / self.width_mm.max(1) as i32,
            AAH_RAW_Y_MAX / self.height_mm.max(1) as i32,
        )
    }
}

/// Per-finger filter state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Predicted position
    pub px: i64,
    pub py: i64,

    /// Velocity, raw units per ms
    pub vx: i64,
    pub vy: i64,

    /// Last position that made it through the dead-zone
    pub last_x: i32,
    pub last_y: i32,
}

impl FilterState {
    /// Start tracking from a fresh touch
    pub fn reset(&mut self, x: u16, y: u16) {
        self.px = x as i64;
        self.py = y as i64;
        self.vx = 0;
        self.vy = 0;
        self.last_x = x as i32;
        self.last_y = y as i32;
    }

    /// Alpha-beta step; `dt_ms` is the time since the previous touch sample
    pub fn apply_ab(&mut self, params: &FilterParams, dt_ms: i64, x: u16, y: u16) -> (u16, u16) {
        self.px += self.vx * dt_ms;
        self.py += self.vy * dt_ms;

        let rx = x as i64 - self.px;
        let ry = y as i64 - self.py;

        self.px += params.alpha as i64 * rx / 100;
        self.py += params.alpha as i64 * ry / 100;
        if dt_ms > 0 {
            self.vx += params.beta as i64 * rx / (100 * dt_ms);
            self.vy += params.beta as i64 * ry / (100 * dt_ms);
        }

        self.px = self.px.clamp(0, AAH_RAW_X_MAX as i64);
        self.py = self.py.clamp(0, AAH_RAW_Y_MAX as i64);
        (self.px as u16, self.py as u16)
    }

    /// Dead-zone step: hold the last output while the move is too small
    pub fn apply_distance(
        &mut self,
        params: &FilterParams,
        geometry: &TouchpadGeometry,
        x: u16,
        y: u16,
    ) -> (u16, u16) {
        let dx = (x as i64 - self.last_x as i64) * 10 * geometry.width_mm as i64
            / AAH_RAW_X_MAX as i64;
        let dy = (y as i64 - self.last_y as i64) * 10 * geometry.height_mm as i64
            / AAH_RAW_Y_MAX as i64;
        let dist = dx * dx + dy * dy;

        if dist < params.min_square_distance as i64 {
            (self.last_x as u16, self.last_y as u16)
        } else {
            self.last_x = x as i32;
            self.last_y = y as i32;
            (x, y)
        }
    }
}
