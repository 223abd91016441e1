//! Backend abstraction for the collaborators around the core
//!
//! This module provides the interfaces the core calls out through:
//! - [`InputBackend`]: the OS input layer, one virtual device per connection slot
//! - [`ActivityIndicator`]: a user-visible activity hint (an LED on the reference board)
//! - [`ChipTransport`]: the radio link that carries packets to and from remotes

pub mod mock_input;
pub mod mock_transport;
pub mod transport;

pub use mock_input::{InputEvent, MockActivityIndicator, MockInputBackend};
pub use mock_transport::{MockTransport, TransportCall};
pub use transport::{ChipTransport, TransportError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend operation failed: {0}")]
    Operation(String),

    #[error("No input device for slot {0}")]
    NoDevice(usize),
}

/// Keys a remote can report, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Back,
    Home,
    VolumeUp,
    VolumeDown,
    DpadCenter,
    Power,
    Input,
}

impl Key {
    /// Index on the wire -> key
    pub const TABLE: [Key; 7] = [
        Key::Back,
        Key::Home,
        Key::VolumeUp,
        Key::VolumeDown,
        Key::DpadCenter,
        Key::Power,
        Key::Input,
    ];

    pub fn from_index(id: u8) -> Option<Key> {
        Self::TABLE.get(id as usize).copied()
    }

    /// Linux input key code
    pub fn code(&self) -> u16 {
        match self {
            Key::Back => 158,
            Key::Home => 172,
            Key::VolumeUp => 115,
            Key::VolumeDown => 114,
            Key::DpadCenter => 353,
            Key::Power => 177,
            Key::Input => 178,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Key::Back => "BACK",
            Key::Home => "HOMEPAGE",
            Key::VolumeUp => "VOLUMEUP",
            Key::VolumeDown => "VOLUMEDOWN",
            Key::DpadCenter => "DPAD_CENTER",
            Key::Power => "POWER",
            Key::Input => "INPUT",
        }
    }
}

/// Absolute axes reported per finger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsAxis {
    MtPositionX,
    MtPositionY,
}

/// Unified backend interface for the OS input layer
///
/// `dev` is the connection slot index; every slot owns its own virtual
/// touch device. Events accumulate until [`InputBackend::sync`].
pub trait InputBackend {
    /// Select a multi-touch slot and report whether a finger is on it
    fn mt_slot(&self, dev: usize, finger: u8, down: bool) -> Result<(), BackendError>;

    /// Report an absolute axis value for the selected finger
    fn report_abs(&self, dev: usize, axis: AbsAxis, value: i32) -> Result<(), BackendError>;

    /// Report a key state, preceded by its scan code
    fn report_key(&self, dev: usize, scan: u8, key: Key, down: bool) -> Result<(), BackendError>;

    /// Report the reconstructed event time
    fn report_time(&self, dev: usize, sec: u64, usec: u32) -> Result<(), BackendError>;

    /// Flush everything reported since the last sync as one frame
    fn sync(&self, dev: usize) -> Result<(), BackendError>;
}

/// Activity worth showing to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    Connect,
    Awake,
    TouchDown,
    ButtonDown,
    InputUp,
    Asleep,
    Disconnect,
}

impl ActivityEvent {
    /// RGB color used by the reference board's LED
    pub fn color(&self) -> u32 {
        match self {
            ActivityEvent::Connect | ActivityEvent::Awake => 0x808000,
            ActivityEvent::TouchDown => 0x00FF00,
            ActivityEvent::ButtonDown => 0xFF0000,
            ActivityEvent::InputUp => 0xFF8000,
            ActivityEvent::Asleep => 0x0000FF,
            ActivityEvent::Disconnect => 0xFFFFFF,
        }
    }
}

/// Host hook for showing remote activity
pub trait ActivityIndicator {
    fn show(&self, event: ActivityEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table_order() {
        assert_eq!(Key::from_index(0), Some(Key::Back));
        assert_eq!(Key::from_index(2), Some(Key::VolumeUp));
        assert_eq!(Key::from_index(6), Some(Key::Input));
        assert_eq!(Key::from_index(7), None);
        assert_eq!(Key::DpadCenter.code(), 353);
    }
}
