//! AtHome remote core
//!
//! This library implements the host side of the AtHome BLE remote protocol:
//! advertisement filtering and connection decisions, per-remote input
//! reconstruction with touch smoothing, packet dispatch, and the userspace
//! control channel. The radio and the OS input layer sit behind traits in
//! [`backend`].

pub mod athome;
pub mod backend;
pub mod config;
pub mod input;
pub mod manager;
pub mod slots;

// Re-export commonly used items
pub use athome::{KnownRegistry, MacAddr, ProtoVersion, UserEvent, UserMessage};
pub use backend::{ActivityIndicator, ChipTransport, InputBackend};
pub use config::Config;
pub use input::InputPipeline;
pub use manager::{AthomeManager, ManagerError};
