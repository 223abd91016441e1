//! AtHome remote support
//!
//! This module provides the wire-level side of the AtHome remote link:
//! - Advertising report parsing and connect decisions
//! - Known-remote registry
//! - Air packet codec
//! - Userspace bridge records

pub mod constants;
pub mod cursor;
pub mod discovery;
pub mod proto;
pub mod registry;
pub mod types;
pub mod user;

// Re-export commonly used items
pub use constants::*;
pub use discovery::*;
pub use proto::*;
pub use registry::*;
pub use types::*;
pub use user::*;
