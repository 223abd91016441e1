//! Radio transport interface
//!
//! The link layer itself (HCI, connection setup, encryption) lives outside
//! this crate. The core only asks it to connect, disconnect, encrypt and
//! carry framed packets for a given remote.

use crate::athome::constants::AAH_BT_LTK_SZ;
use crate::athome::types::{MacAddr, ProtoVersion};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport operation failed: {0}")]
    Operation(String),

    #[error("No link to {0}")]
    NoLink(MacAddr),
}

pub trait ChipTransport {
    /// Send one framed packet to a remote
    fn send_to_chip(&self, mac: &MacAddr, pkt_type: u8, data: &[u8]) -> Result<(), TransportError>;

    /// Start connecting to a remote found by discovery
    fn connect(&self, mac: &MacAddr, version: ProtoVersion) -> Result<(), TransportError>;

    /// Tear down the link to a remote
    fn disconnect(&self, mac: &MacAddr) -> Result<(), TransportError>;

    /// Encrypt the link with a stored long term key
    fn start_encryption(&self, mac: &MacAddr, ltk: &[u8; AAH_BT_LTK_SZ]) -> Result<(), TransportError>;
}
