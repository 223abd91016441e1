//! AtHome type definitions
//!
//! This module defines the basic data types shared by the discovery parser,
//! the packet codecs and the connection manager: hardware addresses, link
//! and power states, protocol versions and per-remote statistics.

use crate::athome::constants::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 48-bit Bluetooth device address, stored in wire order (least significant byte first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid MAC address: {0}")]
pub struct MacParseError(pub String);

impl MacAddr {
    /// Build from wire-order bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 6] = bytes.get(..6)?.try_into().ok()?;
        Some(Self(arr))
    }

    /// Wire-order bytes
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

impl FromStr for MacAddr {
    type Err = MacParseError;

    /// Parses the human form "AA:BB:CC:DD:EE:FF" (most significant byte first)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(MacParseError(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(MacParseError(s.to_string()));
            }
            bytes[5 - i] =
                u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Advertising address type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrType {
    Public,
    Random,
}

impl From<u8> for AddrType {
    fn from(raw: u8) -> Self {
        if raw != 0 {
            AddrType::Random
        } else {
            AddrType::Public
        }
    }
}

/// Advertising report event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvEventType {
    /// Connectable undirected (ADV_IND)
    ConnectableUndirected,
    /// Connectable directed (ADV_DIRECT_IND)
    Directed,
    /// Scannable undirected (ADV_SCAN_IND)
    ScannableUndirected,
    /// Non-connectable undirected (ADV_NONCONN_IND)
    NonConnectableUndirected,
    /// Scan response (SCAN_RSP)
    ScanResponse,
    /// Anything newer than BT 4.0 defines
    Other(u8),
}

impl From<u8> for AdvEventType {
    fn from(raw: u8) -> Self {
        match raw {
            0 => AdvEventType::ConnectableUndirected,
            1 => AdvEventType::Directed,
            2 => AdvEventType::ScannableUndirected,
            3 => AdvEventType::NonConnectableUndirected,
            4 => AdvEventType::ScanResponse,
            other => AdvEventType::Other(other),
        }
    }
}

impl AdvEventType {
    pub fn name(&self) -> &'static str {
        match self {
            AdvEventType::ConnectableUndirected => "ADV_IND",
            AdvEventType::Directed => "ADV_DIRECT_IND",
            AdvEventType::ScannableUndirected => "ADV_SCAN_IND",
            AdvEventType::NonConnectableUndirected => "ADV_NONCONN_IND",
            AdvEventType::ScanResponse => "SCAN_RSP",
            AdvEventType::Other(_) => "ADV_UNKNOWN",
        }
    }
}

/// Link state of a remote, as reported to userspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnState {
    /// Data ok, unsecured only
    Binding = 0,
    /// No data yet
    Connecting = 1,
    /// No data yet
    Encrypting = 2,
    /// Data ok, secured
    Connected = 3,
    /// No data, going away
    Disconnecting = 4,
    #[default]
    Unknown = 5,
}

impl ConnState {
    /// Whether data packets may flow in this state
    pub fn accepts_data(&self) -> bool {
        matches!(self, ConnState::Binding | ConnState::Connected)
    }
}

/// Remote power mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PowerMode {
    #[default]
    Idle = 0,
    SemiIdle = 1,
    Active = 2,
}

/// Number of power modes tracked in the statistics block
pub const ATHOME_MODE_MAX: usize = 3;

impl PowerMode {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(PowerMode::Idle),
            1 => Some(PowerMode::SemiIdle),
            2 => Some(PowerMode::Active),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Protocol version advertised by a remote (big-endian on the air)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct ProtoVersion(pub u32);

impl ProtoVersion {
    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }

    pub fn to_be_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub fn is_supported(&self) -> bool {
        self.0 >= MIN_PROTO_VERSION
    }

    pub fn has_audio_v2(&self) -> bool {
        self.0 >= PROTO_VERSION_AUDIO_V2
    }

    pub fn has_power_v2(&self) -> bool {
        self.0 >= PROTO_VERSION_POWER_V2
    }

    pub fn requires_spake(&self) -> bool {
        self.0 >= PROTO_VERSION_SPAKE
    }

    pub fn supports_v2_input(&self) -> bool {
        self.0 >= PROTO_VERSION_V2_INPUT_EVTS
    }
}

impl fmt::Display for ProtoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:08X}", self.0)
    }
}

/// Per-remote statistics, reported on disconnect and on request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BtStats {
    /// Nanoseconds spent in each power mode
    pub mode_times: [u64; ATHOME_MODE_MAX],

    // Packet counts by category
    pub audio: [u64; 4],
    pub accel: u64,
    pub input: u64,
    pub nfc_tx: u64,
    pub nfc_rx: u64,
    pub pkts_rx: u64,
    pub pkts_tx: u64,

    // Byte totals
    pub bytes_rx: u64,
    pub bytes_tx: u64,

    /// Reserved
    pub rfu: [u64; 8],
}

/// Encoded size of [`BtStats`]
pub const BT_STATS_LEN: usize = 8 * (ATHOME_MODE_MAX + 4 + 6 + 2 + 8);

impl BtStats {
    /// Append the packed little-endian representation
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let counters = [
            self.accel,
            self.input,
            self.nfc_tx,
            self.nfc_rx,
            self.pkts_rx,
            self.pkts_tx,
            self.bytes_rx,
            self.bytes_tx,
        ];
        let fields = self
            .mode_times
            .iter()
            .chain(self.audio.iter())
            .chain(counters.iter())
            .chain(self.rfu.iter());
        for value in fields {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}
