//! AtHome remote protocol constants
//!
//! This module contains all the constants needed to talk to AtHome remotes:
//! - Advertising-data (EIR) chunk types and discovery marker
//! - Protocol versions
//! - Air packet types (chip -> host and host -> chip)
//! - Userspace message and event tags
//! - Link timing budgets

// ============================================================================
// BLE Discovery Constants
// ============================================================================

/// Identifier carried at the start of the manufacturer-specific chunk
pub const ATHOME_BT_IDENT: [u8; 6] = *b"Google";

/// Size of the fixed part of the manufacturer chunk (ident + version)
pub const MANUF_DATA_LEN: usize = ATHOME_BT_IDENT.len() + 4;

/// Flags value we require: LE General Discoverable + no BR/EDR support
pub const ATHOME_ADV_FLAGS: u8 = 0x06;

/// Maximum advertising data length per report (BT 4.0 vol 2 E.7.7.65.2)
pub const HCI_LE_ADV_DATA_MAX_LEN: usize = 31;

/// Fixed per-report header: event type, address type, address, data length
pub const ADV_REPORT_HEADER_LEN: usize = 9;

/// LE meta subevent code for an advertising report
pub const HCI_EV_LE_ADVERTISING_REPORT: u8 = 0x02;

pub const ADV_DATA_FLAGS: u8 = 1;
pub const ADV_DATA_UUID16S_INCOMPLETE: u8 = 2;
pub const ADV_DATA_UUID16S_COMPLETE: u8 = 3;
pub const ADV_DATA_UUID32S_INCOMPLETE: u8 = 4;
pub const ADV_DATA_UUID32S_COMPLETE: u8 = 5;
pub const ADV_DATA_UUID128S_INCOMPLETE: u8 = 6;
pub const ADV_DATA_UUID128S_COMPLETE: u8 = 7;
pub const ADV_DATA_NAME_SHORT: u8 = 8;
pub const ADV_DATA_NAME_COMPLETE: u8 = 9;
pub const ADV_DATA_TX_POWER: u8 = 10;
pub const ADV_DATA_MANUF_SPECIFIC: u8 = 255;

// ============================================================================
// Protocol Versions
// ============================================================================

/// Oldest protocol version we will connect to
pub const MIN_PROTO_VERSION: u32 = 0x0001_0000;

/// Highest quality SBC compression changed
pub const PROTO_VERSION_AUDIO_V2: u32 = 0x0001_0001;

/// Slave latency disabled in active mode
pub const PROTO_VERSION_POWER_V2: u32 = 0x0001_0002;

/// Pairing requires a SPAKE based exchange
pub const PROTO_VERSION_SPAKE: u32 = 0x0001_0100;

/// v2 input event messages (high resolution timestamps)
pub const PROTO_VERSION_V2_INPUT_EVTS: u32 = 0x0001_0101;

// ============================================================================
// Link / Security Constants
// ============================================================================

pub const ENCR_RND_NUM: u64 = 0x474A_2041_4320_4744;
pub const ENCR_DIV: u16 = 0x6F67;

/// Long term key size
pub const AAH_BT_LTK_SZ: usize = 16;

/// Encryption entropy size
pub const AAH_BT_ENTROPY_SZ: usize = 16;

/// Longest serial number carried in a bind advertisement
pub const AAH_BT_SLEN_MAX: usize = 20;

/// Master clock accuracy of the radio, in ppm
pub const AAH_BT_MCA_PPM: u16 = 30;

/// Try for 5 seconds to connect
pub const CONNECT_TIMEOUT_MS: u64 = 5000;

/// Encrypt data echo budget
pub const ENCRYPT_DAT_TIMEOUT_MS: u64 = 1000;

/// Encryption budget
pub const ENCRYPT_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Connection Pool / Userspace Limits
// ============================================================================

/// Number of remotes we track at once
pub const ATHOME_RMT_MAX_CONNS: usize = 4;

/// Largest record (tag + payload) handed to userspace
pub const BT_ATHOME_MAX_USER_LEN: usize = 280;

// ============================================================================
// Air Protocol Packet Types
// ============================================================================

/// Largest payload following the packet type tag
pub const ATHOME_PKT_MAX_PAYLOAD: usize = 25;

pub const ATHOME_PKT_RX_ACK: u8 = 0;
pub const ATHOME_PKT_RX_INPUT: u8 = 1;
pub const ATHOME_PKT_RX_AUDIO_0: u8 = 2;
pub const ATHOME_PKT_RX_AUDIO_1: u8 = 3;
pub const ATHOME_PKT_RX_AUDIO_2: u8 = 4;
pub const ATHOME_PKT_RX_AUDIO_3: u8 = 5;
pub const ATHOME_PKT_RX_ACCEL: u8 = 6;
pub const ATHOME_PKT_RX_MODESWITCH: u8 = 7;
pub const ATHOME_PKT_RX_NFC: u8 = 8;
pub const ATHOME_PKT_RX_NFC_RF_DETECT: u8 = 9;
pub const ATHOME_PKT_RX_TOUCH_V2: u8 = 11;
pub const ATHOME_PKT_RX_BTN_V2: u8 = 12;
pub const ATHOME_PKT_RX_PAIRING: u8 = 119;

pub const ATHOME_PKT_TX_ACK: u8 = 0;
pub const ATHOME_PKT_TX_SET_PARAM: u8 = 1;
pub const ATHOME_PKT_TX_GET_PARAM: u8 = 2;
pub const ATHOME_PKT_TX_FW_UPDATE: u8 = 3;
pub const ATHOME_PKT_TX_ENC: u8 = 4;
pub const ATHOME_PKT_TX_NFC: u8 = 5;
pub const ATHOME_PKT_TX_IR: u8 = 6;
pub const ATHOME_PKT_TX_PAIRING: u8 = 119;

/// Legacy input info byte: a button mask follows
pub const ATHOME_INPUT_INFO_MASK_HAS_BTN: u8 = 0x40;

/// Legacy input info byte: three finger positions follow
pub const ATHOME_INPUT_INFO_MASK_HAS_TOUCH: u8 = 0x80;

/// Legacy input info byte: milliseconds since the previous report
pub const ATHOME_INPUT_INFO_MASK_TIMESTAMP: u8 = 0x3F;

/// Secure pairing bits in the legacy button mask
pub const ATHOME_PAIR_BTN_CHAR: u32 = 0x4000_0000;
pub const ATHOME_PAIR_BTN_BKSP: u32 = 0x8000_0000;
pub const SECURE_BTN_MASK: u32 = ATHOME_PAIR_BTN_CHAR | ATHOME_PAIR_BTN_BKSP;

/// ts_delta value meaning "unknown or too large for 16 bits"
pub const V2_TS_DELTA_UNKNOWN: u16 = 0xFFFF;

/// ts_delta unit, in microseconds
pub const V2_TS_DELTA_UNIT_US: i64 = 10;

// ============================================================================
// Input Reconstruction
// ============================================================================

/// Fingers tracked per remote
pub const ATHOME_MAX_FINGERS: usize = 3;

/// Raw touch coordinate range
pub const AAH_RAW_X_MAX: i32 = 0xFFFF;
pub const AAH_RAW_Y_MAX: i32 = 0xFFFF;

/// Touchpad size of the reference remote, in mm
pub const AAH_BT_TOUCHPAD_WIDTH: u32 = 50;
pub const AAH_BT_TOUCHPAD_HEIGHT: u32 = 50;

/// Time delta meaning "unknown, resynchronize with the wall clock"
pub const AAH_BT_UNKNOWN_TS_DELTA: i64 = -1;

// ============================================================================
// Userspace Messages (host -> driver) and Events (driver -> host)
// ============================================================================

pub const BT_ATHOME_MSG_ADD_DEV: u8 = 0x00;
pub const BT_ATHOME_MSG_SET_BIND_MODE: u8 = 0x01;
pub const BT_ATHOME_MSG_DO_BIND: u8 = 0x02;
pub const BT_ATHOME_MSG_STOP_BIND: u8 = 0x03;
pub const BT_ATHOME_MSG_ENCRYPT: u8 = 0x04;
pub const BT_ATHOME_MSG_DEL_DEV: u8 = 0x05;
pub const BT_ATHOME_MSG_GET_STATE: u8 = 0x06;
pub const BT_ATHOME_MSG_DATA: u8 = 0x07;
pub const BT_ATHOME_MSG_DEV_STATS: u8 = 0x08;

pub const BT_ATHOME_EVT_STATE: u8 = 0x81;
pub const BT_ATHOME_EVT_CONNECTED: u8 = 0x82;
pub const BT_ATHOME_EVT_DISCONNECTED: u8 = 0x83;
pub const BT_ATHOME_EVT_MODE_SWITCHED: u8 = 0x84;
pub const BT_ATHOME_EVT_DATA: u8 = 0x85;
pub const BT_ATHOME_EVT_DISCOVERED: u8 = 0x86;
pub const BT_ATHOME_EVT_DEV_STATS: u8 = 0x87;
pub const BT_ATHOME_EVT_BIND_KEY: u8 = 0x88;
