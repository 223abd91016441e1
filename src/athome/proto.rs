//! Air protocol packet codec
//!
//! Every packet exchanged with a remote is a one byte type tag followed by a
//! type specific payload of at most [`ATHOME_PKT_MAX_PAYLOAD`] bytes. Inbound
//! (remote -> host) packets decode into [`InboundPacket`]; outbound (host ->
//! remote) packets are built as [`OutboundPacket`] and encoded for the
//! transport. Field layouts are packed little-endian.

use crate::athome::constants::*;
use crate::athome::cursor::{Cursor, ParseError};
use crate::athome::types::PowerMode;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Packet type {pkt_type}: {source}")]
    Malformed {
        pkt_type: u8,
        #[source]
        source: ParseError,
    },

    #[error("Payload of {0} bytes exceeds the 25 byte limit")]
    PayloadTooLong(usize),

    #[error("Message too short: wanted {wanted} bytes, got {got}")]
    MessageTooShort { wanted: usize, got: usize },

    #[error("Unknown message tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("Empty message")]
    Empty,

    #[error("Event of {0} bytes exceeds the user record limit")]
    EventTooLong(usize),
}

/// Legacy input report: optional button mask and three finger positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyInput {
    pub info: u8,
    pub buttons: Option<u32>,
    pub fingers: Option<[(u16, u16); 3]>,
}

impl LegacyInput {
    /// Milliseconds since the previous report, `None` when unknown
    pub fn elapsed_ms(&self) -> Option<u8> {
        let ts = self.info & ATHOME_INPUT_INFO_MASK_TIMESTAMP;
        (ts != ATHOME_INPUT_INFO_MASK_TIMESTAMP).then_some(ts)
    }

    /// Buttons with the secure pairing bits removed
    pub fn key_mask(&self) -> Option<u32> {
        self.buttons.map(|b| b & !SECURE_BTN_MASK)
    }

    /// A finger reported at (0xFFFF, 0xFFFF) is lifted
    pub fn finger_down(pos: (u16, u16)) -> bool {
        pos != (0xFFFF, 0xFFFF)
    }
}

/// v2 touch sample for finger 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchV2 {
    pub ts_delta: u16,
    pub down: bool,
    pub x: u16,
    pub y: u16,
}

/// v2 single button sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonV2 {
    pub ts_delta: u16,
    pub down: bool,
    pub id: u8,
}

/// Convert a v2 timestamp delta to microseconds, `None` when unknown
pub fn v2_delta_us(ts_delta: u16) -> Option<i64> {
    (ts_delta != V2_TS_DELTA_UNKNOWN).then(|| ts_delta as i64 * V2_TS_DELTA_UNIT_US)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccelSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSwitch {
    pub voltage: u16,
    pub mode: u8,
}

impl ModeSwitch {
    pub fn power_mode(&self) -> Option<PowerMode> {
        PowerMode::from_u8(self.mode)
    }
}

/// Packet received from a remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPacket {
    Ack { orig_pkt_type: u8, data: Vec<u8> },
    Input(LegacyInput),
    Audio { channel: u8, data: Vec<u8> },
    Accel(AccelSample),
    ModeSwitch(ModeSwitch),
    Nfc(Vec<u8>),
    NfcRfDetect(Vec<u8>),
    TouchV2(TouchV2),
    ButtonV2(ButtonV2),
    Pairing(Vec<u8>),
    /// Types this build does not know; passed through untouched
    Unknown { pkt_type: u8, data: Vec<u8> },
}

impl InboundPacket {
    pub fn decode(pkt_type: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        let malformed = |source| ProtocolError::Malformed { pkt_type, source };
        let mut cur = Cursor::new(payload);

        let pkt = match pkt_type {
            ATHOME_PKT_RX_ACK => {
                let orig_pkt_type = cur.read_u8().map_err(malformed)?;
                InboundPacket::Ack {
                    orig_pkt_type,
                    data: cur.rest().to_vec(),
                }
            }
            ATHOME_PKT_RX_INPUT => {
                let info = cur.read_u8().map_err(malformed)?;
                let buttons = if info & ATHOME_INPUT_INFO_MASK_HAS_BTN != 0 {
                    Some(cur.read_u32_le().map_err(malformed)?)
                } else {
                    None
                };
                let fingers = if info & ATHOME_INPUT_INFO_MASK_HAS_TOUCH != 0 {
                    let mut fingers = [(0u16, 0u16); 3];
                    for finger in fingers.iter_mut() {
                        let x = cur.read_u16_le().map_err(malformed)?;
                        let y = cur.read_u16_le().map_err(malformed)?;
                        *finger = (x, y);
                    }
                    Some(fingers)
                } else {
                    None
                };
                InboundPacket::Input(LegacyInput {
                    info,
                    buttons,
                    fingers,
                })
            }
            ATHOME_PKT_RX_AUDIO_0..=ATHOME_PKT_RX_AUDIO_3 => InboundPacket::Audio {
                channel: pkt_type - ATHOME_PKT_RX_AUDIO_0,
                data: payload.to_vec(),
            },
            ATHOME_PKT_RX_ACCEL => InboundPacket::Accel(AccelSample {
                x: cur.read_i16_le().map_err(malformed)?,
                y: cur.read_i16_le().map_err(malformed)?,
                z: cur.read_i16_le().map_err(malformed)?,
            }),
            ATHOME_PKT_RX_MODESWITCH => InboundPacket::ModeSwitch(ModeSwitch {
                voltage: cur.read_u16_le().map_err(malformed)?,
                mode: cur.read_u8().map_err(malformed)?,
            }),
            ATHOME_PKT_RX_NFC => InboundPacket::Nfc(payload.to_vec()),
            ATHOME_PKT_RX_NFC_RF_DETECT => InboundPacket::NfcRfDetect(payload.to_vec()),
            ATHOME_PKT_RX_TOUCH_V2 => {
                let ts_delta = cur.read_u16_le().map_err(malformed)?;
                let x = cur.read_u16_le().map_err(malformed)?;
                let y = cur.read_u16_le().map_err(malformed)?;
                InboundPacket::TouchV2(TouchV2 {
                    ts_delta,
                    down: x & 0x8000 != 0,
                    x: x & 0x7FFF,
                    y: y & 0x7FFF,
                })
            }
            ATHOME_PKT_RX_BTN_V2 => {
                let ts_delta = cur.read_u16_le().map_err(malformed)?;
                let data = cur.read_u8().map_err(malformed)?;
                InboundPacket::ButtonV2(ButtonV2 {
                    ts_delta,
                    down: data & 0x80 != 0,
                    id: data & 0x7F,
                })
            }
            ATHOME_PKT_RX_PAIRING => InboundPacket::Pairing(payload.to_vec()),
            other => InboundPacket::Unknown {
                pkt_type: other,
                data: payload.to_vec(),
            },
        };
        Ok(pkt)
    }

    /// Whether the decoded packet feeds the input pipeline
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            InboundPacket::Input(_) | InboundPacket::TouchV2(_) | InboundPacket::ButtonV2(_)
        )
    }
}

/// Packet sent to a remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPacket {
    Ack { orig_pkt_type: u8, data: Vec<u8> },
    SetParam { param: u8, value: Vec<u8> },
    GetParam { param: u8 },
    FwUpdate(Vec<u8>),
    Encrypt { entropy: [u8; AAH_BT_ENTROPY_SZ] },
    Nfc(Vec<u8>),
    Ir(Vec<u8>),
    Pairing { offset: u8, total_len: u8, data: Vec<u8> },
    /// Already framed by userspace
    Raw { pkt_type: u8, data: Vec<u8> },
}

impl OutboundPacket {
    pub fn pkt_type(&self) -> u8 {
        match self {
            OutboundPacket::Ack { .. } => ATHOME_PKT_TX_ACK,
            OutboundPacket::SetParam { .. } => ATHOME_PKT_TX_SET_PARAM,
            OutboundPacket::GetParam { .. } => ATHOME_PKT_TX_GET_PARAM,
            OutboundPacket::FwUpdate(_) => ATHOME_PKT_TX_FW_UPDATE,
            OutboundPacket::Encrypt { .. } => ATHOME_PKT_TX_ENC,
            OutboundPacket::Nfc(_) => ATHOME_PKT_TX_NFC,
            OutboundPacket::Ir(_) => ATHOME_PKT_TX_IR,
            OutboundPacket::Pairing { .. } => ATHOME_PKT_TX_PAIRING,
            OutboundPacket::Raw { pkt_type, .. } => *pkt_type,
        }
    }

    /// Encode the payload (without the type tag)
    pub fn encode_payload(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(ATHOME_PKT_MAX_PAYLOAD);
        match self {
            OutboundPacket::Ack { orig_pkt_type, data } => {
                out.push(*orig_pkt_type);
                out.extend_from_slice(data);
            }
            OutboundPacket::SetParam { param, value } => {
                out.push(*param);
                out.extend_from_slice(value);
            }
            OutboundPacket::GetParam { param } => out.push(*param),
            OutboundPacket::Encrypt { entropy } => out.extend_from_slice(entropy),
            OutboundPacket::Pairing {
                offset,
                total_len,
                data,
            } => {
                out.push(*offset);
                out.push(*total_len);
                out.extend_from_slice(data);
            }
            OutboundPacket::FwUpdate(data)
            | OutboundPacket::Nfc(data)
            | OutboundPacket::Ir(data)
            | OutboundPacket::Raw { data, .. } => out.extend_from_slice(data),
        }

        if out.len() > ATHOME_PKT_MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLong(out.len()));
        }
        Ok(out)
    }

    /// Encode tag and payload into one frame
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload = self.encode_payload()?;
        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.push(self.pkt_type());
        frame.extend(payload);
        Ok(frame)
    }
}
