//! Userspace bridge records
//!
//! Control messages arrive from userspace as a tag byte (0x00..=0x08)
//! followed by a packed payload; events go the other way tagged
//! 0x81..=0x88. Addresses are carried in wire order, counters little-endian.
//! No record exceeds [`BT_ATHOME_MAX_USER_LEN`] bytes including its tag.

use crate::athome::constants::*;
use crate::athome::cursor::Cursor;
use crate::athome::proto::ProtocolError;
use crate::athome::types::{BtStats, ConnState, MacAddr, PowerMode, ProtoVersion};

/// Control message from userspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMessage {
    AddDev { mac: MacAddr, ltk: [u8; AAH_BT_LTK_SZ] },
    SetBindMode(bool),
    DoBind(MacAddr),
    StopBind(MacAddr),
    Encrypt(MacAddr),
    DelDev(MacAddr),
    GetState,
    Data { mac: MacAddr, pkt_type: u8, data: Vec<u8> },
    DevStats(MacAddr),
}

impl UserMessage {
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag, body) = buf.split_first().ok_or(ProtocolError::Empty)?;
        let mut cur = Cursor::new(body);
        let short = |wanted: usize| ProtocolError::MessageTooShort {
            wanted: wanted + 1,
            got: buf.len(),
        };
        let read_mac = |cur: &mut Cursor<'_>| {
            cur.take_array::<6>()
                .map(MacAddr)
                .map_err(|_| short(6))
        };

        let msg = match tag {
            BT_ATHOME_MSG_ADD_DEV => {
                let mac = read_mac(&mut cur)?;
                let ltk = cur
                    .take_array::<AAH_BT_LTK_SZ>()
                    .map_err(|_| short(6 + AAH_BT_LTK_SZ))?;
                UserMessage::AddDev { mac, ltk }
            }
            BT_ATHOME_MSG_SET_BIND_MODE => {
                let mode = cur.read_u8().map_err(|_| short(1))?;
                UserMessage::SetBindMode(mode != 0)
            }
            BT_ATHOME_MSG_DO_BIND => UserMessage::DoBind(read_mac(&mut cur)?),
            BT_ATHOME_MSG_STOP_BIND => UserMessage::StopBind(read_mac(&mut cur)?),
            BT_ATHOME_MSG_ENCRYPT => UserMessage::Encrypt(read_mac(&mut cur)?),
            BT_ATHOME_MSG_DEL_DEV => UserMessage::DelDev(read_mac(&mut cur)?),
            BT_ATHOME_MSG_GET_STATE => UserMessage::GetState,
            BT_ATHOME_MSG_DATA => {
                let mac = read_mac(&mut cur)?;
                let pkt_type = cur.read_u8().map_err(|_| short(7))?;
                let data = cur.rest().to_vec();
                if data.len() > ATHOME_PKT_MAX_PAYLOAD {
                    return Err(ProtocolError::PayloadTooLong(data.len()));
                }
                UserMessage::Data {
                    mac,
                    pkt_type,
                    data,
                }
            }
            BT_ATHOME_MSG_DEV_STATS => UserMessage::DevStats(read_mac(&mut cur)?),
            other => return Err(ProtocolError::UnknownTag(other)),
        };
        Ok(msg)
    }

    pub fn tag(&self) -> u8 {
        match self {
            UserMessage::AddDev { .. } => BT_ATHOME_MSG_ADD_DEV,
            UserMessage::SetBindMode(_) => BT_ATHOME_MSG_SET_BIND_MODE,
            UserMessage::DoBind(_) => BT_ATHOME_MSG_DO_BIND,
            UserMessage::StopBind(_) => BT_ATHOME_MSG_STOP_BIND,
            UserMessage::Encrypt(_) => BT_ATHOME_MSG_ENCRYPT,
            UserMessage::DelDev(_) => BT_ATHOME_MSG_DEL_DEV,
            UserMessage::GetState => BT_ATHOME_MSG_GET_STATE,
            UserMessage::Data { .. } => BT_ATHOME_MSG_DATA,
            UserMessage::DevStats(_) => BT_ATHOME_MSG_DEV_STATS,
        }
    }

    /// Encode tag and payload, as userspace would send it
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.tag()];
        match self {
            UserMessage::AddDev { mac, ltk } => {
                out.extend_from_slice(mac.as_bytes());
                out.extend_from_slice(ltk);
            }
            UserMessage::SetBindMode(on) => out.push(*on as u8),
            UserMessage::DoBind(mac)
            | UserMessage::StopBind(mac)
            | UserMessage::Encrypt(mac)
            | UserMessage::DelDev(mac)
            | UserMessage::DevStats(mac) => out.extend_from_slice(mac.as_bytes()),
            UserMessage::GetState => {}
            UserMessage::Data {
                mac,
                pkt_type,
                data,
            } => {
                out.extend_from_slice(mac.as_bytes());
                out.push(*pkt_type);
                out.extend_from_slice(data);
            }
        }
        out
    }
}

/// "New remote in bind mode" notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEvent {
    pub mac: MacAddr,
    pub version: ProtoVersion,
    pub rssi: i8,
    /// At most [`AAH_BT_SLEN_MAX`] bytes
    pub serial: Vec<u8>,
}

impl DiscoveredEvent {
    pub fn new(mac: MacAddr, version: ProtoVersion, rssi: i8, serial: &[u8]) -> Self {
        let len = serial.len().min(AAH_BT_SLEN_MAX);
        Self {
            mac,
            version,
            rssi,
            serial: serial[..len].to_vec(),
        }
    }
}

/// One entry of a state snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteState {
    pub mac: MacAddr,
    pub con_state: ConnState,
    pub pwr_state: PowerMode,
    pub input_dev_idx: u8,
}

/// Reserved bytes following each state entry
const STATE_ENTRY_RFU: usize = 7;

/// Reserved bytes in a discovered record
const DISCOVERED_RFU: usize = 8;

/// Event for userspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    State(Vec<RemoteState>),
    Connected(MacAddr),
    Disconnected { mac: MacAddr, stats: BtStats },
    ModeSwitched { mac: MacAddr, mode: PowerMode },
    Data { mac: MacAddr, pkt_type: u8, data: Vec<u8> },
    Discovered(DiscoveredEvent),
    DevStats { mac: MacAddr, stats: BtStats },
    BindKey { mac: MacAddr, key: u8 },
}

impl UserEvent {
    pub fn tag(&self) -> u8 {
        match self {
            UserEvent::State(_) => BT_ATHOME_EVT_STATE,
            UserEvent::Connected(_) => BT_ATHOME_EVT_CONNECTED,
            UserEvent::Disconnected { .. } => BT_ATHOME_EVT_DISCONNECTED,
            UserEvent::ModeSwitched { .. } => BT_ATHOME_EVT_MODE_SWITCHED,
            UserEvent::Data { .. } => BT_ATHOME_EVT_DATA,
            UserEvent::Discovered(_) => BT_ATHOME_EVT_DISCOVERED,
            UserEvent::DevStats { .. } => BT_ATHOME_EVT_DEV_STATS,
            UserEvent::BindKey { .. } => BT_ATHOME_EVT_BIND_KEY,
        }
    }

    pub fn mac(&self) -> Option<MacAddr> {
        match self {
            UserEvent::State(_) => None,
            UserEvent::Connected(mac)
            | UserEvent::Disconnected { mac, .. }
            | UserEvent::ModeSwitched { mac, .. }
            | UserEvent::Data { mac, .. }
            | UserEvent::DevStats { mac, .. }
            | UserEvent::BindKey { mac, .. } => Some(*mac),
            UserEvent::Discovered(evt) => Some(evt.mac),
        }
    }

    /// Encode into a tagged, packed user record
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut out = vec![self.tag()];
        match self {
            UserEvent::State(remotes) => {
                // fixed size: always room for every slot
                let num = remotes.len().min(ATHOME_RMT_MAX_CONNS);
                out.push(num as u8);
                for i in 0..ATHOME_RMT_MAX_CONNS {
                    match remotes.get(i) {
                        Some(r) => {
                            out.extend_from_slice(r.mac.as_bytes());
                            out.push(r.con_state as u8);
                            out.push(r.pwr_state as u8);
                            out.push(r.input_dev_idx);
                            out.extend_from_slice(&[0; STATE_ENTRY_RFU]);
                        }
                        None => out.extend_from_slice(&[0; 6 + 3 + STATE_ENTRY_RFU]),
                    }
                }
            }
            UserEvent::Connected(mac) => out.extend_from_slice(mac.as_bytes()),
            UserEvent::Disconnected { mac, stats } | UserEvent::DevStats { mac, stats } => {
                out.extend_from_slice(mac.as_bytes());
                stats.encode_into(&mut out);
            }
            UserEvent::ModeSwitched { mac, mode } => {
                out.extend_from_slice(mac.as_bytes());
                out.push(*mode as u8);
            }
            UserEvent::Data {
                mac,
                pkt_type,
                data,
            } => {
                out.extend_from_slice(mac.as_bytes());
                out.push(*pkt_type);
                out.extend_from_slice(data);
            }
            UserEvent::Discovered(evt) => {
                out.extend_from_slice(evt.mac.as_bytes());
                out.extend_from_slice(&evt.version.to_be_bytes());
                out.push(evt.rssi as u8);
                out.extend_from_slice(&[0; DISCOVERED_RFU]);
                out.extend_from_slice(&evt.serial[..evt.serial.len().min(AAH_BT_SLEN_MAX)]);
            }
            UserEvent::BindKey { mac, key } => {
                out.extend_from_slice(mac.as_bytes());
                out.push(*key);
            }
        }

        if out.len() > BT_ATHOME_MAX_USER_LEN {
            return Err(ProtocolError::EventTooLong(out.len()));
        }
        Ok(out)
    }
}
