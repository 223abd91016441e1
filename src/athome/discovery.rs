//! Advertising report parser
//!
//! Decodes an HCI LE advertising report batch (BT 4.0 vol 2 E.7.7.65.2) into
//! per-device records, picks out the AtHome manufacturer marker and protocol
//! version, and decides whether a report warrants a connection attempt or a
//! "discovered" notification to userspace.
//!
//! The advertising data itself is a sequence of EIR chunks (BT 4.0 vol 3
//! C.8). A remote is recognised by a flags chunk of exactly
//! "LE General Discoverable + no BR/EDR" and a manufacturer chunk starting
//! with [`ATHOME_BT_IDENT`], followed by a big-endian protocol version and,
//! while the remote is in bind mode, its serial number.

use crate::athome::constants::*;
use crate::athome::cursor::{Cursor, ParseError};
use crate::athome::registry::KnownRegistry;
use crate::athome::types::{AddrType, AdvEventType, MacAddr, ProtoVersion};
use crate::athome::user::DiscoveredEvent;
use log::{debug, trace};
use uuid::Uuid;

/// Logging switches for the parser
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryLogging {
    /// Log every report
    pub all: bool,
    /// Log reports from registered remotes
    pub known: bool,
}

impl DiscoveryLogging {
    fn enabled(&self, known: bool) -> bool {
        self.all || (known && self.known)
    }
}

/// Flags chunk value with named bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvFlags(pub u8);

impl AdvFlags {
    pub fn limited_discoverable(&self) -> bool {
        self.0 & 0x01 != 0
    }

    pub fn general_discoverable(&self) -> bool {
        self.0 & 0x02 != 0
    }

    pub fn no_edr(&self) -> bool {
        self.0 & 0x04 != 0
    }

    pub fn simultaneous_edr_controller(&self) -> bool {
        self.0 & 0x08 != 0
    }

    pub fn simultaneous_edr_host(&self) -> bool {
        self.0 & 0x10 != 0
    }

    /// Exactly the flags an AtHome remote advertises
    pub fn is_athome(&self) -> bool {
        self.0 == ATHOME_ADV_FLAGS
    }

    fn describe(&self) -> String {
        let mut out = String::from("FLAGS(");
        for (set, name) in [
            (self.limited_discoverable(), " LimitedDisc"),
            (self.general_discoverable(), " GeneralDisc"),
            (self.no_edr(), " NoEDR"),
            (self.simultaneous_edr_controller(), " SimulEDRcontroller"),
            (self.simultaneous_edr_host(), " SimulEDR_Host"),
        ] {
            if set {
                out.push_str(name);
            }
        }
        out.push_str(" )");
        out
    }
}

/// Contents of the AtHome manufacturer chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufData {
    pub version: ProtoVersion,
    /// Only present while the remote is in bind mode
    pub serial: Option<Vec<u8>>,
}

/// One decoded advertising report
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredAdvertisement {
    pub mac: MacAddr,
    pub addr_type: AddrType,
    pub event_type: AdvEventType,
    pub rssi: i8,
    pub flags: Option<AdvFlags>,
    pub name: Option<String>,
    pub tx_power: Option<i8>,
    pub service_uuids: Vec<Uuid>,
    /// First manufacturer chunk carrying our identifier
    pub manuf: Option<ManufData>,
    /// At least one flags chunk had exactly the AtHome value
    pub flags_ok: bool,
    /// A manufacturer chunk with our identifier and a supported version was seen
    pub manuf_ok: bool,
}

impl DiscoveredAdvertisement {
    pub fn version(&self) -> ProtoVersion {
        self.manuf.as_ref().map(|m| m.version).unwrap_or_default()
    }

    pub fn serial(&self) -> Option<&[u8]> {
        self.manuf.as_ref().and_then(|m| m.serial.as_deref())
    }

    /// Flags, marker, version and address/event type all say "AtHome remote"
    pub fn is_athome_candidate(&self) -> bool {
        if !self.flags_ok || !self.manuf_ok {
            return false;
        }
        match self.event_type {
            AdvEventType::ConnectableUndirected => self.addr_type == AddrType::Random,
            AdvEventType::Directed => true,
            _ => false,
        }
    }
}

/// What to do about a single report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryAction {
    /// Connect to a remote in bind mode
    ConnectBind,
    /// Connect to a known remote
    ConnectKnown,
    /// Tell userspace about a new remote in bind mode
    Discovered,
    Ignore(&'static str),
}

/// Connection target handed back to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectCandidate {
    pub mac: MacAddr,
    pub version: ProtoVersion,
    pub bind: bool,
}

/// Result of parsing one advertising batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryOutcome {
    /// First remote worth connecting to
    pub candidate: Option<ConnectCandidate>,
    /// Notifications to queue for userspace
    pub discovered: Vec<DiscoveredEvent>,
    /// Device reports fully decoded
    pub devices_parsed: usize,
    /// Device count declared by the batch header
    pub devices_declared: usize,
}

impl DiscoveryOutcome {
    pub fn try_connect(&self) -> bool {
        self.candidate.is_some()
    }
}

/// Parse a batch that still carries its LE meta subevent code
pub fn parse_le_meta_event(
    buf: &[u8],
    registry: &KnownRegistry,
    is_connected: impl Fn(&MacAddr) -> bool,
    logging: DiscoveryLogging,
) -> DiscoveryOutcome {
    match buf.split_first() {
        Some((&HCI_EV_LE_ADVERTISING_REPORT, rest)) => {
            parse_advertising_reports(rest, registry, is_connected, logging)
        }
        Some((subevent, _)) => {
            debug!("Not an advertising report (subevent 0x{:02x})", subevent);
            DiscoveryOutcome::default()
        }
        None => {
            debug!("invalid adv packet (too short)");
            DiscoveryOutcome::default()
        }
    }
}

/// Parse a batch starting at its device count
///
/// Every report is decoded even after a candidate has been found, so later
/// reports still produce logging and discovered notifications; the first
/// candidate is the one returned.
pub fn parse_advertising_reports(
    buf: &[u8],
    registry: &KnownRegistry,
    is_connected: impl Fn(&MacAddr) -> bool,
    logging: DiscoveryLogging,
) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();
    let mut cur = Cursor::new(buf);

    let num = match cur.read_u8() {
        Ok(n) => n,
        Err(_) => {
            debug!("invalid adv packet (too short)");
            return outcome;
        }
    };
    outcome.devices_declared = num as usize;

    for _ in 0..num {
        let adv = match decode_report(&mut cur, registry, logging) {
            Ok(adv) => adv,
            Err(e) => {
                // the next report's start is unknowable past this point
                debug!("invalid adv device: {}", e);
                break;
            }
        };
        outcome.devices_parsed += 1;

        let known = registry.find(&adv.mac).is_some();
        let action = decide(&adv, registry);
        if logging.enabled(known) {
            debug!(" -> {:?}", action);
        }

        match action {
            DiscoveryAction::ConnectBind | DiscoveryAction::ConnectKnown => {
                if is_connected(&adv.mac) {
                    debug!("{} -> already connected", adv.mac);
                } else if outcome.candidate.is_none() {
                    outcome.candidate = Some(ConnectCandidate {
                        mac: adv.mac,
                        version: adv.version(),
                        bind: action == DiscoveryAction::ConnectBind,
                    });
                }
            }
            DiscoveryAction::Discovered => {
                outcome.discovered.push(DiscoveredEvent::new(
                    adv.mac,
                    adv.version(),
                    adv.rssi,
                    adv.serial().unwrap_or_default(),
                ));
            }
            DiscoveryAction::Ignore(_) => {}
        }
    }

    outcome
}

/// Decide what a single report asks of us
pub fn decide(adv: &DiscoveredAdvertisement, registry: &KnownRegistry) -> DiscoveryAction {
    if !adv.is_athome_candidate() {
        return DiscoveryAction::Ignore("not an AtHome remote");
    }

    let has_serial = adv.serial().is_some();
    let undirected = adv.event_type == AdvEventType::ConnectableUndirected;
    let directed = adv.event_type == AdvEventType::Directed;

    match registry.find(&adv.mac) {
        Some(remote) if remote.bind_mode => {
            if !undirected {
                DiscoveryAction::Ignore("unexpected directed adv while binding")
            } else if has_serial {
                DiscoveryAction::ConnectBind
            } else {
                DiscoveryAction::Ignore("non-bind adv from remote expected in bind mode")
            }
        }
        Some(_) => {
            if undirected || directed {
                DiscoveryAction::ConnectKnown
            } else {
                DiscoveryAction::Ignore("unexpected adv type from bound remote")
            }
        }
        None => {
            if undirected && has_serial && registry.in_bind_mode() {
                DiscoveryAction::Discovered
            } else if directed {
                DiscoveryAction::Ignore("unexpected direct adv")
            } else {
                DiscoveryAction::Ignore("unknown remote")
            }
        }
    }
}

/// Decode one report: fixed header, advertising data, RSSI
fn decode_report(
    cur: &mut Cursor<'_>,
    registry: &KnownRegistry,
    logging: DiscoveryLogging,
) -> Result<DiscoveredAdvertisement, ParseError> {
    let header: [u8; ADV_REPORT_HEADER_LEN] = cur.take_array()?;
    let event_type = AdvEventType::from(header[0]);
    let addr_type = AddrType::from(header[1]);
    let mac = MacAddr::from_slice(&header[2..8]).unwrap_or_default();
    let len = header[8] as usize;

    if len > HCI_LE_ADV_DATA_MAX_LEN {
        return Err(ParseError::AdvDataTooLong(len));
    }
    let data = cur.take(len)?;
    let rssi = cur.read_i8()?;

    let log = logging.enabled(registry.find(&mac).is_some());
    if log {
        debug!(
            "DEV {}({}) {}: RSSI {} ({}): {}",
            mac,
            if addr_type == AddrType::Random { 'R' } else { 'P' },
            event_type.name(),
            rssi,
            len,
            hex::encode_upper(data)
        );
    }

    let mut adv = DiscoveredAdvertisement {
        mac,
        addr_type,
        event_type,
        rssi,
        flags: None,
        name: None,
        tx_power: None,
        service_uuids: Vec::new(),
        manuf: None,
        flags_ok: false,
        manuf_ok: false,
    };
    parse_eir(data, &mut adv, log);
    Ok(adv)
}

/// Walk the EIR chunk stream; a malformed chunk ends the walk for this device only
fn parse_eir(data: &[u8], adv: &mut DiscoveredAdvertisement, log: bool) {
    let mut cur = Cursor::new(data);

    while let Ok(len) = cur.read_u8() {
        if len == 0 {
            if log {
                trace!("ERR(zero length chunk)");
            }
            continue;
        }
        let chunk = match cur.take(len as usize) {
            Ok(chunk) => chunk,
            Err(_) => {
                if log {
                    trace!("ERR(wanted len {} bytes, have {})", len, cur.remaining());
                }
                break;
            }
        };

        let (kind, value) = (chunk[0], &chunk[1..]);
        match kind {
            ADV_DATA_FLAGS => {
                if let Some(&raw) = value.first() {
                    let flags = AdvFlags(raw);
                    if flags.is_athome() {
                        adv.flags_ok = true;
                    }
                    adv.flags.get_or_insert(flags);
                    if log {
                        trace!("{}", flags.describe());
                    }
                }
            }
            ADV_DATA_UUID16S_INCOMPLETE | ADV_DATA_UUID16S_COMPLETE => {
                adv.service_uuids.extend(value.chunks_exact(2).map(|c| {
                    short_uuid(u16::from_le_bytes([c[0], c[1]]) as u32)
                }));
            }
            ADV_DATA_UUID32S_INCOMPLETE | ADV_DATA_UUID32S_COMPLETE => {
                adv.service_uuids.extend(
                    value
                        .chunks_exact(4)
                        .map(|c| short_uuid(u32::from_le_bytes([c[0], c[1], c[2], c[3]]))),
                );
            }
            ADV_DATA_UUID128S_INCOMPLETE | ADV_DATA_UUID128S_COMPLETE => {
                adv.service_uuids.extend(value.chunks_exact(16).map(|c| {
                    let mut bytes = [0u8; 16];
                    bytes.copy_from_slice(c);
                    bytes.reverse();
                    Uuid::from_bytes(bytes)
                }));
            }
            ADV_DATA_NAME_SHORT | ADV_DATA_NAME_COMPLETE => {
                let name = String::from_utf8_lossy(value).into_owned();
                if log {
                    trace!(
                        "NAME({}): {}",
                        if kind == ADV_DATA_NAME_SHORT { "shortened" } else { "complete" },
                        name
                    );
                }
                adv.name = Some(name);
            }
            ADV_DATA_TX_POWER => {
                if let Some(&raw) = value.first() {
                    adv.tx_power = Some(raw as i8);
                }
            }
            ADV_DATA_MANUF_SPECIFIC => {
                if !adv.manuf_ok && value.len() >= MANUF_DATA_LEN {
                    parse_manuf(value, adv, log);
                }
                if log {
                    trace!("MANUF_DATA({})", hex::encode_upper(value));
                }
            }
            other => {
                if log {
                    trace!("UNKNOWN({})({})", other, hex::encode_upper(value));
                }
            }
        }
    }

    if log {
        for uuid in &adv.service_uuids {
            trace!("UUID({})", uuid);
        }
    }
}

fn parse_manuf(value: &[u8], adv: &mut DiscoveredAdvertisement, log: bool) {
    if value[..ATHOME_BT_IDENT.len()] != ATHOME_BT_IDENT {
        if log {
            trace!("manuf->ident({})", String::from_utf8_lossy(&value[..ATHOME_BT_IDENT.len()]));
        }
        return;
    }

    let mut ver = [0u8; 4];
    ver.copy_from_slice(&value[ATHOME_BT_IDENT.len()..MANUF_DATA_LEN]);
    let version = ProtoVersion::from_be_bytes(ver);
    if version.is_supported() {
        adv.manuf_ok = true;
    }

    // bind mode remotes send their serial number too
    let serial = (value.len() > MANUF_DATA_LEN).then(|| value[MANUF_DATA_LEN..].to_vec());
    if log {
        trace!(
            "AAH proto_ver({}){}",
            version,
            serial
                .as_ref()
                .map(|s| format!(" SN({})", String::from_utf8_lossy(s)))
                .unwrap_or_default()
        );
    }
    adv.manuf = Some(ManufData { version, serial });
}

/// Expand a 16/32-bit UUID on the Bluetooth base UUID
fn short_uuid(short: u32) -> Uuid {
    Uuid::from_u128(((short as u128) << 96) | 0x0000_0000_0000_1000_8000_0080_5F9B_34FB)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REMOTE: MacAddr = MacAddr([0x01, 0x02, 0x03, 0x04, 0x05, 0xC6]);

    fn manuf_chunk(version: u32, serial: Option<&[u8]>) -> Vec<u8> {
        let mut value = ATHOME_BT_IDENT.to_vec();
        value.extend_from_slice(&version.to_be_bytes());
        if let Some(s) = serial {
            value.extend_from_slice(s);
        }
        let mut chunk = vec![value.len() as u8 + 1, ADV_DATA_MANUF_SPECIFIC];
        chunk.extend(value);
        chunk
    }

    fn report(evt: u8, addr_type: u8, mac: MacAddr, data: &[u8], rssi: i8) -> Vec<u8> {
        let mut out = vec![evt, addr_type];
        out.extend_from_slice(mac.as_bytes());
        out.push(data.len() as u8);
        out.extend_from_slice(data);
        out.push(rssi as u8);
        out
    }

    fn athome_data(flags: u8, version: u32, serial: Option<&[u8]>) -> Vec<u8> {
        let mut data = vec![0x02, ADV_DATA_FLAGS, flags];
        data.extend(manuf_chunk(version, serial));
        data
    }

    fn batch(reports: &[Vec<u8>]) -> Vec<u8> {
        let mut out = vec![reports.len() as u8];
        for r in reports {
            out.extend_from_slice(r);
        }
        out
    }

    fn known(bind_mode: bool) -> KnownRegistry {
        let mut registry = KnownRegistry::new();
        if bind_mode {
            registry.add_binding(REMOTE);
        } else {
            registry.add_bound(REMOTE, [0; AAH_BT_LTK_SZ]);
        }
        registry
    }

    fn parse(buf: &[u8], registry: &KnownRegistry) -> DiscoveryOutcome {
        parse_advertising_reports(buf, registry, |_| false, DiscoveryLogging::default())
    }

    #[test]
    fn test_known_remote_connects() {
        let buf = batch(&[report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0101, None), -60)]);
        let outcome = parse(&buf, &known(false));

        assert!(outcome.try_connect());
        let candidate = outcome.candidate.unwrap();
        assert_eq!(candidate.mac, REMOTE);
        assert_eq!(candidate.version, ProtoVersion(0x0001_0101));
        assert!(!candidate.bind);
        assert_eq!(outcome.devices_parsed, 1);
    }

    #[test]
    fn test_wrong_flags_never_connect() {
        for flags in [0x00u8, 0x02, 0x04, 0x05, 0x07, 0x1A] {
            for evt in [0u8, 1] {
                let buf = batch(&[report(evt, 1, REMOTE, &athome_data(flags, 0x0001_0101, None), -40)]);
                assert!(!parse(&buf, &known(false)).try_connect(), "flags 0x{:02x}", flags);
            }
        }
    }

    #[test]
    fn test_wrong_ident_never_connects() {
        let mut data = vec![0x02, ADV_DATA_FLAGS, 0x06];
        let mut manuf = manuf_chunk(0x0001_0101, None);
        manuf[2] = b'g';
        data.extend(manuf);

        let buf = batch(&[report(0, 1, REMOTE, &data, -40)]);
        assert!(!parse(&buf, &known(false)).try_connect());
    }

    #[test]
    fn test_old_version_rejected() {
        let buf = batch(&[report(0, 1, REMOTE, &athome_data(0x06, 0x0000_FFFF, None), -40)]);
        assert!(!parse(&buf, &known(false)).try_connect());
    }

    #[test]
    fn test_public_address_undirected_rejected() {
        let buf = batch(&[report(0, 0, REMOTE, &athome_data(0x06, 0x0001_0000, None), -40)]);
        assert!(!parse(&buf, &known(false)).try_connect());
    }

    #[test]
    fn test_directed_known_remote_connects() {
        let buf = batch(&[report(1, 0, REMOTE, &athome_data(0x06, 0x0001_0000, None), -40)]);
        assert!(parse(&buf, &known(false)).try_connect());
    }

    #[test]
    fn test_bind_flow() {
        let registry = known(true);

        let bind_adv = batch(&[report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0100, Some(b"SN123")), -40)]);
        let outcome = parse(&bind_adv, &registry);
        assert!(outcome.candidate.unwrap().bind);

        // Non-bind advert while we expect a bind advert
        let plain_adv = batch(&[report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0100, None), -40)]);
        assert!(!parse(&plain_adv, &registry).try_connect());

        // Directed advert while binding
        let directed = batch(&[report(1, 1, REMOTE, &athome_data(0x06, 0x0001_0100, Some(b"SN")), -40)]);
        assert!(!parse(&directed, &registry).try_connect());
    }

    #[test]
    fn test_unknown_remote_discovered_in_bind_mode() {
        let mut registry = KnownRegistry::new();
        registry.set_bind_mode(true);

        let serial = b"0123456789ABCDEFGHIJKLMN";
        let buf = batch(&[report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0101, Some(&serial[..21])), -55)]);
        let outcome = parse(&buf, &registry);

        assert!(!outcome.try_connect());
        assert_eq!(outcome.discovered.len(), 1);
        let evt = &outcome.discovered[0];
        assert_eq!(evt.mac, REMOTE);
        assert_eq!(evt.rssi, -55);
        assert_eq!(evt.version, ProtoVersion(0x0001_0101));
        assert_eq!(evt.serial.len(), AAH_BT_SLEN_MAX);
    }

    #[test]
    fn test_unknown_remote_ignored_outside_bind_mode() {
        let registry = KnownRegistry::new();
        let buf = batch(&[report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0101, Some(b"SN1")), -55)]);
        let outcome = parse(&buf, &registry);

        assert!(!outcome.try_connect());
        assert!(outcome.discovered.is_empty());
    }

    #[test]
    fn test_already_connected_is_skipped() {
        let buf = batch(&[report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0101, None), -60)]);
        let outcome = parse_advertising_reports(&buf, &known(false), |m| *m == REMOTE, DiscoveryLogging::default());
        assert!(!outcome.try_connect());
    }

    #[test]
    fn test_first_candidate_wins() {
        let other = MacAddr([9, 9, 9, 9, 9, 0xC9]);
        let mut registry = known(false);
        registry.add_bound(other, [0; AAH_BT_LTK_SZ]);

        let buf = batch(&[
            report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0000, None), -60),
            report(0, 1, other, &athome_data(0x06, 0x0001_0101, None), -30),
        ]);
        let outcome = parse(&buf, &registry);
        assert_eq!(outcome.candidate.unwrap().mac, REMOTE);
        assert_eq!(outcome.devices_parsed, 2);
    }

    #[test]
    fn test_truncated_batch_keeps_earlier_candidate() {
        let mut buf = batch(&[
            report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0101, None), -60),
            report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0101, None), -60),
        ]);
        buf.truncate(buf.len() - 3);
        // and claim more devices than present
        buf[0] = 5;

        let outcome = parse(&buf, &known(false));
        assert!(outcome.try_connect());
        assert_eq!(outcome.devices_declared, 5);
        assert_eq!(outcome.devices_parsed, 1);
    }

    #[test]
    fn test_adv_data_too_long_rejected() {
        let data = vec![0u8; HCI_LE_ADV_DATA_MAX_LEN + 1];
        let buf = batch(&[report(0, 1, REMOTE, &data, -60)]);
        let outcome = parse(&buf, &known(false));
        assert_eq!(outcome.devices_parsed, 0);
    }

    #[test]
    fn test_empty_and_short_buffers() {
        let registry = known(false);
        assert_eq!(parse(&[], &registry), DiscoveryOutcome::default());
        let outcome = parse(&[1, 0, 1, 2], &registry);
        assert_eq!(outcome.devices_parsed, 0);
        assert!(!outcome.try_connect());
    }

    #[test]
    fn test_bad_chunk_truncates_device_only() {
        // flags then a chunk claiming more bytes than remain
        let mut data = athome_data(0x06, 0x0001_0101, None);
        data.extend_from_slice(&[0x09, 0x09, b'x']);
        let mut zero_len = vec![0x00];
        zero_len.extend(athome_data(0x06, 0x0001_0101, None));

        let buf = batch(&[
            report(0, 1, REMOTE, &data, -60),
            report(0, 1, REMOTE, &zero_len, -60),
        ]);
        let outcome = parse(&buf, &known(false));
        assert_eq!(outcome.devices_parsed, 2);
        assert!(outcome.try_connect());
    }

    #[test]
    fn test_eir_fields_decoded() {
        let mut data = vec![0x02, ADV_DATA_FLAGS, 0x06];
        data.extend_from_slice(&[0x03, ADV_DATA_UUID16S_COMPLETE, 0x12, 0x18]);
        data.extend_from_slice(&[0x05, ADV_DATA_NAME_COMPLETE, b'W', b'o', b'l', b'f']);
        data.extend_from_slice(&[0x02, ADV_DATA_TX_POWER, 0xFC]);

        let mut buf = vec![0u8, 1];
        buf.extend_from_slice(REMOTE.as_bytes());
        buf.push(data.len() as u8);
        buf.extend_from_slice(&data);
        buf.push(0xC4);

        let mut cur = Cursor::new(&buf);
        let adv = decode_report(&mut cur, &KnownRegistry::new(), DiscoveryLogging::default()).unwrap();
        assert_eq!(adv.name.as_deref(), Some("Wolf"));
        assert_eq!(adv.tx_power, Some(-4));
        assert_eq!(adv.rssi, -60);
        assert_eq!(
            adv.service_uuids,
            vec![Uuid::parse_str("00001812-0000-1000-8000-00805f9b34fb").unwrap()]
        );
        assert!(adv.flags.unwrap().general_discoverable());
        assert!(adv.flags_ok);
        assert!(!adv.manuf_ok);
    }

    #[test]
    fn test_le_meta_wrapper() {
        let mut buf = vec![HCI_EV_LE_ADVERTISING_REPORT];
        buf.extend(batch(&[report(0, 1, REMOTE, &athome_data(0x06, 0x0001_0101, None), -60)]));
        let outcome = parse_le_meta_event(&buf, &known(false), |_| false, DiscoveryLogging::default());
        assert!(outcome.try_connect());

        buf[0] = 0x01;
        let outcome = parse_le_meta_event(&buf, &known(false), |_| false, DiscoveryLogging::default());
        assert!(!outcome.try_connect());
    }
}
