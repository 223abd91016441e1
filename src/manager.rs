//! High-level AtHome remote manager
//!
//! This module ties the pieces together: advertising reports go through the
//! discovery parser and may start a connection, the transport reports link
//! changes back, inbound packets are dispatched to the input pipeline or the
//! user queue, and control messages from userspace update the registry or
//! go out to a remote.
//!
//! Locks are always taken in the order registry, slots, input.

use crate::athome::constants::*;
use crate::athome::discovery::{parse_advertising_reports, parse_le_meta_event, DiscoveryOutcome};
use crate::athome::proto::{v2_delta_us, InboundPacket, LegacyInput, OutboundPacket, ProtocolError};
use crate::athome::registry::{KnownRegistry, RegistryError};
use crate::athome::types::{BtStats, ConnState, MacAddr, PowerMode, ProtoVersion};
use crate::athome::user::{RemoteState, UserEvent, UserMessage};
use crate::backend::{ActivityEvent, ActivityIndicator, BackendError, ChipTransport, InputBackend, TransportError};
use crate::config::Config;
use crate::input::{Clock, FilterParams, InputPipeline, SystemClock};
use crate::slots::{ConnectionSlot, SlotTable};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Unknown remote {0}")]
    UnknownRemote(MacAddr),

    #[error("Remote {0} is not connected")]
    NotConnected(MacAddr),

    #[error("Remote {0} already holds slot {1}")]
    AlreadyConnected(MacAddr, usize),

    #[error("All {0} connection slots are in use")]
    PoolExhausted(usize),

    #[error("Remote {mac} cannot take data while {state:?}")]
    NotReady { mac: MacAddr, state: ConnState },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, ManagerError> {
    mutex
        .lock()
        .map_err(|e| ManagerError::LockPoisoned(e.to_string()))
}

/// Manager for AtHome remotes
pub struct AthomeManager<I, T>
where
    I: InputBackend,
    T: ChipTransport,
{
    config: Config,
    transport: T,
    /// Known remotes, shared with whoever persists or inspects them
    registry: Arc<Mutex<KnownRegistry>>,
    slots: Mutex<SlotTable>,
    input: Mutex<InputPipeline<I>>,
    clock: Arc<dyn Clock>,
    event_sender: Sender<UserEvent>,
    event_receiver: Receiver<UserEvent>,
}

impl<I, T> AthomeManager<I, T>
where
    I: InputBackend,
    T: ChipTransport,
{
    /// Create a new manager running on wall time
    pub fn new(config: Config, input: I, transport: T) -> Self {
        Self::with_clock(config, input, transport, Arc::new(SystemClock))
    }

    /// Create a new manager with an explicit time source
    pub fn with_clock(config: Config, input: I, transport: T, clock: Arc<dyn Clock>) -> Self {
        if config.queue.user_queue_capacity == 0 {
            warn!("User queue capacity 0 would drop every event, using 1");
        }
        let (event_sender, event_receiver) = bounded(config.queue.user_queue_capacity.max(1));

        let registry = match &config.registry.path {
            Some(path) => KnownRegistry::load(path),
            None => KnownRegistry::new(),
        };
        info!("Loaded {} known remotes", registry.len());

        let mut pipeline = InputPipeline::new(input, Arc::clone(&clock));
        pipeline.set_filter_params(config.filter);
        pipeline.set_geometry(config.touchpad);
        pipeline.set_logging(config.logging.input());

        Self {
            config,
            transport,
            registry: Arc::new(Mutex::new(registry)),
            slots: Mutex::new(SlotTable::new()),
            input: Mutex::new(pipeline),
            clock,
            event_sender,
            event_receiver,
        }
    }

    pub fn set_activity_indicator(
        &self,
        indicator: Box<dyn ActivityIndicator + Send>,
    ) -> Result<(), ManagerError> {
        lock(&self.input)?.set_activity_indicator(indicator);
        Ok(())
    }

    /// Get the user event receiver
    pub fn event_receiver(&self) -> &Receiver<UserEvent> {
        &self.event_receiver
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn registry(&self) -> Arc<Mutex<KnownRegistry>> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn filter_params(&self) -> Result<FilterParams, ManagerError> {
        Ok(lock(&self.input)?.filter_params())
    }

    /// Retune the touch filters at runtime
    pub fn set_filter_params(&self, params: FilterParams) -> Result<(), ManagerError> {
        lock(&self.input)?.set_filter_params(params);
        Ok(())
    }

    /// Connection state of a remote, if it holds a slot
    pub fn slot_state(&self, mac: &MacAddr) -> Result<Option<ConnState>, ManagerError> {
        let slots = lock(&self.slots)?;
        Ok(slots.find(mac).and_then(|w| slots.get(w)).map(|s| s.state))
    }

    /// Snapshot of every occupied slot
    pub fn state_snapshot(&self) -> Result<Vec<RemoteState>, ManagerError> {
        let slots = lock(&self.slots)?;
        Ok(slots
            .occupied()
            .map(|(which, slot)| RemoteState {
                mac: slot.mac,
                con_state: slot.state,
                pwr_state: slot.power_mode,
                input_dev_idx: which as u8,
            })
            .collect())
    }

    /// Write the registry to its configured file
    pub fn save_registry(&self) -> Result<(), ManagerError> {
        if let Some(path) = &self.config.registry.path {
            lock(&self.registry)?.save(path)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------

    /// Handle an advertising batch starting at its device count
    pub fn handle_advertising_report(&self, buf: &[u8]) -> Result<DiscoveryOutcome, ManagerError> {
        let logging = self.config.logging.discovery();
        self.discover(|registry, slots| {
            parse_advertising_reports(buf, registry, |mac| slots.is_connected(mac), logging)
        })
    }

    /// Handle an LE meta event that still carries its subevent code
    pub fn handle_le_meta_event(&self, buf: &[u8]) -> Result<DiscoveryOutcome, ManagerError> {
        let logging = self.config.logging.discovery();
        self.discover(|registry, slots| {
            parse_le_meta_event(buf, registry, |mac| slots.is_connected(mac), logging)
        })
    }

    fn discover<F>(&self, parse: F) -> Result<DiscoveryOutcome, ManagerError>
    where
        F: FnOnce(&KnownRegistry, &SlotTable) -> DiscoveryOutcome,
    {
        let now = self.clock.now();
        let outcome = {
            let registry = lock(&self.registry)?;
            let mut slots = lock(&self.slots)?;
            let mut outcome = parse(&registry, &slots);

            // A candidate holds its slot before the link is requested
            if let Some(candidate) = outcome.candidate {
                let state = if candidate.bind { ConnState::Binding } else { ConnState::Connecting };
                if let Err(e) = slots.reserve(candidate.mac, state, candidate.version, now) {
                    warn!("Not connecting to {}: {}", candidate.mac, e);
                    outcome.candidate = None;
                }
            }
            outcome
        };

        for evt in &outcome.discovered {
            info!("Discovered remote {} ({}), RSSI {}", evt.mac, evt.version, evt.rssi);
            self.emit(UserEvent::Discovered(evt.clone()));
        }

        if let Some(candidate) = outcome.candidate {
            info!(
                "Connecting to {} ({}){}",
                candidate.mac,
                candidate.version,
                if candidate.bind { " for binding" } else { "" }
            );
            if let Err(e) = self.transport.connect(&candidate.mac, candidate.version) {
                warn!("Failed to start connection to {}: {}", candidate.mac, e);
                lock(&self.slots)?.release(&candidate.mac);
            }
        }

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Link lifecycle, driven by the transport
    // ------------------------------------------------------------------

    /// A connection attempt started; claims a slot for the remote
    pub fn on_connecting(&self, mac: MacAddr, version: ProtoVersion) -> Result<usize, ManagerError> {
        let bind = lock(&self.registry)?
            .find(&mac)
            .is_some_and(|r| r.bind_mode);
        let state = if bind { ConnState::Binding } else { ConnState::Connecting };

        let which = lock(&self.slots)?.acquire(mac, state, version, self.clock.now())?;
        lock(&self.input)?.reset_time(which);

        info!("{} -> slot {} ({:?}, {})", mac, which, state, version);
        Ok(which)
    }

    /// Link encryption started
    pub fn on_encrypting(&self, mac: MacAddr) -> Result<(), ManagerError> {
        self.with_slot(&mac, |_, slot| slot.state = ConnState::Encrypting)?;
        debug!("{} encrypting", mac);
        Ok(())
    }

    /// Link is up (or encryption completed)
    pub fn on_connected(&self, mac: MacAddr) -> Result<(), ManagerError> {
        let now = self.clock.now();
        let (which, announce) = self.with_slot(&mac, |which, slot| {
            if slot.state != ConnState::Binding {
                slot.state = ConnState::Connected;
            }
            let announce = !slot.announced;
            if announce {
                slot.announced = true;
                slot.reset_stats(now);
            }
            (which, announce)
        })?;

        if announce {
            {
                let mut input = lock(&self.input)?;
                input.reset_time(which);
                input.show_activity(ActivityEvent::Connect);
            }
            info!("✓ {} connected on slot {}", mac, which);
            self.emit(UserEvent::Connected(mac));
        }
        Ok(())
    }

    /// Link is gone; reports final statistics and frees the slot
    pub fn on_disconnected(&self, mac: MacAddr) -> Result<BtStats, ManagerError> {
        let (which, mut slot) = lock(&self.slots)?
            .release(&mac)
            .ok_or(ManagerError::NotConnected(mac))?;
        slot.account_mode_time(self.clock.now());

        if slot.pending {
            info!("Connect request for {} abandoned, slot {} freed", mac, which);
            return Ok(slot.stats);
        }

        {
            let mut input = lock(&self.input)?;
            if let Err(e) = input.release_all(which) {
                warn!("Failed to lift fingers for {}: {}", mac, e);
            }
            input.show_activity(ActivityEvent::Disconnect);
        }

        info!(
            "{} disconnected from slot {} ({} packets in, {} out)",
            mac, which, slot.stats.pkts_rx, slot.stats.pkts_tx
        );
        self.emit(UserEvent::Disconnected {
            mac,
            stats: slot.stats.clone(),
        });
        Ok(slot.stats)
    }

    // ------------------------------------------------------------------
    // Inbound packets
    // ------------------------------------------------------------------

    /// Dispatch one packet received from a remote
    pub fn handle_chip_packet(
        &self,
        mac: &MacAddr,
        pkt_type: u8,
        payload: &[u8],
    ) -> Result<(), ManagerError> {
        let (which, state) = self.with_slot(mac, |which, slot| {
            slot.stats.pkts_rx += 1;
            slot.stats.bytes_rx += payload.len() as u64 + 1;
            (which, slot.state)
        })?;

        let pkt = match InboundPacket::decode(pkt_type, payload) {
            Ok(pkt) => pkt,
            Err(e) => {
                warn!("{}: {}, forwarding as is", mac, e);
                self.forward(mac, pkt_type, payload);
                return Ok(());
            }
        };

        if pkt.is_input() {
            self.with_slot(mac, |_, slot| slot.stats.input += 1)?;
        }

        match pkt {
            InboundPacket::TouchV2(touch) => {
                let mut input = lock(&self.input)?;
                input.calculate_time(which, v2_delta_us(touch.ts_delta).unwrap_or(AAH_BT_UNKNOWN_TS_DELTA));
                input.send_touch(which, 0, touch.x, touch.y, touch.down)?;
                input.frame(which)?;
            }
            InboundPacket::ButtonV2(button) if state == ConnState::Binding => {
                if button.down {
                    debug!("{} bind key {}", mac, button.id);
                    self.emit(UserEvent::BindKey {
                        mac: *mac,
                        key: button.id,
                    });
                }
            }
            InboundPacket::ButtonV2(button) => {
                let mut input = lock(&self.input)?;
                input.calculate_time(which, v2_delta_us(button.ts_delta).unwrap_or(AAH_BT_UNKNOWN_TS_DELTA));
                input.send_button(which, button.id, button.down)?;
                input.frame(which)?;
            }
            InboundPacket::Input(legacy) => {
                self.forward(mac, pkt_type, payload);
                self.handle_legacy_input(which, &legacy)?;
            }
            InboundPacket::ModeSwitch(switch) => match switch.power_mode() {
                Some(mode) => self.handle_mode_switch(mac, mode)?,
                None => {
                    warn!("{}: unknown power mode {}, forwarding as is", mac, switch.mode);
                    self.forward(mac, pkt_type, payload);
                }
            },
            InboundPacket::Accel(_) => {
                self.with_slot(mac, |_, slot| slot.stats.accel += 1)?;
                self.forward(mac, pkt_type, payload);
            }
            InboundPacket::Audio { channel, .. } => {
                self.with_slot(mac, |_, slot| slot.stats.audio[channel as usize] += 1)?;
                self.forward(mac, pkt_type, payload);
            }
            InboundPacket::Nfc(_) => {
                self.with_slot(mac, |_, slot| slot.stats.nfc_rx += 1)?;
                self.forward(mac, pkt_type, payload);
            }
            InboundPacket::Unknown { .. } => {
                debug!("{}: unknown packet type {}, forwarding", mac, pkt_type);
                self.forward(mac, pkt_type, payload);
            }
            InboundPacket::Ack { .. } | InboundPacket::NfcRfDetect(_) | InboundPacket::Pairing(_) => {
                self.forward(mac, pkt_type, payload);
            }
        }
        Ok(())
    }

    fn handle_legacy_input(&self, which: usize, legacy: &LegacyInput) -> Result<(), ManagerError> {
        let mut input = lock(&self.input)?;
        let usec = legacy
            .elapsed_ms()
            .map(|ms| ms as i64 * 1000)
            .unwrap_or(AAH_BT_UNKNOWN_TS_DELTA);
        input.calculate_time(which, usec);

        if let Some(mask) = legacy.key_mask() {
            input.send_buttons(which, mask)?;
        }
        if let Some(fingers) = legacy.fingers {
            for (finger, &(x, y)) in fingers.iter().enumerate() {
                input.send_touch(which, finger as u8, x, y, LegacyInput::finger_down((x, y)))?;
            }
        }
        input.frame(which)?;
        Ok(())
    }

    fn handle_mode_switch(&self, mac: &MacAddr, mode: PowerMode) -> Result<(), ManagerError> {
        let now = self.clock.now();
        self.with_slot(mac, |_, slot| slot.switch_mode(mode, now))?;

        lock(&self.input)?.show_activity(if mode == PowerMode::Idle {
            ActivityEvent::Asleep
        } else {
            ActivityEvent::Awake
        });

        debug!("{} switched to {:?}", mac, mode);
        self.emit(UserEvent::ModeSwitched { mac: *mac, mode });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Outbound packets and userspace control
    // ------------------------------------------------------------------

    /// Send a packet to a remote that is ready for data
    pub fn send_packet(&self, mac: &MacAddr, pkt: &OutboundPacket) -> Result<(), ManagerError> {
        let payload = pkt.encode_payload()?;
        let pkt_type = pkt.pkt_type();

        let state = self.with_slot(mac, |_, slot| slot.state)?;
        if !state.accepts_data() {
            return Err(ManagerError::NotReady { mac: *mac, state });
        }

        self.transport.send_to_chip(mac, pkt_type, &payload)?;

        self.with_slot(mac, |_, slot| {
            slot.stats.pkts_tx += 1;
            slot.stats.bytes_tx += payload.len() as u64 + 1;
            if pkt_type == ATHOME_PKT_TX_NFC {
                slot.stats.nfc_tx += 1;
            }
        })?;
        Ok(())
    }

    /// Decode and act on a raw control message from userspace
    pub fn handle_user_message(&self, buf: &[u8]) -> Result<(), ManagerError> {
        let msg = UserMessage::decode(buf)?;
        self.handle_control(msg)
    }

    /// Act on a control message from userspace
    pub fn handle_control(&self, msg: UserMessage) -> Result<(), ManagerError> {
        match msg {
            UserMessage::AddDev { mac, ltk } => {
                let mut registry = lock(&self.registry)?;
                registry.add_bound(mac, ltk);
                self.persist(&registry);
            }
            UserMessage::SetBindMode(enabled) => {
                lock(&self.registry)?.set_bind_mode(enabled);
            }
            UserMessage::DoBind(mac) => {
                let mut registry = lock(&self.registry)?;
                registry.add_binding(mac);
                self.persist(&registry);
            }
            UserMessage::StopBind(mac) => {
                let dropped = {
                    let mut registry = lock(&self.registry)?;
                    match registry.find(&mac).map(|r| r.bind_mode) {
                        Some(true) => {
                            registry.remove(&mac);
                            self.persist(&registry);
                            true
                        }
                        Some(false) => {
                            debug!("{} is already bound", mac);
                            false
                        }
                        None => return Err(ManagerError::UnknownRemote(mac)),
                    }
                };
                if dropped && self.slot_state(&mac)?.is_some() {
                    self.disconnect_remote(&mac)?;
                }
            }
            UserMessage::Encrypt(mac) => {
                let ltk = lock(&self.registry)?
                    .find(&mac)
                    .map(|r| r.ltk)
                    .ok_or(ManagerError::UnknownRemote(mac))?;
                if self.slot_state(&mac)?.is_none() {
                    return Err(ManagerError::NotConnected(mac));
                }
                self.transport.start_encryption(&mac, &ltk)?;
                self.on_encrypting(mac)?;
            }
            UserMessage::DelDev(mac) => {
                let removed = {
                    let mut registry = lock(&self.registry)?;
                    let removed = registry.remove(&mac).is_some();
                    if removed {
                        self.persist(&registry);
                    }
                    removed
                };
                let connected = self.slot_state(&mac)?.is_some();
                if connected {
                    self.disconnect_remote(&mac)?;
                }
                if !removed && !connected {
                    return Err(ManagerError::UnknownRemote(mac));
                }
            }
            UserMessage::GetState => {
                let remotes = self.state_snapshot()?;
                self.emit(UserEvent::State(remotes));
            }
            UserMessage::Data { mac, pkt_type, data } => {
                self.send_packet(&mac, &OutboundPacket::Raw { pkt_type, data })?;
            }
            UserMessage::DevStats(mac) => {
                let now = self.clock.now();
                let stats = self.with_slot(&mac, |_, slot| {
                    slot.account_mode_time(now);
                    slot.stats.clone()
                })?;
                self.emit(UserEvent::DevStats { mac, stats });
            }
        }
        Ok(())
    }

    /// Ask the transport to drop a remote; the slot goes on disconnect
    fn disconnect_remote(&self, mac: &MacAddr) -> Result<(), ManagerError> {
        self.with_slot(mac, |_, slot| slot.state = ConnState::Disconnecting)?;
        info!("Disconnecting {}", mac);
        self.transport.disconnect(mac)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn with_slot<R>(
        &self,
        mac: &MacAddr,
        f: impl FnOnce(usize, &mut ConnectionSlot) -> R,
    ) -> Result<R, ManagerError> {
        let mut slots = lock(&self.slots)?;
        let which = slots.find(mac).ok_or(ManagerError::NotConnected(*mac))?;
        let slot = slots.get_mut(which).ok_or(ManagerError::NotConnected(*mac))?;
        Ok(f(which, slot))
    }

    fn forward(&self, mac: &MacAddr, pkt_type: u8, payload: &[u8]) {
        self.emit(UserEvent::Data {
            mac: *mac,
            pkt_type,
            data: payload.to_vec(),
        });
    }

    fn persist(&self, registry: &KnownRegistry) {
        if let Some(path) = &self.config.registry.path {
            if let Err(e) = registry.save(path) {
                warn!("Failed to save registry: {}", e);
            }
        }
    }

    /// Queue an event for userspace; dropped with a warning when it cannot go out
    fn emit(&self, event: UserEvent) {
        if let Err(e) = event.encode() {
            warn!("Dropping user event 0x{:02x}: {}", event.tag(), e);
            return;
        }
        match self.event_sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("User queue full, dropping event 0x{:02x}", event.tag());
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("User queue closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockInputBackend, MockTransport};
    use crate::input::ManualClock;
    use std::time::Duration;

    const REMOTE: MacAddr = MacAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0xC6]);

    fn manager() -> (AthomeManager<MockInputBackend, MockTransport>, MockInputBackend, MockTransport, Arc<ManualClock>) {
        let input = MockInputBackend::new();
        let transport = MockTransport::new();
        let clock = Arc::new(ManualClock::new(Duration::from_secs(1_000)));
        let manager = AthomeManager::with_clock(
            Config::default(),
            input.clone(),
            transport.clone(),
            clock.clone(),
        );
        (manager, input, transport, clock)
    }

    fn drain(manager: &AthomeManager<MockInputBackend, MockTransport>) -> Vec<UserEvent> {
        manager.event_receiver().try_iter().collect()
    }

    #[test]
    fn test_connect_lifecycle() {
        let (m, _, _, clock) = manager();
        m.handle_control(UserMessage::AddDev { mac: REMOTE, ltk: [3; AAH_BT_LTK_SZ] }).unwrap();

        let which = m.on_connecting(REMOTE, ProtoVersion(0x0001_0101)).unwrap();
        assert_eq!(m.slot_state(&REMOTE).unwrap(), Some(ConnState::Connecting));
        m.on_connected(REMOTE).unwrap();
        assert_eq!(m.slot_state(&REMOTE).unwrap(), Some(ConnState::Connected));
        assert_eq!(drain(&m), vec![UserEvent::Connected(REMOTE)]);

        clock.advance(Duration::from_secs(3));
        let stats = m.on_disconnected(REMOTE).unwrap();
        assert_eq!(stats.mode_times[PowerMode::Idle.index()], 3_000_000_000);
        assert_eq!(m.slot_state(&REMOTE).unwrap(), None);
        assert!(matches!(drain(&m).as_slice(), [UserEvent::Disconnected { mac, .. }] if *mac == REMOTE));

        // slot is free again
        assert_eq!(m.on_connecting(REMOTE, ProtoVersion(0x0001_0101)).unwrap(), which);
    }

    #[test]
    fn test_double_connect_rejected() {
        let (m, _, _, _) = manager();
        m.on_connecting(REMOTE, ProtoVersion(0x0001_0000)).unwrap();
        assert!(matches!(
            m.on_connecting(REMOTE, ProtoVersion(0x0001_0000)),
            Err(ManagerError::AlreadyConnected(..))
        ));
    }

    #[test]
    fn test_packet_from_unknown_link() {
        let (m, _, _, _) = manager();
        assert!(matches!(
            m.handle_chip_packet(&REMOTE, ATHOME_PKT_RX_ACCEL, &[0; 6]),
            Err(ManagerError::NotConnected(_))
        ));
    }

    #[test]
    fn test_binding_button_becomes_bind_key() {
        let (m, input, _, _) = manager();
        m.handle_control(UserMessage::DoBind(REMOTE)).unwrap();
        m.on_connecting(REMOTE, ProtoVersion(0x0001_0101)).unwrap();
        m.on_connected(REMOTE).unwrap();
        assert_eq!(m.slot_state(&REMOTE).unwrap(), Some(ConnState::Binding));
        drain(&m);

        m.handle_chip_packet(&REMOTE, ATHOME_PKT_RX_BTN_V2, &[0x10, 0x00, 0x83]).unwrap();
        m.handle_chip_packet(&REMOTE, ATHOME_PKT_RX_BTN_V2, &[0x10, 0x00, 0x03]).unwrap();

        assert_eq!(drain(&m), vec![UserEvent::BindKey { mac: REMOTE, key: 3 }]);
        assert!(input.events().is_empty());
    }

    #[test]
    fn test_mode_switch() {
        let (m, _, _, clock) = manager();
        m.on_connecting(REMOTE, ProtoVersion(0x0001_0101)).unwrap();
        m.on_connected(REMOTE).unwrap();
        drain(&m);

        clock.advance(Duration::from_millis(250));
        m.handle_chip_packet(&REMOTE, ATHOME_PKT_RX_MODESWITCH, &[0xE8, 0x0B, 2]).unwrap();
        assert_eq!(
            drain(&m),
            vec![UserEvent::ModeSwitched { mac: REMOTE, mode: PowerMode::Active }]
        );
        assert_eq!(m.state_snapshot().unwrap()[0].pwr_state, PowerMode::Active);

        clock.advance(Duration::from_millis(100));
        m.handle_control(UserMessage::DevStats(REMOTE)).unwrap();
        let events = drain(&m);
        let UserEvent::DevStats { stats, .. } = &events[0] else {
            panic!("expected stats");
        };
        assert_eq!(stats.mode_times[PowerMode::Idle.index()], 250_000_000);
        assert_eq!(stats.mode_times[PowerMode::Active.index()], 100_000_000);
        assert_eq!(stats.pkts_rx, 1);
        assert_eq!(stats.bytes_rx, 4);
    }

    #[test]
    fn test_data_requires_ready_link() {
        let (m, _, transport, _) = manager();
        m.on_connecting(REMOTE, ProtoVersion(0x0001_0101)).unwrap();

        let msg = UserMessage::Data {
            mac: REMOTE,
            pkt_type: ATHOME_PKT_TX_IR,
            data: vec![1, 2, 3],
        };
        assert!(matches!(
            m.handle_control(msg.clone()),
            Err(ManagerError::NotReady { state: ConnState::Connecting, .. })
        ));

        m.on_connected(REMOTE).unwrap();
        m.handle_control(msg).unwrap();
        assert_eq!(transport.sent(), vec![(REMOTE, ATHOME_PKT_TX_IR, vec![1, 2, 3])]);
    }

    #[test]
    fn test_full_user_queue_drops() {
        let input = MockInputBackend::new();
        let mut config = Config::default();
        config.queue.user_queue_capacity = 1;
        let m = AthomeManager::new(config, input, MockTransport::new());

        m.handle_control(UserMessage::GetState).unwrap();
        m.handle_control(UserMessage::GetState).unwrap();
        assert_eq!(drain(&m).len(), 1);
    }

    #[test]
    fn test_zero_queue_capacity_still_delivers() {
        let mut config = Config::default();
        config.queue.user_queue_capacity = 0;
        let m = AthomeManager::new(config, MockInputBackend::new(), MockTransport::new());

        m.handle_control(UserMessage::GetState).unwrap();
        assert_eq!(drain(&m), vec![UserEvent::State(vec![])]);
    }

    fn adv(mac: MacAddr) -> Vec<u8> {
        let mut data = vec![0x02, ADV_DATA_FLAGS, ATHOME_ADV_FLAGS, 11, ADV_DATA_MANUF_SPECIFIC];
        data.extend_from_slice(&ATHOME_BT_IDENT);
        data.extend_from_slice(&PROTO_VERSION_V2_INPUT_EVTS.to_be_bytes());

        let mut out = vec![1, 0x00, 0x01];
        out.extend_from_slice(mac.as_bytes());
        out.push(data.len() as u8);
        out.extend(data);
        out.push(0xC4);
        out
    }

    #[test]
    fn test_failed_connect_frees_reservation() {
        let (m, _, transport, _) = manager();
        m.handle_control(UserMessage::AddDev { mac: REMOTE, ltk: [0; AAH_BT_LTK_SZ] }).unwrap();

        transport.set_failing(true);
        assert!(m.handle_advertising_report(&adv(REMOTE)).unwrap().try_connect());
        assert_eq!(m.slot_state(&REMOTE).unwrap(), None);

        transport.set_failing(false);
        assert!(m.handle_advertising_report(&adv(REMOTE)).unwrap().try_connect());
        assert_eq!(m.slot_state(&REMOTE).unwrap(), Some(ConnState::Connecting));
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn test_abandoned_reservation_is_silent() {
        let (m, _, _, _) = manager();
        m.handle_control(UserMessage::AddDev { mac: REMOTE, ltk: [0; AAH_BT_LTK_SZ] }).unwrap();
        m.handle_advertising_report(&adv(REMOTE)).unwrap();

        m.on_disconnected(REMOTE).unwrap();
        assert_eq!(m.slot_state(&REMOTE).unwrap(), None);
        assert!(drain(&m).is_empty());
    }
}
