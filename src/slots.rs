//! Connection slot table
//!
//! A fixed pool of [`ATHOME_RMT_MAX_CONNS`] slots, one per connected remote.
//! The slot index doubles as the index of the remote's input device.

use crate::athome::constants::ATHOME_RMT_MAX_CONNS;
use crate::athome::types::{BtStats, ConnState, MacAddr, PowerMode, ProtoVersion};
use crate::manager::ManagerError;
use std::time::Duration;

/// Link and accounting state of one connected remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSlot {
    pub mac: MacAddr,
    pub state: ConnState,
    pub power_mode: PowerMode,
    pub version: ProtoVersion,
    pub stats: BtStats,
    /// When the current power mode was entered
    pub mode_since: Duration,
    /// CONNECTED has been sent for this link
    pub announced: bool,
    /// Held for a connect request the transport has not reported on yet
    pub pending: bool,
}

impl ConnectionSlot {
    fn new(mac: MacAddr, state: ConnState, version: ProtoVersion, now: Duration) -> Self {
        Self {
            mac,
            state,
            power_mode: PowerMode::default(),
            version,
            stats: BtStats::default(),
            mode_since: now,
            announced: false,
            pending: false,
        }
    }

    /// Fold the time spent in the current mode into the statistics
    pub fn account_mode_time(&mut self, now: Duration) {
        let spent = now.saturating_sub(self.mode_since);
        self.stats.mode_times[self.power_mode.index()] += spent.as_nanos() as u64;
        self.mode_since = now;
    }

    pub fn switch_mode(&mut self, mode: PowerMode, now: Duration) {
        self.account_mode_time(now);
        self.power_mode = mode;
    }

    /// Start a fresh accounting period
    pub fn reset_stats(&mut self, now: Duration) {
        self.stats = BtStats::default();
        self.mode_since = now;
    }
}

#[derive(Debug, Clone)]
pub struct SlotTable {
    slots: [Option<ConnectionSlot>; ATHOME_RMT_MAX_CONNS],
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Slot index held by a remote
    pub fn find(&self, mac: &MacAddr) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.mac == *mac))
    }

    pub fn is_connected(&self, mac: &MacAddr) -> bool {
        self.find(mac).is_some()
    }

    fn find_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_none())
    }

    /// Give a remote a slot; a remote never holds more than one.
    /// A slot reserved for the remote by [`SlotTable::reserve`] is taken over.
    pub fn acquire(
        &mut self,
        mac: MacAddr,
        state: ConnState,
        version: ProtoVersion,
        now: Duration,
    ) -> Result<usize, ManagerError> {
        if let Some(which) = self.find(&mac) {
            return match self.slots[which].as_mut() {
                Some(slot) if slot.pending => {
                    *slot = ConnectionSlot::new(mac, state, version, now);
                    Ok(which)
                }
                _ => Err(ManagerError::AlreadyConnected(mac, which)),
            };
        }
        let which = self
            .find_empty_slot()
            .ok_or(ManagerError::PoolExhausted(ATHOME_RMT_MAX_CONNS))?;
        self.slots[which] = Some(ConnectionSlot::new(mac, state, version, now));
        Ok(which)
    }

    /// Hold a slot for a remote we are about to ask the transport to connect
    pub fn reserve(
        &mut self,
        mac: MacAddr,
        state: ConnState,
        version: ProtoVersion,
        now: Duration,
    ) -> Result<usize, ManagerError> {
        if let Some(which) = self.find(&mac) {
            return Err(ManagerError::AlreadyConnected(mac, which));
        }
        let which = self.acquire(mac, state, version, now)?;
        if let Some(slot) = self.slots[which].as_mut() {
            slot.pending = true;
        }
        Ok(which)
    }

    /// Free a remote's slot, handing back what it held
    pub fn release(&mut self, mac: &MacAddr) -> Option<(usize, ConnectionSlot)> {
        let which = self.find(mac)?;
        self.slots[which].take().map(|slot| (which, slot))
    }

    pub fn get(&self, which: usize) -> Option<&ConnectionSlot> {
        self.slots.get(which)?.as_ref()
    }

    pub fn get_mut(&mut self, which: usize) -> Option<&mut ConnectionSlot> {
        self.slots.get_mut(which)?.as_mut()
    }

    /// Occupied slots with their indices
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &ConnectionSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    pub fn len(&self) -> usize {
        self.occupied().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(n: u8) -> MacAddr {
        MacAddr([n, 0, 0, 0, 0, 0xC0])
    }

    const V: ProtoVersion = ProtoVersion(0x0001_0101);

    #[test]
    fn test_acquire_and_release() {
        let mut table = SlotTable::new();
        assert!(table.is_empty());

        let a = table.acquire(mac(1), ConnState::Connecting, V, Duration::ZERO).unwrap();
        let b = table.acquire(mac(2), ConnState::Binding, V, Duration::ZERO).unwrap();
        assert_ne!(a, b);
        assert!(table.is_connected(&mac(1)));
        assert_eq!(table.get(b).unwrap().state, ConnState::Binding);

        let (which, slot) = table.release(&mac(1)).unwrap();
        assert_eq!(which, a);
        assert_eq!(slot.mac, mac(1));
        assert!(!table.is_connected(&mac(1)));
        assert_eq!(table.len(), 1);

        // freed slot is reused
        assert_eq!(table.acquire(mac(3), ConnState::Connecting, V, Duration::ZERO).unwrap(), a);
    }

    #[test]
    fn test_one_slot_per_mac() {
        let mut table = SlotTable::new();
        let which = table.acquire(mac(1), ConnState::Connecting, V, Duration::ZERO).unwrap();
        let err = table
            .acquire(mac(1), ConnState::Connecting, V, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, ManagerError::AlreadyConnected(m, w) if m == mac(1) && w == which));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_pool_exhausted() {
        let mut table = SlotTable::new();
        for n in 0..ATHOME_RMT_MAX_CONNS as u8 {
            table.acquire(mac(n), ConnState::Connecting, V, Duration::ZERO).unwrap();
        }
        let err = table
            .acquire(mac(99), ConnState::Connecting, V, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, ManagerError::PoolExhausted(_)));
    }

    #[test]
    fn test_reservation_is_adopted() {
        let mut table = SlotTable::new();
        let which = table
            .reserve(mac(1), ConnState::Connecting, V, Duration::ZERO)
            .unwrap();
        assert!(table.is_connected(&mac(1)));
        assert!(table.get(which).unwrap().pending);

        // a second reservation for the same remote is refused
        assert!(matches!(
            table.reserve(mac(1), ConnState::Connecting, V, Duration::ZERO),
            Err(ManagerError::AlreadyConnected(..))
        ));

        let adopted = table
            .acquire(mac(1), ConnState::Binding, V, Duration::from_secs(1))
            .unwrap();
        assert_eq!(adopted, which);
        let slot = table.get(which).unwrap();
        assert!(!slot.pending);
        assert_eq!(slot.state, ConnState::Binding);

        // once adopted the slot is a real link
        assert!(matches!(
            table.acquire(mac(1), ConnState::Connecting, V, Duration::ZERO),
            Err(ManagerError::AlreadyConnected(..))
        ));
    }

    #[test]
    fn test_reserve_with_full_pool() {
        let mut table = SlotTable::new();
        for n in 0..ATHOME_RMT_MAX_CONNS as u8 {
            table.acquire(mac(n), ConnState::Connected, V, Duration::ZERO).unwrap();
        }
        assert!(matches!(
            table.reserve(mac(99), ConnState::Connecting, V, Duration::ZERO),
            Err(ManagerError::PoolExhausted(_))
        ));
    }

    #[test]
    fn test_mode_time_accounting() {
        let mut table = SlotTable::new();
        let which = table
            .acquire(mac(1), ConnState::Connected, V, Duration::from_secs(10))
            .unwrap();
        let slot = table.get_mut(which).unwrap();

        slot.switch_mode(PowerMode::Active, Duration::from_secs(12));
        slot.account_mode_time(Duration::from_millis(12_500));

        assert_eq!(slot.stats.mode_times[PowerMode::Idle.index()], 2_000_000_000);
        assert_eq!(slot.stats.mode_times[PowerMode::Active.index()], 500_000_000);

        slot.reset_stats(Duration::from_secs(20));
        assert_eq!(slot.stats, BtStats::default());
    }
}
