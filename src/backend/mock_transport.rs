//! Mock radio transport for testing.
//!
//! Logs every request instead of touching a radio and records it for
//! inspection. Can be switched into a failing mode to exercise error paths.

use super::transport::{ChipTransport, TransportError};
use crate::athome::constants::AAH_BT_LTK_SZ;
use crate::athome::types::{MacAddr, ProtoVersion};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded transport request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Send { mac: MacAddr, pkt_type: u8, data: Vec<u8> },
    Connect { mac: MacAddr, version: ProtoVersion },
    Disconnect(MacAddr),
    Encrypt { mac: MacAddr, ltk: [u8; AAH_BT_LTK_SZ] },
}

#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    calls: Arc<Mutex<Vec<TransportCall>>>,
    failing: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following request fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Packets sent so far as (mac, type, payload)
    pub fn sent(&self) -> Vec<(MacAddr, u8, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Send { mac, pkt_type, data } => Some((mac, pkt_type, data)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: TransportCall) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Operation("mock transport failure".into()));
        }
        self.calls
            .lock()
            .map_err(|e| TransportError::Operation(e.to_string()))?
            .push(call);
        Ok(())
    }
}

impl ChipTransport for MockTransport {
    fn send_to_chip(&self, mac: &MacAddr, pkt_type: u8, data: &[u8]) -> Result<(), TransportError> {
        info!("[MOCK RADIO] -> {} type {} ({} bytes)", mac, pkt_type, data.len());
        self.record(TransportCall::Send {
            mac: *mac,
            pkt_type,
            data: data.to_vec(),
        })
    }

    fn connect(&self, mac: &MacAddr, version: ProtoVersion) -> Result<(), TransportError> {
        info!("[MOCK RADIO] Connect {} ({})", mac, version);
        self.record(TransportCall::Connect {
            mac: *mac,
            version,
        })
    }

    fn disconnect(&self, mac: &MacAddr) -> Result<(), TransportError> {
        info!("[MOCK RADIO] Disconnect {}", mac);
        self.record(TransportCall::Disconnect(*mac))
    }

    fn start_encryption(&self, mac: &MacAddr, ltk: &[u8; AAH_BT_LTK_SZ]) -> Result<(), TransportError> {
        info!("[MOCK RADIO] Encrypt {}", mac);
        self.record(TransportCall::Encrypt { mac: *mac, ltk: *ltk })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_transport_records_and_fails() {
        let transport = MockTransport::new();
        let mac = MacAddr([1, 2, 3, 4, 5, 6]);

        assert!(transport.send_to_chip(&mac, 6, &[1, 2]).is_ok());
        assert!(transport.disconnect(&mac).is_ok());
        assert_eq!(transport.sent(), vec![(mac, 6, vec![1, 2])]);
        assert_eq!(transport.calls().len(), 2);

        transport.set_failing(true);
        assert!(transport.connect(&mac, ProtoVersion(0x0001_0000)).is_err());
        assert_eq!(transport.calls().len(), 2);
    }
}
