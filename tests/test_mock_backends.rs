//! Integration tests for mock backends

use athome_rs::athome::{MacAddr, ProtoVersion};
use athome_rs::backend::{
    AbsAxis, ActivityEvent, ActivityIndicator, ChipTransport, InputBackend, InputEvent, Key,
    MockActivityIndicator, MockInputBackend, MockTransport, TransportCall,
};

#[test]
fn test_mock_input_backend() {
    let backend = MockInputBackend::new();

    // All operations should succeed and be recorded per device
    assert!(backend.mt_slot(0, 1, true).is_ok());
    assert!(backend.report_abs(0, AbsAxis::MtPositionX, 300).is_ok());
    assert!(backend.report_abs(0, AbsAxis::MtPositionY, 400).is_ok());
    assert!(backend.report_key(2, 4, Key::DpadCenter, true).is_ok());
    assert!(backend.sync(0).is_ok());

    assert_eq!(backend.events_for(0).len(), 4);
    assert_eq!(
        backend.events_for(2),
        vec![InputEvent::Key { scan: 4, key: Key::DpadCenter, down: true }]
    );
    assert_eq!(backend.last_position(0), Some((300, 400)));
}

#[test]
fn test_mock_transport() {
    let transport = MockTransport::new();
    let mac = MacAddr([1, 2, 3, 4, 5, 0xC0]);

    assert!(transport.connect(&mac, ProtoVersion(0x0001_0101)).is_ok());
    assert!(transport.send_to_chip(&mac, 5, &[0xDE, 0xAD]).is_ok());
    assert!(transport.disconnect(&mac).is_ok());

    assert_eq!(transport.calls().len(), 3);
    assert_eq!(transport.sent(), vec![(mac, 5, vec![0xDE, 0xAD])]);

    // Failing mode rejects and does not record
    transport.set_failing(true);
    assert!(transport.start_encryption(&mac, &[0; 16]).is_err());
    assert_eq!(transport.calls().last(), Some(&TransportCall::Disconnect(mac)));
}

#[test]
fn test_mock_backends_are_clone() {
    let in1 = MockInputBackend::new();
    let in2 = in1.clone();

    let tx1 = MockTransport::new();
    let tx2 = tx1.clone();

    let led1 = MockActivityIndicator::new();
    let led2 = led1.clone();

    // Clones share one record
    assert!(in2.sync(3).is_ok());
    assert_eq!(in1.events(), vec![(3, InputEvent::Sync)]);

    assert!(tx2.disconnect(&MacAddr([9; 6])).is_ok());
    assert_eq!(tx1.calls().len(), 1);

    led2.show(ActivityEvent::Asleep);
    assert_eq!(led1.shown(), vec![ActivityEvent::Asleep]);
}
