//! Test to verify mock backends log output correctly

use athome_rs::athome::{MacAddr, ProtoVersion};
use athome_rs::backend::{
    ActivityEvent, ActivityIndicator, ChipTransport, InputBackend, Key, MockActivityIndicator,
    MockInputBackend, MockTransport,
};

#[test]
fn test_mock_input_logs() {
    // Initialize a simple logger for testing
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();

    let backend = MockInputBackend::new();

    // These should log at info level (visible with RUST_LOG=info)
    assert!(backend.report_key(0, 0, Key::Back, true).is_ok());
    assert!(backend.report_time(0, 12, 345).is_ok());
    assert!(backend.sync(0).is_ok());
}

#[test]
fn test_mock_transport_logs() {
    // Initialize a simple logger for testing
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();

    let transport = MockTransport::new();
    let mac = MacAddr([0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0xCF]);

    // These should log at info level (visible with RUST_LOG=info)
    assert!(transport.connect(&mac, ProtoVersion(0x0001_0000)).is_ok());
    assert!(transport.send_to_chip(&mac, 6, &[1, 2, 3]).is_ok());
    assert!(transport.disconnect(&mac).is_ok());
}

#[test]
fn test_mock_led_logs() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Info)
        .try_init();

    let led = MockActivityIndicator::new();
    led.show(ActivityEvent::Connect);
    led.show(ActivityEvent::TouchDown);
    assert_eq!(led.shown().len(), 2);
}
