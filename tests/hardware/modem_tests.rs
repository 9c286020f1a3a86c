//! Tests against a modem on a real serial port.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyUSB0   # or COM3 on Windows
//! export TEST_BAUD=9600           # optional, default: 9600
//! cargo test -- --ignored
//! ```
//!
//! The modem must be on-hook and in command mode with result codes enabled.

use ringin::modem::{ModemEvent, ResponseClassifier};
use ringin::{open_modem, CarrierDetect, PortConfiguration};
use std::env;
use std::time::Duration;

/// Get the test port from environment variable.
fn get_test_port() -> Option<String> {
    env::var("TEST_PORT").ok()
}

/// Get the test baud rate from environment variable (default: 9600).
fn get_test_baud() -> u32 {
    env::var("TEST_BAUD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9600)
}

/// Skip test if hardware is not available.
fn skip_without_hardware() -> Option<String> {
    let port = get_test_port();
    if port.is_none() {
        println!("Skipping hardware test: TEST_PORT not set");
    }
    port
}

fn line_settings() -> PortConfiguration {
    PortConfiguration {
        baud_rate: get_test_baud(),
        ..PortConfiguration::default()
    }
}

#[tokio::test]
#[ignore]
async fn test_modem_answers_at_with_ok() {
    let Some(port_name) = skip_without_hardware() else {
        return;
    };

    let mut session = open_modem(&port_name, &line_settings()).expect("open modem");
    let mut classifier = ResponseClassifier::new();
    session.send_command("AT", "\r").await.unwrap();
    classifier.remember("AT");

    let acknowledged = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let line = session.next_line().await.unwrap();
            println!("modem: {line}");
            if classifier.classify(&line) == ModemEvent::Ok {
                break;
            }
        }
    })
    .await;
    assert!(acknowledged.is_ok(), "modem never replied OK to AT");
}

#[tokio::test]
#[ignore]
async fn test_carrier_detect_readable_while_idle() {
    let Some(port_name) = skip_without_hardware() else {
        return;
    };

    let session = open_modem(&port_name, &line_settings()).expect("open modem");
    let present = session
        .carrier()
        .carrier_detect()
        .await
        .expect("query DCD");
    // an idle, on-hook modem normally holds DCD low unless AT&C0 is set
    println!("DCD while idle: {present}");
}
