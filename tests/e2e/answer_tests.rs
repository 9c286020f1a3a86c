//! RING handling and the answer command.

use crate::common::{shell, Harness, STEP};
use pretty_assertions::assert_eq;
use ringin::StatsSnapshot;
use std::time::Duration;

#[tokio::test]
async fn test_ring_answers_exactly_once_without_call() {
    let mut harness = Harness::start(shell("echo should-not-run")).await;

    harness.modem.send_line("RING").await.unwrap();
    harness.modem.expect(b"ATA\r", STEP).await.unwrap();
    harness
        .modem
        .drain_for(Duration::from_millis(100))
        .await
        .unwrap();

    assert_eq!(harness.modem.count(b"ATA"), 1);
    assert_eq!(
        harness.stats.snapshot(),
        StatsSnapshot {
            rings: 1,
            answers: 1,
            ..StatsSnapshot::default()
        }
    );

    let modem = harness.finish().await;
    assert_eq!(modem.count(b"should-not-run"), 0);
}

#[tokio::test]
async fn test_init_commands_written_in_order_with_flush() {
    let config = ringin::ModemConfig {
        init_commands: vec!["ATZ".into(), "ATE0".into(), "ATS0=0".into()],
        ..crate::common::fast_modem()
    };
    let mut harness = Harness::start_with(config, shell("true")).await;

    harness
        .modem
        .expect(b"ATE0\rATS0=0\r\r", STEP)
        .await
        .unwrap();

    harness.finish().await;
}

#[tokio::test]
async fn test_error_reply_to_init_is_not_fatal() {
    let mut harness = Harness::start(shell("true")).await;

    harness.modem.send_line("ERROR").await.unwrap();
    harness.modem.send_line("RING").await.unwrap();
    harness.modem.expect(b"ATA\r", STEP).await.unwrap();

    harness.finish().await;
}

#[tokio::test]
async fn test_echoed_commands_do_not_trigger_anything() {
    let mut harness = Harness::start(shell("true")).await;

    // a modem with echo on repeats the commands back before its result code
    harness.modem.send_line("ATZ").await.unwrap();
    harness.modem.send_line("OK").await.unwrap();
    harness.modem.send_line("RING").await.unwrap();
    harness.modem.expect(b"ATA\r", STEP).await.unwrap();
    harness.modem.send_line("ATA").await.unwrap();
    harness
        .modem
        .drain_for(Duration::from_millis(50))
        .await
        .unwrap();

    let snap = harness.stats.snapshot();
    assert_eq!(snap.answers, 1);
    assert_eq!(snap.calls, 0);

    harness.finish().await;
}

#[tokio::test]
async fn test_no_carrier_before_connect_is_not_a_call() {
    let mut harness = Harness::start(shell("true")).await;

    harness.modem.send_line("RING").await.unwrap();
    harness.modem.expect(b"ATA\r", STEP).await.unwrap();
    harness.modem.send_line("NO CARRIER").await.unwrap();
    harness
        .modem
        .drain_for(Duration::from_millis(50))
        .await
        .unwrap();

    let snap = harness.stats.snapshot();
    assert_eq!(snap.calls, 0);
    assert_eq!(snap.resets, 0);
    assert_eq!(harness.modem.count(b"+++"), 0);

    harness.finish().await;
}
