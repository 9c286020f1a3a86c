//! Repeated calls: the loop always comes back ready for the next RING.

use crate::common::{fast_modem, shell, Harness, STEP};
use pretty_assertions::assert_eq;
use ringin::{Controller, MockModem, PortError, ProgramSpec, StatsSnapshot};
use tracing::Span;

const CALLS: u64 = 5;

#[tokio::test]
async fn test_sequential_calls_leave_nothing_behind() {
    let mut harness = Harness::start(shell("read l; echo \"reply:$l\"")).await;

    for n in 0..CALLS {
        harness.connect().await;
        harness
            .wait_for("call to start", |s| s.active_calls == 1)
            .await;
        let payload = format!("call-{n}\n");
        harness.modem.send_raw(payload.as_bytes()).await.unwrap();
        harness
            .modem
            .expect(format!("reply:call-{n}").as_bytes(), STEP)
            .await
            .unwrap();
        harness.acknowledge_reset().await;
    }

    let snap = harness
        .wait_for("all resets", |s| s.resets == CALLS)
        .await;
    assert_eq!(
        snap,
        StatsSnapshot {
            rings: CALLS,
            answers: CALLS,
            calls: CALLS,
            failed_spawns: 0,
            carrier_losses: 0,
            forced_kills: 0,
            resets: CALLS,
            active_calls: 0,
        }
    );

    harness.finish().await;
}

#[tokio::test]
async fn test_mixed_outcomes_each_reset_once() {
    let mut harness = Harness::start(shell("while read l; do echo \"$l\"; done")).await;

    // carrier lost mid-call
    harness.connect().await;
    harness
        .wait_for("first call", |s| s.active_calls == 1)
        .await;
    harness.modem.send_line("NO CARRIER").await.unwrap();
    harness.acknowledge_reset().await;

    // DCD drop
    harness.connect().await;
    harness
        .wait_for("second call", |s| s.active_calls == 1)
        .await;
    harness.modem.carrier().set_present(false);
    harness.acknowledge_reset().await;
    harness.modem.carrier().set_present(true);

    // a normal call where the modem never acknowledges the escape
    harness.connect().await;
    harness
        .wait_for("third call", |s| s.active_calls == 1)
        .await;
    harness.modem.send_raw(b"ping\n").await.unwrap();
    harness.modem.expect(b"ping", STEP).await.unwrap();
    harness.modem.carrier().set_present(false);
    harness.modem.expect(b"+++", STEP).await.unwrap();
    harness.modem.expect(b"ATH0\r", STEP).await.unwrap();

    let snap = harness.wait_for("three resets", |s| s.resets == 3).await;
    assert_eq!(snap.calls, 3);
    assert_eq!(snap.carrier_losses, 3);
    assert_eq!(snap.active_calls, 0);
    assert_eq!(harness.modem.count(b"+++"), 3);
    assert_eq!(harness.modem.count(b"ATH0"), 3);

    harness.finish().await;
}

#[tokio::test]
async fn test_spawn_failure_hangs_up_and_keeps_answering() {
    let missing = ProgramSpec::new("/nonexistent/ringin-test-program", Vec::<String>::new());
    let mut harness = Harness::start(missing).await;

    harness.connect().await;
    harness.acknowledge_reset().await;
    let snap = harness.wait_for("reset", |s| s.resets == 1).await;
    assert_eq!(snap.failed_spawns, 1);
    assert_eq!(snap.calls, 0);
    assert_eq!(snap.active_calls, 0);

    harness.connect().await;
    harness.acknowledge_reset().await;
    let snap = harness.wait_for("second reset", |s| s.resets == 2).await;
    assert_eq!(snap.failed_spawns, 2);
    assert_eq!(snap.answers, 2);

    harness.finish().await;
}

#[tokio::test]
async fn test_write_failure_stops_controller() {
    let (session, modem) = MockModem::pair("MOCK0");
    let controller = Controller::new(session, fast_modem(), shell("true"), Span::none());
    let stats = controller.stats();

    drop(modem);
    let result = tokio::time::timeout(STEP, controller.run())
        .await
        .expect("controller kept running without a line");
    assert!(matches!(result, Err(PortError::Io(_))), "got {result:?}");

    assert_eq!(stats.snapshot(), StatsSnapshot::default());
}
