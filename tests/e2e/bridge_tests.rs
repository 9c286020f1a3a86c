//! Data flow through a connected call.

use crate::common::{shell, Harness, STEP};

#[tokio::test]
async fn test_echo_program_round_trip_until_line_closes() {
    let mut harness = Harness::start(shell(r#"while read l; do echo "got:$l"; done"#)).await;
    harness.connect().await;
    harness
        .wait_for("call to start", |s| s.active_calls == 1)
        .await;

    harness.modem.send_raw(b"hello\n").await.unwrap();
    harness.modem.expect(b"got:hello", STEP).await.unwrap();
    harness.modem.send_raw(b"second line\n").await.unwrap();
    harness.modem.expect(b"got:second line", STEP).await.unwrap();

    // closing the line ends the call, resets the modem, then stops the loop
    let mut modem = harness.finish().await;
    modem.expect(b"+++", STEP).await.unwrap();
    modem.expect(b"ATH0\r", STEP).await.unwrap();
}

#[tokio::test]
async fn test_program_sees_modem_marker_and_configured_env() {
    let mut program = shell(r#"echo "modem=$MODEM greeting=$GREETING""#);
    program
        .env
        .insert("GREETING".to_string(), "hello".to_string());
    let mut harness = Harness::start(program).await;

    harness.connect().await;
    harness
        .modem
        .expect(b"modem=dumb greeting=hello", STEP)
        .await
        .unwrap();
    harness.acknowledge_reset().await;

    harness.finish().await;
}

#[tokio::test]
async fn test_output_written_just_before_exit_is_delivered() {
    let mut harness = Harness::start(shell("printf 'line one\\nline two\\n'; exit 3")).await;

    harness.connect().await;
    harness.modem.expect(b"line one\nline two\n", STEP).await.unwrap();
    harness.acknowledge_reset().await;

    let snap = harness.stats.snapshot();
    assert_eq!(snap.calls, 1);
    assert_eq!(snap.forced_kills, 0);

    harness.finish().await;
}

#[tokio::test]
async fn test_data_buffered_with_connect_reaches_program() {
    let mut harness = Harness::start(shell("read l; echo \"first:$l\"")).await;

    harness.modem.send_line("RING").await.unwrap();
    harness.modem.expect(b"ATA\r", STEP).await.unwrap();
    // caller data arrives in the same write as the result code
    harness
        .modem
        .send_raw(b"\r\nCONNECT 2400\r\nearly bird\n")
        .await
        .unwrap();

    harness.modem.expect(b"first:early bird", STEP).await.unwrap();
    harness.acknowledge_reset().await;

    harness.finish().await;
}

#[tokio::test]
async fn test_program_ignoring_input_does_not_stall_call() {
    let mut harness = Harness::start(shell("exec 0<&-; sleep 0.2; echo done")).await;

    harness.connect().await;
    harness
        .wait_for("call to start", |s| s.active_calls == 1)
        .await;
    harness.modem.send_raw(b"ignored input\n").await.unwrap();
    harness.modem.expect(b"done", STEP).await.unwrap();
    harness.acknowledge_reset().await;

    assert_eq!(harness.stats.snapshot().active_calls, 0);
    harness.finish().await;
}

#[tokio::test]
async fn test_lf_after_cr_terminated_connect_is_not_call_data() {
    let mut harness = Harness::start(shell("read l; echo \"first:[$l]\"")).await;

    harness.modem.send_line("RING").await.unwrap();
    harness.modem.expect(b"ATA\r", STEP).await.unwrap();
    harness.modem.send_raw(b"\r\nCONNECT 2400\r").await.unwrap();
    harness
        .wait_for("call to start", |s| s.active_calls == 1)
        .await;
    harness.modem.send_raw(b"\nhello\n").await.unwrap();

    harness.modem.expect(b"first:[hello]", STEP).await.unwrap();
    harness.acknowledge_reset().await;

    harness.finish().await;
}
