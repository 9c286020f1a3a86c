//! Shared test utilities for ringin integration tests.
//!
//! This module provides common test infrastructure including:
//! - Modem timings shrunk to milliseconds
//! - A controller running against the in-memory modem
//! - Polling helpers for the controller's counters

#![allow(dead_code)]

use ringin::{
    Controller, ControllerStats, MockModem, ModemConfig, ModemHandle, PortError, ProgramSpec,
    StatsSnapshot,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Span;

/// Generous bound for anything the controller should do "promptly".
pub const STEP: Duration = Duration::from_secs(3);

/// DCD poll interval used by [`fast_modem`].
pub const POLL: Duration = Duration::from_millis(20);

/// Modem settings with every delay cut down so a full call runs in well
/// under a second.
pub fn fast_modem() -> ModemConfig {
    ModemConfig {
        init_commands: vec!["ATZ".to_string()],
        command_delay_ms: 1,
        guard_time_ms: 10,
        ack_timeout_ms: 150,
        hangup_settle_ms: 5,
        monitor_dcd: true,
        dcd_poll_interval_ms: POLL.as_millis() as u64,
        dcd_max_failures: 3,
        drain_timeout_ms: 500,
        ..ModemConfig::default()
    }
}

/// `sh -c <script>`.
pub fn shell(script: &str) -> ProgramSpec {
    ProgramSpec::new("sh", ["-c", script])
}

/// A controller running in the background against a mock modem.
pub struct Harness {
    pub modem: ModemHandle,
    pub stats: Arc<ControllerStats>,
    handle: JoinHandle<Result<Infallible, PortError>>,
}

impl Harness {
    pub async fn start(program: ProgramSpec) -> Self {
        Self::start_with(fast_modem(), program).await
    }

    /// Spawn the controller and wait for its initial init sequence.
    pub async fn start_with(config: ModemConfig, program: ProgramSpec) -> Self {
        let (session, mut modem) = MockModem::pair("MOCK0");
        let controller = Controller::new(session, config, program, Span::none());
        let stats = controller.stats();
        let handle = tokio::spawn(controller.run());

        modem.expect(b"ATZ\r", STEP).await.expect("initial ATZ");
        Self {
            modem,
            stats,
            handle,
        }
    }

    /// Ring, wait for the answer, then report the connection.
    pub async fn connect(&mut self) {
        self.modem.send_line("RING").await.unwrap();
        self.modem.expect(b"ATA\r", STEP).await.expect("answer command");
        self.modem.send_line("CONNECT 9600").await.unwrap();
    }

    /// Play the modem's side of a post-call reset: acknowledge the escape,
    /// see the hang-up and the re-sent init string.
    pub async fn acknowledge_reset(&mut self) {
        self.modem.expect(b"+++", STEP).await.expect("escape sequence");
        self.modem.send_line("OK").await.unwrap();
        self.modem.expect(b"ATH0\r", STEP).await.expect("hang-up command");
        self.modem.expect(b"ATZ\r", STEP).await.expect("re-init");
    }

    pub async fn wait_for(&self, what: &str, pred: impl Fn(&StatsSnapshot) -> bool) -> StatsSnapshot {
        wait_for_stats(&self.stats, what, pred).await
    }

    /// Close the line and check the controller stops with the fatal error.
    pub async fn finish(mut self) -> ModemHandle {
        self.modem.close_line().await.unwrap();
        let result = tokio::time::timeout(STEP, self.handle)
            .await
            .expect("controller kept running after the line closed")
            .expect("controller task panicked");
        assert!(matches!(result, Err(PortError::Closed)), "got {result:?}");
        self.modem
    }
}

/// Poll counters until `pred` holds, failing the test after [`STEP`].
pub async fn wait_for_stats(
    stats: &ControllerStats,
    what: &str,
    pred: impl Fn(&StatsSnapshot) -> bool,
) -> StatsSnapshot {
    let deadline = tokio::time::Instant::now() + STEP;
    loop {
        let snap = stats.snapshot();
        if pred(&snap) {
            return snap;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}: {snap:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
