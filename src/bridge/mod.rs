//! Session bridge: couples the modem line to a program for one call.
//!
//! On `CONNECT` the bridge spawns the configured program, pumps bytes in both
//! directions, and races three ways for the call to end:
//!
//! - the program exits,
//! - the carrier monitor sees DCD drop (or its queries keep failing),
//! - the inbound pump sees `NO CARRIER` or the line closes.
//!
//! Whichever resolves first decides the [`TerminationReason`]; the other
//! futures are dropped unpolled. The program is killed unless it already
//! exited, and every pump has stopped before [`SessionBridge::run`] returns,
//! so the reset sequence owns the line alone afterwards.

pub mod monitor;
pub mod pump;

pub use monitor::{CarrierLoss, CarrierMonitor};
pub use pump::{pump_inbound, pump_outbound, InboundEnd, NoCarrierScanner, OutboundEnd};

use crate::config::{ModemConfig, ProgramSpec};
use crate::port::{CarrierDetect, SerialSession};
use crate::stats::{ActiveCall, ControllerStats};
use std::fmt;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, error, info, warn, Instrument, Span};

/// Environment variable set for every bridged program.
pub const MODEM_ENV_KEY: &str = "MODEM";
/// Value of [`MODEM_ENV_KEY`].
pub const MODEM_ENV_VALUE: &str = "dumb";

/// How a call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The program exited on its own; carries its exit code when it had one.
    ProgramExited(Option<i32>),
    /// The carrier monitor reported loss.
    CarrierLost(CarrierLoss),
    /// The modem sent `NO CARRIER` during the call.
    NoCarrier,
    /// The line reached end-of-stream.
    LineClosed,
    /// Reading or writing the line failed.
    LineFailed(String),
    /// The program could not be started; no call session existed.
    SpawnFailed(String),
}

impl TerminationReason {
    /// Carrier went away, electrically or textually.
    pub fn is_carrier_loss(&self) -> bool {
        matches!(self, Self::CarrierLost(_) | Self::NoCarrier)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProgramExited(Some(code)) => write!(f, "program exited with status {code}"),
            Self::ProgramExited(None) => write!(f, "program exited"),
            Self::CarrierLost(loss) => write!(f, "carrier lost: {loss}"),
            Self::NoCarrier => write!(f, "modem reported NO CARRIER"),
            Self::LineClosed => write!(f, "serial line closed"),
            Self::LineFailed(e) => write!(f, "serial line failed: {e}"),
            Self::SpawnFailed(e) => write!(f, "program failed to start: {e}"),
        }
    }
}

/// One bridged call: the running program and its bookkeeping.
#[derive(Debug)]
pub struct CallSession {
    child: Child,
    pid: Option<u32>,
    started: Instant,
    stats: Arc<ControllerStats>,
    _active: ActiveCall,
}

impl CallSession {
    fn spawn(
        program: &ProgramSpec,
        stats: &Arc<ControllerStats>,
    ) -> io::Result<(Self, ChildStdin, ChildStdout)> {
        let mut child = Command::new(&program.command)
            .args(&program.args)
            .envs(&program.env)
            .env(MODEM_ENV_KEY, MODEM_ENV_VALUE)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("program stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("program stdout was not captured"))?;

        let session = Self {
            pid: child.id(),
            child,
            started: Instant::now(),
            stats: Arc::clone(stats),
            _active: stats.call_started(),
        };
        Ok((session, stdin, stdout))
    }

    /// OS process id, while the program runs.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Kill the program unless it already exited. Safe to call repeatedly.
    async fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = ?self.pid, %status, "program already exited");
                return;
            }
            Ok(None) => {}
            Err(e) => warn!(pid = ?self.pid, error = %e, "could not poll program status"),
        }

        info!(pid = ?self.pid, "killing program");
        self.stats.record_forced_kill();
        match self.child.kill().await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                debug!(pid = ?self.pid, "program exited before the kill landed");
            }
            Err(e) => warn!(pid = ?self.pid, error = %e, "failed to kill program"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DcdPolling {
    interval: Duration,
    max_failures: u32,
}

/// Runs one call per [`SessionBridge::run`].
#[derive(Debug, Clone)]
pub struct SessionBridge {
    program: ProgramSpec,
    dcd: Option<DcdPolling>,
    drain_timeout: Duration,
    stats: Arc<ControllerStats>,
    span: Span,
}

impl SessionBridge {
    pub fn new(
        program: ProgramSpec,
        modem: &ModemConfig,
        stats: Arc<ControllerStats>,
        span: Span,
    ) -> Self {
        let dcd = modem.monitor_dcd.then(|| DcdPolling {
            interval: modem.dcd_poll_interval(),
            max_failures: modem.dcd_max_failures,
        });
        Self {
            program,
            dcd,
            drain_timeout: modem.drain_timeout(),
            stats,
            span,
        }
    }

    /// Bridge the line to a fresh program until the call ends.
    ///
    /// Returns exactly once per call and never leaves the program running.
    /// A spawn failure is reported as [`TerminationReason::SpawnFailed`]
    /// without touching the line.
    pub async fn run(&self, session: &mut SerialSession) -> TerminationReason {
        let reason = self.bridge(session).instrument(self.span.clone()).await;
        if reason.is_carrier_loss() {
            self.stats.record_carrier_loss();
        }
        reason
    }

    async fn bridge(&self, session: &mut SerialSession) -> TerminationReason {
        let (mut call, stdin, stdout) = match CallSession::spawn(&self.program, &self.stats) {
            Ok(spawned) => spawned,
            Err(e) => {
                error!(command = %self.program.command, error = %e, "failed to start program");
                self.stats.record_failed_spawn();
                return TerminationReason::SpawnFailed(e.to_string());
            }
        };
        info!(pid = ?call.pid(), command = %self.program.command, "program started");

        let carrier = session.carrier();
        let parts = session.bridge_parts();

        let inbound = pump_inbound(parts.leftover, parts.skip_lf, parts.reader, stdin);
        let outbound = pump_outbound(stdout, parts.writer, self.program.mirror_output);
        let monitor = self.watch_carrier(carrier);
        tokio::pin!(inbound, outbound, monitor);

        let mut outbound_done = false;
        let reason = loop {
            tokio::select! {
                status = call.child.wait() => {
                    break match status {
                        Ok(status) => TerminationReason::ProgramExited(status.code()),
                        Err(e) => {
                            warn!(error = %e, "waiting on program failed");
                            TerminationReason::ProgramExited(None)
                        }
                    };
                }
                loss = &mut monitor => break TerminationReason::CarrierLost(loss),
                end = &mut inbound => {
                    break match end {
                        InboundEnd::NoCarrier => TerminationReason::NoCarrier,
                        InboundEnd::LineClosed => TerminationReason::LineClosed,
                        InboundEnd::LineError(e) => TerminationReason::LineFailed(e.to_string()),
                    };
                }
                end = &mut outbound, if !outbound_done => {
                    outbound_done = true;
                    if let OutboundEnd::LineError(e) = end {
                        break TerminationReason::LineFailed(e.to_string());
                    }
                }
            }
        };

        if matches!(reason, TerminationReason::ProgramExited(_)) && !outbound_done {
            // the program may exit with output still in its pipe
            if tokio::time::timeout(self.drain_timeout, &mut outbound)
                .await
                .is_err()
            {
                warn!("program output still open after exit, abandoning it");
            }
        }

        call.terminate().await;
        info!(
            pid = ?call.pid(),
            reason = %reason,
            duration_ms = call.started.elapsed().as_millis() as u64,
            "call ended"
        );
        reason
    }

    async fn watch_carrier(&self, carrier: Arc<dyn CarrierDetect>) -> CarrierLoss {
        match self.dcd {
            Some(dcd) => {
                CarrierMonitor::new(carrier, dcd.interval, dcd.max_failures)
                    .watch()
                    .await
            }
            None => std::future::pending().await,
        }
    }
}
