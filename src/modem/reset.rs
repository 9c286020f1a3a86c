//! Post-call reset: escape to command mode, then hang up.

use super::event::{ModemEvent, ResponseClassifier};
use crate::config::ModemConfig;
use crate::port::{PortError, SerialSession};
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument, Span};

/// What the reset sequence observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetOutcome {
    /// The modem answered the escape sequence with `OK`.
    pub acknowledged: bool,
}

/// Returns the modem to command mode and on-hook after every call.
#[derive(Debug, Clone)]
pub struct ModemReset {
    config: ModemConfig,
    span: Span,
}

impl ModemReset {
    pub fn new(config: ModemConfig, span: Span) -> Self {
        Self { config, span }
    }

    /// Guard, escape, guard, wait for `OK`, hang up, settle.
    ///
    /// A missing acknowledgement is logged and the hang-up is sent anyway.
    /// Only a failed write is an error.
    pub async fn run(
        &self,
        session: &mut SerialSession,
        classifier: &mut ResponseClassifier,
    ) -> Result<ResetOutcome, PortError> {
        async move {
            let config = &self.config;

            // the escape only counts if the line is quiet on both sides of it
            tokio::time::sleep(config.guard_time()).await;
            debug!(escape = %config.escape_sequence, "escaping to command mode");
            session.write_all(config.escape_sequence.as_bytes()).await?;
            tokio::time::sleep(config.guard_time()).await;

            let acknowledged = self.await_ok(session, classifier).await;
            if !acknowledged {
                warn!(
                    timeout_ms = config.ack_timeout_ms,
                    "modem did not acknowledge escape, hanging up anyway"
                );
            }

            info!(command = %config.hangup_command, "hanging up");
            session
                .send_command(&config.hangup_command, &config.line_ending)
                .await?;
            classifier.remember(&config.hangup_command);
            tokio::time::sleep(config.hangup_settle()).await;

            Ok(ResetOutcome { acknowledged })
        }
        .instrument(self.span.clone())
        .await
    }

    async fn await_ok(&self, session: &mut SerialSession, classifier: &ResponseClassifier) -> bool {
        let deadline = Instant::now() + self.config.ack_timeout();
        loop {
            match tokio::time::timeout_at(deadline, session.next_line()).await {
                Err(_) => return false,
                Ok(Err(e)) => {
                    warn!(error = %e, "line failed while waiting for escape acknowledgement");
                    return false;
                }
                Ok(Ok(line)) => match classifier.classify(&line) {
                    ModemEvent::Ok => return true,
                    other => debug!(event = ?other, "ignored while awaiting OK"),
                },
            }
        }
    }
}
