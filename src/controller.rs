//! The answer loop.
//!
//! One task owns the [`SerialSession`] for the life of the process. It reads
//! result codes, answers on `RING`, hands the line to the [`SessionBridge`] on
//! `CONNECT`, and resets the modem after every call before reading again.
//!
//! ```text
//!          +--------- init ----------+
//!          v                         |
//!   read line -> RING -> ATA         |
//!          |                         |
//!          +--> CONNECT -> bridge -> reset
//! ```

use crate::bridge::{SessionBridge, TerminationReason};
use crate::config::{Config, ModemConfig, ProgramSpec};
use crate::modem::{AnswerSequencer, ModemEvent, ModemReset, ResponseClassifier};
use crate::port::{PortError, SerialSession};
use crate::stats::ControllerStats;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn, Instrument, Span};

/// Drives an answer-only modem.
#[derive(Debug)]
pub struct Controller {
    session: SerialSession,
    classifier: ResponseClassifier,
    sequencer: AnswerSequencer,
    bridge: SessionBridge,
    reset: ModemReset,
    stats: Arc<ControllerStats>,
    span: Span,
}

impl Controller {
    /// Every component logs inside a child of `span`.
    pub fn new(session: SerialSession, modem: ModemConfig, program: ProgramSpec, span: Span) -> Self {
        let stats = ControllerStats::new();
        let bridge = SessionBridge::new(
            program,
            &modem,
            Arc::clone(&stats),
            tracing::info_span!(parent: &span, "bridge"),
        );
        let sequencer = AnswerSequencer::new(
            modem.clone(),
            tracing::debug_span!(parent: &span, "sequencer"),
        );
        let reset = ModemReset::new(modem, tracing::info_span!(parent: &span, "reset"));

        Self {
            session,
            classifier: ResponseClassifier::new(),
            sequencer,
            bridge,
            reset,
            stats,
            span,
        }
    }

    pub fn from_config(session: SerialSession, config: &Config, span: Span) -> Self {
        Self::new(session, config.modem.clone(), config.program.clone(), span)
    }

    /// Counters shared with this controller; stays valid after `run` consumes it.
    pub fn stats(&self) -> Arc<ControllerStats> {
        Arc::clone(&self.stats)
    }

    /// Run until the serial line fails.
    ///
    /// Never returns `Ok`. Modem `ERROR` replies, unacknowledged escapes,
    /// failed spawns and carrier loss are logged and the loop carries on.
    pub async fn run(mut self) -> Result<Infallible, PortError> {
        let span = self.span.clone();
        async move {
            let result = self.answer_loop().await;
            if let Err(e) = &result {
                error!(port = %self.session.name(), error = %e, "serial line failed, stopping");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn answer_loop(&mut self) -> Result<Infallible, PortError> {
        info!(port = %self.session.name(), "initializing modem");
        self.sequencer
            .initialize(&mut self.session, &mut self.classifier)
            .await?;
        info!(port = %self.session.name(), "waiting for calls");

        loop {
            let line = self.session.next_line().await?;
            match self.classifier.classify(&line) {
                ModemEvent::Ring => {
                    self.stats.record_ring();
                    info!("incoming call");
                    self.sequencer
                        .answer(&mut self.session, &mut self.classifier)
                        .await?;
                    self.stats.record_answer();
                }
                ModemEvent::Connect => {
                    info!(line = %line.trim(), "carrier established");
                    self.handle_call().await?;
                }
                ModemEvent::NoCarrier => {
                    info!("call attempt ended before connecting");
                }
                ModemEvent::Ok => debug!("OK"),
                ModemEvent::Error => warn!("modem replied ERROR, continuing"),
                ModemEvent::CommandEcho(command) => trace!(%command, "echo"),
                ModemEvent::Unrecognized(text) => debug!(%text, "unrecognized modem output"),
            }
        }
    }

    async fn handle_call(&mut self) -> Result<(), PortError> {
        let reason = self.bridge.run(&mut self.session).await;
        match &reason {
            TerminationReason::ProgramExited(_) => info!(%reason, "call finished"),
            TerminationReason::SpawnFailed(_) => warn!(%reason, "abandoning call"),
            _ => warn!(%reason, "call torn down"),
        }

        let outcome = self
            .reset
            .run(&mut self.session, &mut self.classifier)
            .await?;
        self.stats.record_reset();
        debug!(acknowledged = outcome.acknowledged, "modem reset");

        self.sequencer
            .initialize(&mut self.session, &mut self.classifier)
            .await
    }
}
