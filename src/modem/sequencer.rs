//! Init and answer command sequencing.
//!
//! Both operations only write. Replies (`OK`, `ERROR`, `CONNECT`) come back
//! through the controller's read loop.

use super::event::ResponseClassifier;
use crate::config::ModemConfig;
use crate::port::{PortError, SerialSession};
use tracing::{debug, info, Instrument, Span};

/// Writes the configured init strings and the answer command.
#[derive(Debug, Clone)]
pub struct AnswerSequencer {
    config: ModemConfig,
    span: Span,
}

impl AnswerSequencer {
    pub fn new(config: ModemConfig, span: Span) -> Self {
        Self { config, span }
    }

    /// Send every init command with the settle delay after each, then a bare
    /// line ending to flush the modem's command buffer.
    pub async fn initialize(
        &self,
        session: &mut SerialSession,
        classifier: &mut ResponseClassifier,
    ) -> Result<(), PortError> {
        let config = &self.config;
        async move {
            info!(count = config.init_commands.len(), "sending init commands");
            for command in &config.init_commands {
                debug!(command = %command, "init");
                session.send_command(command, &config.line_ending).await?;
                classifier.remember(command);
                tokio::time::sleep(config.command_delay()).await;
            }
            session.write_all(config.line_ending.as_bytes()).await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Pick up the line.
    pub async fn answer(
        &self,
        session: &mut SerialSession,
        classifier: &mut ResponseClassifier,
    ) -> Result<(), PortError> {
        let config = &self.config;
        async move {
            info!(command = %config.answer_command, "answering");
            session
                .send_command(&config.answer_command, &config.line_ending)
                .await?;
            classifier.remember(&config.answer_command);
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }
}
