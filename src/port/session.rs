//! The long-lived handle to the open modem line.

use super::error::PortError;
use super::line_reader::LineReader;
use super::traits::{CarrierDetect, ModemStream};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::trace;

/// Read side of the modem stream.
pub type SerialReader = ReadHalf<Box<dyn ModemStream>>;

/// Write side of the modem stream.
pub type SerialWriter = WriteHalf<Box<dyn ModemStream>>;

/// Exclusive handle to the modem line.
///
/// Exactly one exists per process. Outside a call the controller reads result
/// codes and writes commands through it; during a call the bridge borrows the
/// raw halves via [`SerialSession::bridge_parts`] and nothing else touches the
/// stream until the bridge returns.
pub struct SerialSession {
    name: String,
    reader: LineReader<SerialReader>,
    writer: SerialWriter,
    carrier: Arc<dyn CarrierDetect>,
}

/// Borrowed stream halves handed to the session bridge for one call.
pub struct BridgeParts<'a> {
    /// Bytes already read past the `CONNECT` line.
    pub leftover: Vec<u8>,
    /// `CONNECT` ended on a bare CR; a leading LF on the line is its terminator.
    pub skip_lf: bool,
    pub reader: &'a mut SerialReader,
    pub writer: &'a mut SerialWriter,
}

impl SerialSession {
    pub fn new<S>(name: impl Into<String>, stream: S, carrier: Arc<dyn CarrierDetect>) -> Self
    where
        S: ModemStream + 'static,
    {
        let boxed: Box<dyn ModemStream> = Box::new(stream);
        let (read_half, write_half) = tokio::io::split(boxed);
        Self {
            name: name.into(),
            reader: LineReader::new(read_half),
            writer: write_half,
            carrier,
        }
    }

    /// Name of the underlying device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the modem sends another non-blank line.
    pub async fn next_line(&mut self) -> Result<String, PortError> {
        let line = self.reader.next_line().await?;
        trace!(port = %self.name, line = %line.trim(), "rx");
        Ok(line)
    }

    /// Write raw bytes and flush them to the device.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<(), PortError> {
        self.writer.write_all(data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write a command followed by the modem's line ending.
    pub async fn send_command(&mut self, command: &str, line_ending: &str) -> Result<(), PortError> {
        trace!(port = %self.name, command, "tx");
        let mut framed = Vec::with_capacity(command.len() + line_ending.len());
        framed.extend_from_slice(command.as_bytes());
        framed.extend_from_slice(line_ending.as_bytes());
        self.write_all(&framed).await
    }

    /// Status-line handle used by the carrier monitor.
    pub fn carrier(&self) -> Arc<dyn CarrierDetect> {
        Arc::clone(&self.carrier)
    }

    pub fn bridge_parts(&mut self) -> BridgeParts<'_> {
        let leftover = self.reader.take_buffered();
        let skip_lf = self.reader.take_pending_lf();
        BridgeParts {
            leftover,
            skip_lf,
            reader: self.reader.get_mut(),
            writer: &mut self.writer,
        }
    }
}

impl std::fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("name", &self.name)
            .field("buffered", &self.reader.buffered_len())
            .finish()
    }
}
