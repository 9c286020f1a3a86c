//! In-memory modem for testing.
//!
//! [`MockModem::pair`] returns a [`SerialSession`] backed by a
//! `tokio::io::duplex` pipe together with the modem end of that pipe. The
//! test plays the modem: it sends result codes, watches the commands the
//! controller writes, toggles DCD, and can close the line.
//!
//! # Example
//! ```
//! use ringin::port::MockModem;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> std::io::Result<()> {
//! let (mut session, mut modem) = MockModem::pair("MOCK0");
//! modem.send_line("RING").await?;
//! assert_eq!(session.next_line().await.unwrap(), "RING");
//!
//! session.send_command("ATA", "\r").await.unwrap();
//! modem.expect(b"ATA\r", Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use super::error::PortError;
use super::session::SerialSession;
use super::traits::CarrierDetect;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::time::Instant;

const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Debug)]
struct CarrierState {
    present: bool,
    failures_remaining: u32,
    queries: u64,
}

/// Switchable DCD line with injectable query failures.
#[derive(Debug, Clone)]
pub struct MockCarrier {
    state: Arc<Mutex<CarrierState>>,
}

impl MockCarrier {
    pub fn new(present: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(CarrierState {
                present,
                failures_remaining: 0,
                queries: 0,
            })),
        }
    }

    /// Raise or drop the simulated carrier.
    pub fn set_present(&self, present: bool) {
        self.state.lock().present = present;
    }

    /// Make the next `count` status queries fail.
    pub fn fail_next_queries(&self, count: u32) {
        self.state.lock().failures_remaining = count;
    }

    /// Total status queries seen, failed ones included.
    pub fn query_count(&self) -> u64 {
        self.state.lock().queries
    }
}

#[async_trait]
impl CarrierDetect for MockCarrier {
    async fn carrier_detect(&self) -> Result<bool, PortError> {
        let mut state = self.state.lock();
        state.queries += 1;
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(PortError::Io(io::Error::other("simulated status query failure")));
        }
        Ok(state.present)
    }
}

/// Factory for in-memory modem lines.
pub struct MockModem;

impl MockModem {
    /// Build a session with carrier present and return the modem end.
    pub fn pair(name: &str) -> (SerialSession, ModemHandle) {
        let (host, modem) = tokio::io::duplex(PIPE_CAPACITY);
        let carrier = MockCarrier::new(true);
        let session = SerialSession::new(name, host, Arc::new(carrier.clone()));
        let handle = ModemHandle {
            stream: modem,
            carrier,
            transcript: Vec::new(),
            cursor: 0,
        };
        (session, handle)
    }
}

/// The modem side of a mock line.
#[derive(Debug)]
pub struct ModemHandle {
    stream: DuplexStream,
    carrier: MockCarrier,
    transcript: Vec<u8>,
    cursor: usize,
}

impl ModemHandle {
    /// Send a result code framed the way verbose-mode modems do (`\r\nCODE\r\n`).
    pub async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.send_raw(format!("\r\n{line}\r\n").as_bytes()).await
    }

    /// Send bytes as-is, e.g. call data from the remote caller.
    pub async fn send_raw(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    /// Wait until the controller has written `needle`.
    ///
    /// Matching resumes after the previous match, so repeated calls observe
    /// repeated writes.
    pub async fn expect(&mut self, needle: &[u8], within: Duration) -> io::Result<()> {
        let deadline = Instant::now() + within;
        loop {
            if let Some(pos) = memchr::memmem::find(&self.transcript[self.cursor..], needle) {
                self.cursor += pos + needle.len();
                return Ok(());
            }
            let n = self.read_chunk(deadline).await?.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("modem never saw {:?}", String::from_utf8_lossy(needle)),
                )
            })?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("line closed before {:?}", String::from_utf8_lossy(needle)),
                ));
            }
        }
    }

    /// Collect whatever the controller writes during `period`.
    pub async fn drain_for(&mut self, period: Duration) -> io::Result<()> {
        let deadline = Instant::now() + period;
        while let Some(n) = self.read_chunk(deadline).await? {
            if n == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Everything the controller has written so far.
    pub fn transcript(&self) -> &[u8] {
        &self.transcript
    }

    /// Occurrences of `needle` in the full transcript.
    pub fn count(&self, needle: &[u8]) -> usize {
        memchr::memmem::find_iter(&self.transcript, needle).count()
    }

    /// Close the modem's sending direction; the controller reads end-of-stream.
    pub async fn close_line(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }

    /// The simulated DCD line.
    pub fn carrier(&self) -> &MockCarrier {
        &self.carrier
    }

    async fn read_chunk(&mut self, deadline: Instant) -> io::Result<Option<usize>> {
        let mut chunk = [0u8; 512];
        match tokio::time::timeout_at(deadline, self.stream.read(&mut chunk)).await {
            Ok(read) => {
                let n = read?;
                self.transcript.extend_from_slice(&chunk[..n]);
                Ok(Some(n))
            }
            Err(_) => Ok(None),
        }
    }
}
