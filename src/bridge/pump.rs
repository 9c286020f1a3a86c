//! Byte pumps between the modem line and the bridged program.
//!
//! The inbound pump also watches the call data for the modem's textual
//! `NO CARRIER` result code, which ends the call the same way a DCD drop does.

use crate::port::{SerialReader, SerialWriter};
use memchr::memmem;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

const NO_CARRIER: &[u8] = b"NO CARRIER";
const CHUNK: usize = 1024;

/// Chunks queued for the program's stdin before further call data is dropped.
const STDIN_BACKLOG: usize = 64;

/// How long queued input may take to reach the program once the line side ends.
const STDIN_FLUSH_GRACE: Duration = Duration::from_millis(100);

/// Finds `NO CARRIER` in a byte stream delivered in arbitrary chunks.
#[derive(Debug, Default)]
pub struct NoCarrierScanner {
    tail: Vec<u8>,
}

impl NoCarrierScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk; returns where the marker starts within it.
    ///
    /// A marker split across chunks reports offset 0 in the chunk that
    /// completes it, since its first bytes were in an earlier chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<usize> {
        let carried = self.tail.len();
        self.tail.extend_from_slice(chunk);
        if let Some(pos) = memmem::find(&self.tail, NO_CARRIER) {
            self.tail.clear();
            return Some(pos.saturating_sub(carried));
        }
        let keep = NO_CARRIER.len() - 1;
        if self.tail.len() > keep {
            self.tail.drain(..self.tail.len() - keep);
        }
        None
    }
}

/// Why the line-to-program pump stopped.
#[derive(Debug)]
pub enum InboundEnd {
    /// The modem reported `NO CARRIER` inside the call data.
    NoCarrier,
    /// The line reached end-of-stream.
    LineClosed,
    LineError(io::Error),
}

/// Why the program-to-line pump stopped.
#[derive(Debug)]
pub enum OutboundEnd {
    /// The program closed its output.
    ProgramClosed,
    LineError(io::Error),
}

/// Copy call data from the line into the program's stdin.
///
/// `leftover` holds bytes the line reader had already buffered past the
/// `CONNECT` line; they are scanned and forwarded first. When `skip_lf` is
/// set the `CONNECT` line ended on a bare CR, and one LF opening the call
/// data belongs to it rather than to the caller.
///
/// The line is read and scanned without ever waiting on the program. Input
/// is queued for a separate stdin writer; once the program stops reading and
/// the queue fills, further call data is discarded but still scanned. The
/// program's stdin is closed when this returns.
pub async fn pump_inbound(
    leftover: Vec<u8>,
    skip_lf: bool,
    serial: &mut SerialReader,
    stdin: ChildStdin,
) -> InboundEnd {
    let (tx, rx) = mpsc::channel(STDIN_BACKLOG);
    let writer = feed_program(stdin, rx);
    let reader = read_call_data(leftover, skip_lf, serial, tx);
    tokio::pin!(writer, reader);

    let mut writer_done = false;
    let end = loop {
        tokio::select! {
            end = &mut reader => break end,
            () = &mut writer, if !writer_done => writer_done = true,
        }
    };

    if !writer_done
        && tokio::time::timeout(STDIN_FLUSH_GRACE, &mut writer)
            .await
            .is_err()
    {
        trace!("program input still backed up, closing it");
    }
    end
}

async fn read_call_data(
    leftover: Vec<u8>,
    mut skip_lf: bool,
    serial: &mut SerialReader,
    tx: mpsc::Sender<Vec<u8>>,
) -> InboundEnd {
    let mut scanner = NoCarrierScanner::new();
    let mut queue = StdinQueue::new(tx);

    if !leftover.is_empty() {
        let data = strip_stray_lf(&mut skip_lf, &leftover);
        if let Some(at) = scanner.feed(data) {
            queue.push(&data[..at]);
            debug!(forwarded = queue.forwarded, "NO CARRIER in buffered call data");
            return InboundEnd::NoCarrier;
        }
        queue.push(data);
    }

    let mut buf = [0u8; CHUNK];
    loop {
        let n = match serial.read(&mut buf).await {
            Ok(0) => {
                debug!(
                    forwarded = queue.forwarded,
                    dropped = queue.dropped,
                    "line closed during call"
                );
                return InboundEnd::LineClosed;
            }
            Ok(n) => n,
            Err(e) => return InboundEnd::LineError(e),
        };
        let data = strip_stray_lf(&mut skip_lf, &buf[..n]);
        if let Some(at) = scanner.feed(data) {
            queue.push(&data[..at]);
            debug!(
                forwarded = queue.forwarded,
                dropped = queue.dropped,
                "NO CARRIER in call data"
            );
            return InboundEnd::NoCarrier;
        }
        queue.push(data);
    }
}

/// Drop the LF completing a CR-terminated `CONNECT` from the first data seen.
fn strip_stray_lf<'a>(skip_lf: &mut bool, data: &'a [u8]) -> &'a [u8] {
    if !*skip_lf || data.is_empty() {
        return data;
    }
    *skip_lf = false;
    data.strip_prefix(b"\n").unwrap_or(data)
}

/// Sending side of the stdin queue. Never waits.
struct StdinQueue {
    tx: mpsc::Sender<Vec<u8>>,
    forwarded: usize,
    dropped: usize,
}

impl StdinQueue {
    fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            tx,
            forwarded: 0,
            dropped: 0,
        }
    }

    fn push(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        match self.tx.try_send(data.to_vec()) {
            Ok(()) => self.forwarded += data.len(),
            Err(TrySendError::Full(_)) => {
                trace!(len = data.len(), "program input backed up, dropping call data");
                self.dropped += data.len();
            }
            // the program stopped accepting input
            Err(TrySendError::Closed(_)) => self.dropped += data.len(),
        }
    }
}

/// Write queued call data to the program until the queue closes or the pipe fails.
async fn feed_program(mut stdin: ChildStdin, mut rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(data) = rx.recv().await {
        let written = async {
            stdin.write_all(&data).await?;
            stdin.flush().await
        }
        .await;
        if let Err(e) = written {
            trace!(error = %e, "program stopped reading input");
            return;
        }
    }
}

/// Copy program output onto the line, optionally mirroring it to local stdout.
///
/// This is the only writer on the line for the duration of a call.
pub async fn pump_outbound(
    mut stdout: ChildStdout,
    serial: &mut SerialWriter,
    mirror: bool,
) -> OutboundEnd {
    let mut console = mirror.then(tokio::io::stdout);
    let mut buf = [0u8; CHUNK];
    let mut sent = 0usize;
    loop {
        let n = match stdout.read(&mut buf).await {
            Ok(0) => {
                debug!(sent, "program closed its output");
                return OutboundEnd::ProgramClosed;
            }
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "program output failed");
                return OutboundEnd::ProgramClosed;
            }
        };
        if let Err(e) = serial.write_all(&buf[..n]).await {
            return OutboundEnd::LineError(e);
        }
        if let Err(e) = serial.flush().await {
            return OutboundEnd::LineError(e);
        }
        sent += n;
        if let Some(out) = console.as_mut() {
            if out.write_all(&buf[..n]).await.is_err() || out.flush().await.is_err() {
                console = None;
            }
        }
    }
}
