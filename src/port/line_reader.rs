//! Line-oriented reader for modem result codes.
//!
//! Modems terminate result codes with CR, LF or CRLF and frame them with blank
//! lines. The reader splits on any of those, drops blank lines, and keeps the
//! bytes that follow the last returned line so the session bridge can forward
//! them once a call connects.

use super::error::PortError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

/// Longest line kept before it is force-split.
pub const MAX_LINE_LEN: usize = 1024;

const READ_CHUNK: usize = 256;

/// Buffered line splitter over an async byte source.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    eof: bool,
    /// The last line ended on a CR with nothing read after it yet.
    pending_lf: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
            eof: false,
            pending_lf: false,
        }
    }

    /// Wait for the next non-blank line.
    ///
    /// Cancel safe: bytes are only moved into the internal buffer after a read
    /// completes, so dropping this future (e.g. on a timeout) loses nothing.
    /// Returns `PortError::Closed` once the source reports end-of-stream and
    /// every buffered line has been handed out.
    pub async fn next_line(&mut self) -> Result<String, PortError> {
        loop {
            while let Some(line) = self.split_line() {
                if !line.trim().is_empty() {
                    return Ok(line);
                }
            }

            if self.buf.len() >= MAX_LINE_LEN {
                let overflow: Vec<u8> = self.buf.drain(..MAX_LINE_LEN).collect();
                warn!(len = MAX_LINE_LEN, "modem line exceeded limit, splitting");
                return Ok(String::from_utf8_lossy(&overflow).into_owned());
            }

            if self.eof {
                if self.buf.is_empty() {
                    return Err(PortError::Closed);
                }
                let rest = std::mem::take(&mut self.buf);
                let line = String::from_utf8_lossy(&rest).into_owned();
                if line.trim().is_empty() {
                    return Err(PortError::Closed);
                }
                return Ok(line);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }

    /// Hand over every byte read past the last returned line.
    ///
    /// The LF completing a CR-terminated line is dropped if it has arrived.
    /// If it has not, [`LineReader::take_pending_lf`] reports that the next
    /// byte from the source may be that LF.
    pub fn take_buffered(&mut self) -> Vec<u8> {
        self.settle_pending_lf();
        std::mem::take(&mut self.buf)
    }

    /// Whether the last line ended on a bare CR whose LF is still unread.
    /// Clears the flag.
    pub fn take_pending_lf(&mut self) -> bool {
        std::mem::take(&mut self.pending_lf)
    }

    /// Number of bytes read but not yet returned.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Direct access to the byte source, bypassing line splitting.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn settle_pending_lf(&mut self) {
        if self.pending_lf && !self.buf.is_empty() {
            self.pending_lf = false;
            if self.buf[0] == b'\n' {
                self.buf.remove(0);
            }
        }
    }

    fn split_line(&mut self) -> Option<String> {
        self.settle_pending_lf();
        let pos = memchr::memchr2(b'\r', b'\n', &self.buf)?;
        let mut consumed = pos + 1;
        if self.buf[pos] == b'\r' {
            match self.buf.get(pos + 1) {
                Some(b'\n') => consumed += 1,
                None => self.pending_lf = true,
                Some(_) => {}
            }
        }
        let line = String::from_utf8_lossy(&self.buf[..pos]).into_owned();
        self.buf.drain(..consumed);
        Some(line)
    }
}
