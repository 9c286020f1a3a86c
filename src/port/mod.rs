//! Serial transport layer for the modem line.
//!
//! Provides the line reader, the exclusive `SerialSession` handle, the
//! tokio-serial backed hardware transport and an in-memory modem for tests.

pub mod error;
pub mod line_reader;
pub mod mock;
pub mod serial;
pub mod session;
pub mod traits;

pub use error::PortError;
pub use line_reader::{LineReader, MAX_LINE_LEN};
pub use mock::{MockCarrier, MockModem, ModemHandle};
pub use serial::{open_modem, StatusLine};
pub use session::{BridgeParts, SerialReader, SerialSession, SerialWriter};
pub use traits::*;
