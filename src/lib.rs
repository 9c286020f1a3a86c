//! ringin: an answer-only controller for Hayes (AT command set) modems.
//!
//! The controller waits for `RING`, answers, and on `CONNECT` bridges the
//! serial line to a freshly spawned program's stdin/stdout. The call ends when
//! the program exits or the carrier goes away (DCD drops or the modem reports
//! `NO CARRIER`); the modem is then escaped, hung up and re-initialized.
//!
//! # Modules
//!
//! - `config`: TOML configuration with environment overrides
//! - `port`: serial transport, line reader and the in-memory mock modem
//! - `modem`: result-code classification, init/answer sequencing, reset
//! - `bridge`: per-call program bridge and carrier monitor
//! - `controller`: the answer loop
//! - `stats`: call counters
//! - `logging`: tracing subscriber setup for the binary
//! - `error`: top-level error type

pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod modem;
pub mod port;
pub mod stats;

// Re-export commonly used types for convenience
pub use bridge::{CarrierLoss, SessionBridge, TerminationReason};
pub use controller::Controller;
pub use error::{RinginError, RinginResult};
pub use modem::{ModemEvent, ResponseClassifier};
pub use port::{
    open_modem, CarrierDetect, DataBits, MockCarrier, MockModem, ModemHandle, Parity,
    PortConfiguration, PortError, SerialSession, StopBits,
};
pub use stats::{ControllerStats, StatsSnapshot};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult, ModemConfig, ProgramSpec};
