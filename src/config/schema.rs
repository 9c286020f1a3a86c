//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::port::{DataBits, Parity, PortConfiguration, StopBits};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line settings
    pub serial: SerialConfig,
    /// Modem command strings and timing
    pub modem: ModemConfig,
    /// Program bridged to each call
    pub program: ProgramSpec,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check every section; returns the first invalid value found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.serial.port_configuration()?;
        self.modem.validate()?;
        self.program.validate()
    }
}

/// Serial line section, in human-readable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM1`
    pub port: String,
    pub baud_rate: u32,
    /// 5 through 8
    pub data_bits: u8,
    pub parity: ParityCfg,
    /// 1 or 2
    pub stop_bits: u8,
}

impl Default for SerialConfig {
    fn default() -> Self {
        let port = if cfg!(windows) { "COM1" } else { "/dev/ttyUSB0" };
        Self {
            port: port.to_string(),
            baud_rate: 9600,
            data_bits: 8,
            parity: ParityCfg::None,
            stop_bits: 1,
        }
    }
}

impl SerialConfig {
    /// Map the human-readable settings to enumerated line settings.
    pub fn port_configuration(&self) -> ConfigResult<PortConfiguration> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::validation("serial.port", "must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::validation("serial.baud_rate", "must be positive"));
        }
        let data_bits = DataBits::from_count(self.data_bits).ok_or_else(|| {
            ConfigError::validation(
                "serial.data_bits",
                format!("{} is not one of 5, 6, 7, 8", self.data_bits),
            )
        })?;
        let stop_bits = StopBits::from_count(self.stop_bits).ok_or_else(|| {
            ConfigError::validation(
                "serial.stop_bits",
                format!("{} is not one of 1, 2", self.stop_bits),
            )
        })?;

        Ok(PortConfiguration {
            baud_rate: self.baud_rate,
            data_bits,
            parity: self.parity.into(),
            stop_bits,
        })
    }
}

/// Parity as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParityCfg {
    #[serde(rename = "N", alias = "n", alias = "none")]
    None,
    #[serde(rename = "E", alias = "e", alias = "even")]
    Even,
    #[serde(rename = "O", alias = "o", alias = "odd")]
    Odd,
}

impl From<ParityCfg> for Parity {
    fn from(parity: ParityCfg) -> Self {
        match parity {
            ParityCfg::None => Parity::None,
            ParityCfg::Even => Parity::Even,
            ParityCfg::Odd => Parity::Odd,
        }
    }
}

/// Modem command strings and the delays the modem needs between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Sent in order at startup and after every call
    pub init_commands: Vec<String>,
    pub answer_command: String,
    pub hangup_command: String,
    pub escape_sequence: String,
    /// Appended to every command
    pub line_ending: String,
    /// Settle delay after each init command
    pub command_delay_ms: u64,
    /// Silence required on both sides of the escape sequence
    pub guard_time_ms: u64,
    /// How long to wait for OK after the escape sequence
    pub ack_timeout_ms: u64,
    /// Pause after hang-up before reading result codes again
    pub hangup_settle_ms: u64,
    /// Poll the DCD line during calls
    pub monitor_dcd: bool,
    pub dcd_poll_interval_ms: u64,
    /// Consecutive failed DCD queries treated as carrier loss
    pub dcd_max_failures: u32,
    /// Time allowed to flush program output to the line after it exits
    pub drain_timeout_ms: u64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            init_commands: vec![
                "ATZ".to_string(),    // reset
                "ATH0".to_string(),   // on hook
                "ATS0=1".to_string(), // auto-answer after one ring
                "AT&K0".to_string(),  // no flow control
            ],
            answer_command: "ATA".to_string(),
            hangup_command: "ATH0".to_string(),
            escape_sequence: "+++".to_string(),
            line_ending: "\r".to_string(),
            command_delay_ms: 500,
            guard_time_ms: 1000,
            ack_timeout_ms: 3000,
            hangup_settle_ms: 1500,
            monitor_dcd: true,
            dcd_poll_interval_ms: 1000,
            dcd_max_failures: 3,
            drain_timeout_ms: 2000,
        }
    }
}

impl ModemConfig {
    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    pub fn guard_time(&self) -> Duration {
        Duration::from_millis(self.guard_time_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn hangup_settle(&self) -> Duration {
        Duration::from_millis(self.hangup_settle_ms)
    }

    pub fn dcd_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dcd_poll_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        for (key, value) in [
            ("modem.answer_command", &self.answer_command),
            ("modem.hangup_command", &self.hangup_command),
            ("modem.escape_sequence", &self.escape_sequence),
            ("modem.line_ending", &self.line_ending),
        ] {
            if value.is_empty() {
                return Err(ConfigError::validation(key, "must not be empty"));
            }
        }
        if self.dcd_poll_interval_ms == 0 {
            return Err(ConfigError::validation(
                "modem.dcd_poll_interval_ms",
                "must be positive",
            ));
        }
        if self.dcd_max_failures == 0 {
            return Err(ConfigError::validation(
                "modem.dcd_max_failures",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// The program run for every connected call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramSpec {
    /// Executable name or path
    pub command: String,
    pub args: Vec<String>,
    /// Extra environment on top of the inherited one
    pub env: BTreeMap<String, String>,
    /// Copy the program's output to local stdout as well as the line
    pub mirror_output: bool,
}

impl Default for ProgramSpec {
    fn default() -> Self {
        Self {
            command: "fortune".to_string(),
            args: Vec::new(),
            env: BTreeMap::new(),
            mirror_output: true,
        }
    }
}

impl ProgramSpec {
    /// Shorthand for a program with arguments and no extra environment.
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            mirror_output: false,
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::validation("program.command", "must not be empty"));
        }
        Ok(())
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error". `RUST_LOG` wins.
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
