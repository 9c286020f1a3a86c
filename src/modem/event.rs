//! Result-code classification.
//!
//! Modems echo commands and emit asynchronous result codes on the same
//! line-oriented channel. Each decoded line maps to exactly one
//! [`ModemEvent`]; classification is pure and never fails.

use std::collections::HashSet;

/// One classified line from the modem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemEvent {
    Ring,
    /// `CONNECT`, with or without a speed suffix.
    Connect,
    NoCarrier,
    Ok,
    Error,
    /// The modem repeating a command this controller sent.
    CommandEcho(String),
    Unrecognized(String),
}

/// Strip surrounding whitespace and control characters.
pub fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c.is_control())
}

fn is_connect(line: &str) -> bool {
    line.split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .is_some_and(|token| token == "CONNECT")
}

/// Classifies modem lines, suppressing echoes of commands already sent.
#[derive(Debug, Clone, Default)]
pub struct ResponseClassifier {
    issued: HashSet<String>,
}

impl ResponseClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command so its echo is recognised.
    pub fn remember(&mut self, command: &str) {
        let command = trim_line(command);
        if !command.is_empty() {
            self.issued.insert(command.to_string());
        }
    }

    /// Map a raw line to its event. First matching rule wins.
    pub fn classify(&self, line: &str) -> ModemEvent {
        let line = trim_line(line);

        if line == "RING" {
            ModemEvent::Ring
        } else if is_connect(line) {
            ModemEvent::Connect
        } else if line.contains("NO CARRIER") {
            ModemEvent::NoCarrier
        } else if line == "OK" {
            ModemEvent::Ok
        } else if line == "ERROR" {
            ModemEvent::Error
        } else if self.issued.contains(line) {
            ModemEvent::CommandEcho(line.to_string())
        } else {
            ModemEvent::Unrecognized(line.to_string())
        }
    }
}
