// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured log documents emitted by the native process.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize, Serializer};

/// Severity of a native log record, ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Parse a level string case-insensitively. Unrecognized strings map to
    /// `Warn` so an unexpected level is still surfaced.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Level::Trace,
            "DEBUG" => Level::Debug,
            "INFO" => Level::Info,
            "WARN" => Level::Warn,
            "ERROR" => Level::Error,
            "FATAL" => Level::Fatal,
            _ => Level::Warn,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// ERROR or more severe.
    pub fn is_error(self) -> bool {
        self >= Level::Error
    }
}

impl From<String> for Level {
    fn from(s: String) -> Self {
        Level::parse(&s)
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_level() -> Level {
    Level::Warn
}

/// One decoded log document.
///
/// `message` is required; the other fields default when the peer omits
/// them. `timestamp` is not on the wire: it records when the supervisor
/// decoded the frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub logger: String,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default = "default_level")]
    pub level: Level,
    pub message: String,
    #[serde(skip, default = "SystemTime::now")]
    pub timestamp: SystemTime,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            logger: String::new(),
            pid: 0,
            file: String::new(),
            line: 0,
            level,
            message: message.into(),
            timestamp: SystemTime::now(),
        }
    }

    /// Decode a single frame.
    pub fn decode(frame: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(frame)
    }

    /// Same origin and text, ignoring when it was received.
    pub fn same_message(&self, other: &LogRecord) -> bool {
        self.level == other.level
            && self.line == other.line
            && self.logger == other.logger
            && self.file == other.file
            && self.message == other.message
    }

    crate::setters! {
        into { logger: String, file: String }
        set { pid: u32, line: u32 }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
