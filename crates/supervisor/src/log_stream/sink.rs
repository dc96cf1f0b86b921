// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Destinations for decoded native log records.

use nctl_wire::{Level, LogRecord};

/// Receives every record the tail loop forwards.
///
/// Called from the tail task; implementations must not block.
pub trait LogSink: Send + Sync {
    fn accept(&self, record: &LogRecord);
}

/// Re-emits native records through `tracing` under the `nctl::native` target,
/// at the record's own level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn accept(&self, r: &LogRecord) {
        let (logger, pid, file, line, msg) =
            (r.logger.as_str(), r.pid, r.file.as_str(), r.line, r.message.as_str());
        match r.level {
            Level::Trace => {
                tracing::trace!(target: "nctl::native", logger, pid, file, line, "{msg}")
            }
            Level::Debug => {
                tracing::debug!(target: "nctl::native", logger, pid, file, line, "{msg}")
            }
            Level::Info => {
                tracing::info!(target: "nctl::native", logger, pid, file, line, "{msg}")
            }
            Level::Warn => {
                tracing::warn!(target: "nctl::native", logger, pid, file, line, "{msg}")
            }
            Level::Error => {
                tracing::error!(target: "nctl::native", logger, pid, file, line, "{msg}")
            }
            Level::Fatal => {
                tracing::error!(target: "nctl::native", logger, pid, file, line, fatal = true, "{msg}")
            }
        }
    }
}

/// Keeps every accepted record in memory.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct CaptureSink {
    records: parking_lot::Mutex<Vec<LogRecord>>,
}

#[cfg(any(test, feature = "test-support"))]
impl CaptureSink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.message.clone()).collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl LogSink for CaptureSink {
    fn accept(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}
