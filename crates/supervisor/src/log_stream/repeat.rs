// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collapsing of identical consecutive log messages.
//!
//! A native process stuck in a loop can emit the same message thousands of
//! times a second. Repeats within [`REPEAT_WINDOW`] of the first occurrence
//! are counted, and a single summary record replaces them.

use std::time::Duration;

use nctl_wire::LogRecord;
use tokio::time::Instant;

pub const REPEAT_WINDOW: Duration = Duration::from_secs(10);

struct Pending {
    record: LogRecord,
    first_seen: Instant,
    repeats: usize,
}

impl Pending {
    fn into_summary(self) -> Option<LogRecord> {
        if self.repeats == 0 {
            return None;
        }
        let mut summary = self.record;
        summary.message = format!("{} | repeated [{}]", summary.message, self.repeats);
        Some(summary)
    }
}

pub struct RepeatSuppressor {
    window: Duration,
    last: Option<Pending>,
}

impl Default for RepeatSuppressor {
    fn default() -> Self {
        Self::new(REPEAT_WINDOW)
    }
}

impl RepeatSuppressor {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Records to forward, in order, after seeing `record` at `now`.
    ///
    /// Empty when `record` repeats the previous message inside the window.
    /// Otherwise the summary of any suppressed repeats comes first, then
    /// `record` itself.
    pub fn observe(&mut self, record: LogRecord, now: Instant) -> Vec<LogRecord> {
        if let Some(last) = &mut self.last {
            if last.record.same_message(&record)
                && now.saturating_duration_since(last.first_seen) < self.window
            {
                last.repeats += 1;
                return Vec::new();
            }
        }

        let mut forward = Vec::with_capacity(2);
        forward.extend(self.last.take().and_then(Pending::into_summary));
        self.last = Some(Pending { record: record.clone(), first_seen: now, repeats: 0 });
        forward.push(record);
        forward
    }

    /// Summary of repeats still pending at end of stream.
    pub fn flush(&mut self) -> Option<LogRecord> {
        self.last.take().and_then(Pending::into_summary)
    }
}

#[cfg(test)]
#[path = "repeat_tests.rs"]
mod tests;
