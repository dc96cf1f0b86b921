// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Most recent error messages, kept for crash reports.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Default number of messages retained.
pub const DEFAULT_ERROR_CAPACITY: usize = 5;

/// Bounded FIFO of error messages.
///
/// Written by the tail task, read by whoever reports a crash. Inserting
/// into a full buffer evicts the oldest message.
#[derive(Debug)]
pub struct ErrorRingBuffer {
    capacity: usize,
    messages: Mutex<VecDeque<String>>,
}

impl Default for ErrorRingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_CAPACITY)
    }
}

impl ErrorRingBuffer {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, messages: Mutex::new(VecDeque::new()) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, message: impl Into<String>) {
        let mut messages = self.messages.lock();
        if messages.len() == self.capacity {
            messages.pop_front();
        }
        messages.push_back(message.into());
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.messages.lock().iter().cloned().collect()
    }

    /// Snapshot joined with newlines, oldest first.
    pub fn joined(&self) -> String {
        self.snapshot().join("\n")
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
