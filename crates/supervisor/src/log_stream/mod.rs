// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tailing the log pipe of a native process.
//!
//! One task reads the pipe, splits it into frames, decodes each frame into a
//! [`LogRecord`] and routes it:
//!
//! ```text
//! pipe ─▶ LogFrameParser ─▶ LogRecord::decode ─▶ RepeatSuppressor ─▶ LogSink
//!                                  │
//!                                  ├─▶ ErrorRingBuffer   (ERROR and FATAL)
//!                                  └─▶ StreamState       (pid, banner, end)
//! ```
//!
//! Callers on other tasks block on the shared [`StreamState`] for the pid
//! or the version banner. Ending the stream, for whatever reason, releases
//! every waiter with a definitive answer.

mod repeat;
mod ring;
mod sink;

pub use repeat::{RepeatSuppressor, REPEAT_WINDOW};
pub use ring::{ErrorRingBuffer, DEFAULT_ERROR_CAPACITY};
#[cfg(any(test, feature = "test-support"))]
pub use sink::CaptureSink;
pub use sink::{LogSink, TracingSink};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nctl_wire::{Level, LogFrameParser, LogRecord, BANNER_MARKER};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ControllerError;

/// Bytes requested per read from the log pipe.
const READ_CHUNK: usize = 8 * 1024;

/// Why the tail loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The peer closed its end; it has exited.
    Eof,
    /// The supervisor closed the stream.
    Closed,
    /// Reading the pipe failed.
    Failed,
}

/// What the tail loop has learned so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    pub pid: Option<u32>,
    pub banner: Option<String>,
    pub ended: Option<StreamEnd>,
}

/// Counters maintained by the tail loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Frames decoded into records
    pub records: u64,
    /// Frames skipped because they did not decode
    pub malformed: u64,
    /// Records folded into a repeat summary instead of being forwarded
    pub suppressed: u64,
}

struct Inner {
    state: watch::Sender<StreamState>,
    errors: ErrorRingBuffer,
    sink: Arc<dyn LogSink>,
    seen_fatal: AtomicBool,
    records: AtomicU64,
    malformed: AtomicU64,
    suppressed: AtomicU64,
}

/// Shared handle to one log stream. Clones observe the same stream.
#[derive(Clone)]
pub struct LogStreamHandler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LogStreamHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStreamHandler")
            .field("state", &*self.inner.state.borrow())
            .field("stats", &self.stats())
            .finish()
    }
}

impl LogStreamHandler {
    pub fn new(error_capacity: usize, sink: Arc<dyn LogSink>) -> Self {
        let (state, _) = watch::channel(StreamState::default());
        Self {
            inner: Arc::new(Inner {
                state,
                errors: ErrorRingBuffer::new(error_capacity),
                sink,
                seen_fatal: AtomicBool::new(false),
                records: AtomicU64::new(0),
                malformed: AtomicU64::new(0),
                suppressed: AtomicU64::new(0),
            }),
        }
    }

    /// Run [`tail_stream`](Self::tail_stream) on its own task.
    pub fn spawn<R>(&self, reader: R, cancel: CancellationToken) -> JoinHandle<StreamEnd>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let handler = self.clone();
        tokio::spawn(async move { handler.tail_stream(reader, cancel).await })
    }

    /// Read `reader` until end of stream, a read error, or `cancel`.
    ///
    /// Malformed frames are logged and skipped; nothing that arrives on the
    /// pipe stops the loop early.
    pub async fn tail_stream<R>(&self, mut reader: R, cancel: CancellationToken) -> StreamEnd
    where
        R: AsyncRead + Unpin,
    {
        let mut tail = Tail::new(&self.inner);
        let mut buf = vec![0u8; READ_CHUNK];

        let end = loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => break StreamEnd::Closed,
                read = reader.read(&mut buf) => read,
            };
            match read {
                Ok(0) => break StreamEnd::Eof,
                Ok(n) => {
                    for frame in tail.parser.feed(&buf[..n]) {
                        tail.frame(&frame);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed reading native log stream");
                    break StreamEnd::Failed;
                }
            }
        };

        if end != StreamEnd::Closed {
            if let Some(rest) = tail.parser.finish() {
                tail.frame(&rest);
            }
        }
        if let Some(summary) = tail.suppressor.flush() {
            self.inner.sink.accept(&summary);
        }

        match end {
            StreamEnd::Closed => debug!("native log stream closed"),
            _ => info!(?end, "native log stream ended, no new processes can be started"),
        }
        self.mark_ended(end);
        end
    }

    /// Pid of the native process, waiting up to `timeout` for it to be logged.
    pub async fn await_pid(&self, timeout: Duration) -> Result<u32, ControllerError> {
        self.wait_until(timeout, "native process pid", |s| s.pid).await
    }

    /// First banner message, waiting up to `timeout` for it to be logged.
    pub async fn await_version_banner(&self, timeout: Duration) -> Result<String, ControllerError> {
        self.wait_until(timeout, "native version banner", |s| s.banner.clone()).await
    }

    /// Wait, without bound, for the tail loop to stop.
    pub async fn ended(&self) -> StreamEnd {
        let mut rx = self.inner.state.subscribe();
        rx.wait_for(|s| s.ended.is_some())
            .await
            .ok()
            .and_then(|state| state.ended)
            .unwrap_or(StreamEnd::Closed)
    }

    /// Wait for the tail loop to stop.
    pub async fn wait_for_stream_end(&self, timeout: Duration) -> Result<StreamEnd, ControllerError> {
        let mut rx = self.inner.state.subscribe();
        let wait = async {
            let state = rx.wait_for(|s| s.ended.is_some()).await.map_err(|_| ControllerError::Closed)?;
            state.ended.ok_or(ControllerError::Closed)
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ControllerError::Timeout { waiting_for: "native log stream end", timeout })?
    }

    /// Mark the stream closed by the supervisor, failing blocked queries
    /// with [`ControllerError::Closed`]. Has no effect once the stream ended.
    pub fn mark_closed(&self) {
        self.mark_ended(StreamEnd::Closed);
    }

    /// Recent ERROR and FATAL messages, oldest first, one per line.
    pub fn errors(&self) -> String {
        self.inner.errors.joined()
    }

    pub fn error_buffer(&self) -> &ErrorRingBuffer {
        &self.inner.errors
    }

    pub fn state(&self) -> StreamState {
        self.inner.state.borrow().clone()
    }

    pub fn has_stream_ended(&self) -> bool {
        self.inner.state.borrow().ended.is_some()
    }

    pub fn seen_fatal(&self) -> bool {
        self.inner.seen_fatal.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            records: self.inner.records.load(Ordering::Relaxed),
            malformed: self.inner.malformed.load(Ordering::Relaxed),
            suppressed: self.inner.suppressed.load(Ordering::Relaxed),
        }
    }

    fn mark_ended(&self, end: StreamEnd) {
        self.inner.state.send_if_modified(|s| {
            if s.ended.is_some() {
                return false;
            }
            s.ended = Some(end);
            true
        });
    }

    /// Wait until `extract` yields a value or the stream ends.
    ///
    /// A value already learned is returned even after the stream ended.
    async fn wait_until<T>(
        &self,
        timeout: Duration,
        waiting_for: &'static str,
        extract: impl Fn(&StreamState) -> Option<T>,
    ) -> Result<T, ControllerError> {
        let mut rx = self.inner.state.subscribe();
        let wait = async {
            let state = rx
                .wait_for(|s| s.ended.is_some() || extract(s).is_some())
                .await
                .map_err(|_| ControllerError::Closed)?;
            if let Some(value) = extract(&state) {
                return Ok(value);
            }
            Err(match state.ended {
                Some(StreamEnd::Closed) => ControllerError::Closed,
                _ => ControllerError::StreamEnded,
            })
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ControllerError::Timeout { waiting_for, timeout })?
    }
}

/// Per-run state of the tail loop.
struct Tail<'a> {
    inner: &'a Inner,
    parser: LogFrameParser,
    suppressor: RepeatSuppressor,
    pid_mismatch_logged: bool,
}

impl<'a> Tail<'a> {
    fn new(inner: &'a Inner) -> Self {
        Self {
            inner,
            parser: LogFrameParser::new(),
            suppressor: RepeatSuppressor::default(),
            pid_mismatch_logged: false,
        }
    }

    fn frame(&mut self, frame: &[u8]) {
        let frame = frame.trim_ascii();
        if frame.is_empty() {
            return;
        }

        let record = match LogRecord::decode(frame) {
            Ok(record) => record,
            Err(e) => {
                self.inner.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    frame = %String::from_utf8_lossy(frame),
                    "skipping malformed native log frame"
                );
                return;
            }
        };
        self.inner.records.fetch_add(1, Ordering::Relaxed);

        if record.level.is_error() {
            self.inner.errors.push(record.message.clone());
        }
        if record.level == Level::Fatal {
            self.inner.seen_fatal.store(true, Ordering::Relaxed);
        }
        self.observe(&record);

        let forward = self.suppressor.observe(record, Instant::now());
        if forward.is_empty() {
            self.inner.suppressed.fetch_add(1, Ordering::Relaxed);
        }
        for record in &forward {
            self.inner.sink.accept(record);
        }
    }

    /// Pick up the pid and banner the first time they appear.
    fn observe(&mut self, record: &LogRecord) {
        let mut mismatch = None;
        self.inner.state.send_if_modified(|s| {
            let mut changed = false;
            match s.pid {
                None if record.pid != 0 => {
                    s.pid = Some(record.pid);
                    changed = true;
                }
                Some(pid) if record.pid != 0 && record.pid != pid => mismatch = Some(pid),
                _ => {}
            }
            if s.banner.is_none() && record.message.contains(BANNER_MARKER) {
                s.banner = Some(record.message.clone());
                changed = true;
            }
            changed
        });

        if let Some(expected) = mismatch {
            if !self.pid_mismatch_logged {
                self.pid_mismatch_logged = true;
                warn!(expected, got = record.pid, "native log record from unexpected pid");
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
