// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One connection to a native controller process.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nctl_wire::{write_command, ControlCommand, ProcessDescriptor};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ControllerError;
use crate::log_stream::{LogSink, LogStreamHandler, StreamEnd, TracingSink};
use crate::pipes::{ConnectedPipes, FifoCleanup, PipeConnector, PipeEndpoints};

/// How long `close` waits for the command lock and the tail task.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

type CommandWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Knobs for a controller connection.
#[derive(Clone)]
pub struct ControllerOptions {
    pub query_timeout: Duration,
    pub error_capacity: usize,
    pub sink: Arc<dyn LogSink>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(10),
            error_capacity: crate::log_stream::DEFAULT_ERROR_CAPACITY,
            sink: Arc::new(TracingSink),
        }
    }
}

impl ControllerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            query_timeout: config.query_timeout,
            error_capacity: config.error_capacity,
            ..Self::default()
        }
    }

    nctl_wire::setters! {
        set { query_timeout: Duration, error_capacity: usize, sink: Arc<dyn LogSink> }
    }
}

/// Talks to one native controller: queries its identity, asks it to start
/// processes, and keeps the tail of its log.
///
/// All methods take `&self` and are safe to call from many tasks at once.
/// Commands are written under an exclusive lock so concurrent callers never
/// interleave bytes on the command pipe.
pub struct ProcessController {
    log_stream: LogStreamHandler,
    command: tokio::sync::Mutex<Option<CommandWriter>>,
    tail: Mutex<Option<JoinHandle<StreamEnd>>>,
    cancel: CancellationToken,
    query_timeout: Duration,
    info: OnceCell<ProcessDescriptor>,
    fifos: Mutex<Option<FifoCleanup>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ProcessController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessController")
            .field("log_stream", &self.log_stream)
            .field("info", &self.info.get())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ProcessController {
    /// Connect to the controller pipes named by `config`.
    pub async fn connect(config: &Config) -> Result<Self, ControllerError> {
        let connector = PipeConnector::new().create_missing(config.create_pipes);
        Self::connect_to(
            &config.naming().controller(),
            &connector,
            config.connect_timeout,
            ControllerOptions::from_config(config),
        )
        .await
    }

    /// Connect to explicit endpoints. `endpoints` must declare a command pipe.
    pub async fn connect_to(
        endpoints: &PipeEndpoints,
        connector: &PipeConnector,
        connect_timeout: Duration,
        options: ControllerOptions,
    ) -> Result<Self, ControllerError> {
        let ConnectedPipes { log, command, cleanup, .. } =
            connector.connect(endpoints, connect_timeout).await?;
        let command = command.ok_or_else(|| {
            ControllerError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "controller endpoints have no command pipe",
            ))
        })?;

        let controller = Self::from_streams(log, command, options);
        *controller.fifos.lock() = Some(cleanup);
        Ok(controller)
    }

    /// Build a controller over an arbitrary log reader and command writer,
    /// and start tailing the log. Must be called within a tokio runtime.
    pub fn from_streams<R, W>(log: R, command: W, options: ControllerOptions) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let log_stream = LogStreamHandler::new(options.error_capacity, options.sink);
        let cancel = CancellationToken::new();
        let tail = log_stream.spawn(log, cancel.clone());

        Self {
            log_stream,
            command: tokio::sync::Mutex::new(Some(Box::new(command))),
            tail: Mutex::new(Some(tail)),
            cancel,
            query_timeout: options.query_timeout,
            info: OnceCell::new(),
            fifos: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Pid of the native controller, as reported in its log.
    pub async fn pid(&self) -> Result<u32, ControllerError> {
        self.log_stream.await_pid(self.query_timeout).await
    }

    /// Version and build of the native controller, parsed from its banner.
    ///
    /// A banner that does not match the expected format means the native
    /// binary comes from an incompatible build; that is reported as
    /// [`ControllerError::ProtocolMismatch`] and is not worth retrying.
    ///
    /// The pid and the banner share one `query_timeout`.
    pub async fn native_code_info(&self) -> Result<ProcessDescriptor, ControllerError> {
        let timeout = self.query_timeout;
        self.info
            .get_or_try_init(|| async move {
                let identity = async {
                    let pid = self.log_stream.await_pid(timeout).await?;
                    let banner = self.log_stream.await_version_banner(timeout).await?;
                    Ok::<_, ControllerError>((pid, banner))
                };
                let (pid, banner) = tokio::time::timeout(timeout, identity).await.map_err(|_| {
                    ControllerError::Timeout { waiting_for: "native code info", timeout }
                })??;
                ProcessDescriptor::from_banner(pid, &banner).map_err(|e| {
                    error!(banner = %banner, "native banner has an unexpected format");
                    ControllerError::from(e)
                })
            })
            .await
            .cloned()
    }

    /// Ask the controller to start a process with `args`.
    pub async fn start_process<I, S>(&self, args: I) -> Result<(), ControllerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_command(&ControlCommand::start(args)).await
    }

    /// Ask the controller to kill a process it started.
    pub async fn kill_process(&self, pid: u32) -> Result<(), ControllerError> {
        self.send_command(&ControlCommand::kill(pid)).await
    }

    /// Validate, encode and write one command.
    ///
    /// Validation happens before any I/O, so a rejected command writes
    /// nothing. Once the log stream has ended the controller process is
    /// gone and every command fails with [`ControllerError::Stopped`].
    pub async fn send_command(&self, command: &ControlCommand) -> Result<(), ControllerError> {
        let encoded = command.encode()?;

        if self.is_closed() {
            return Err(ControllerError::Closed);
        }
        if self.log_stream.has_stream_ended() {
            return Err(ControllerError::Stopped { command: describe(command) });
        }

        let mut writer = self.command.lock().await;
        let writer = writer.as_mut().ok_or(ControllerError::Closed)?;
        write_command(writer, &encoded).await?;
        debug!(verb = command.verb(), args = command.args().len(), "sent command to native controller");
        Ok(())
    }

    /// Recent ERROR and FATAL messages from the native log, one per line.
    pub fn errors(&self) -> String {
        self.log_stream.errors()
    }

    pub fn log_stream(&self) -> &LogStreamHandler {
        &self.log_stream
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release the pipes and stop the tail task. Idempotent.
    ///
    /// Queries blocked in [`pid`](Self::pid) or
    /// [`native_code_info`](Self::native_code_info) fail with
    /// [`ControllerError::Closed`].
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.log_stream.mark_closed();
        self.cancel.cancel();

        match tokio::time::timeout(CLOSE_GRACE, self.command.lock()).await {
            Ok(mut writer) => drop(writer.take()),
            Err(_) => warn!("command pipe still busy at close"),
        }

        let tail = self.tail.lock().take();
        if let Some(tail) = tail {
            match tokio::time::timeout(CLOSE_GRACE, tail).await {
                Ok(Ok(end)) => debug!(?end, "log tail stopped"),
                Ok(Err(e)) => warn!(error = %e, "log tail task failed"),
                Err(_) => warn!("log tail did not stop in time"),
            }
        }

        drop(self.fifos.lock().take());
        info!("native controller connection closed");
    }
}

impl Drop for ProcessController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn describe(command: &ControlCommand) -> String {
    let mut parts = vec![command.verb()];
    parts.extend(command.args().iter().map(String::as_str));
    parts.join(" ")
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
