// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opening a set of named pipes under one deadline.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::stat::Mode;
use tokio::net::unix::pipe;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};

use super::{Channel, PipeEndpoints};
use crate::error::ControllerError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Attempts to release a read open left blocked by a timed out connect.
const RELEASE_ATTEMPTS: u32 = 50;

/// Connects to the pipes a native process listens on.
#[derive(Debug, Clone)]
pub struct PipeConnector {
    create_missing: bool,
    poll_interval: Duration,
}

impl Default for PipeConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl PipeConnector {
    pub fn new() -> Self {
        Self { create_missing: false, poll_interval: POLL_INTERVAL }
    }

    /// Create absent FIFOs instead of waiting for the peer to create them.
    /// Files created here are removed when the returned [`FifoCleanup`] drops.
    pub fn create_missing(mut self, create: bool) -> Self {
        self.create_missing = create;
        self
    }

    /// Open every declared endpoint, in accept order, within `timeout`.
    ///
    /// Each open waits for the peer until the remaining deadline runs out:
    /// write ends for a reader, read ends for a writer. On any
    /// failure, handles opened so far are dropped (closed) and created FIFOs
    /// removed before the error is returned.
    pub async fn connect(
        &self,
        endpoints: &PipeEndpoints,
        timeout: Duration,
    ) -> Result<ConnectedPipes, ControllerError> {
        let span = tracing::info_span!("pipes.connect", log = %endpoints.log.display());
        async {
            let start = Instant::now();
            let deadline = start + timeout;

            let mut cleanup = FifoCleanup::default();
            if self.create_missing {
                for (_, path) in endpoints.channels() {
                    if create_fifo(path)? {
                        debug!(path = %path.display(), "created fifo");
                        cleanup.paths.push(path.to_path_buf());
                    }
                }
            }

            let log = self.open_receiver(Channel::Log, &endpoints.log, deadline, timeout).await?;
            let command = match &endpoints.command {
                Some(path) => {
                    Some(self.open_sender(Channel::Command, path, deadline, timeout).await?)
                }
                None => None,
            };
            let data_in = match &endpoints.data_in {
                Some(path) => {
                    Some(self.open_sender(Channel::DataIn, path, deadline, timeout).await?)
                }
                None => None,
            };
            let data_out = match &endpoints.data_out {
                Some(path) => {
                    Some(self.open_receiver(Channel::DataOut, path, deadline, timeout).await?)
                }
                None => None,
            };

            let elapsed_ms = start.elapsed().as_millis() as u64;
            info!(elapsed_ms, channels = endpoints.channels().len(), "pipes connected");
            Ok::<_, ControllerError>(ConnectedPipes { log, command, data_in, data_out, cleanup })
        }
        .instrument(span)
        .await
    }

    /// The read end is ready once the peer opens the write end. The open
    /// blocks until then, so it runs on the blocking pool and races the
    /// deadline.
    async fn open_receiver(
        &self,
        channel: Channel,
        path: &Path,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<pipe::Receiver, ControllerError> {
        self.retry_until(channel, path, deadline, timeout, || std::fs::metadata(path)).await?;

        let owned = path.to_path_buf();
        let mut open = tokio::task::spawn_blocking(move || std::fs::File::open(owned));
        match tokio::time::timeout_at(deadline, &mut open).await {
            Ok(joined) => {
                let file = joined.map_err(io::Error::from)??;
                Ok(pipe::Receiver::from_file(file)?)
            }
            Err(_) => {
                warn!(path = %path.display(), ?channel, "peer did not open pipe for writing in time");
                self.release_blocked_open(path, open).await;
                Err(ControllerError::ConnectTimeout { endpoint: path.to_path_buf(), timeout })
            }
        }
    }

    /// Unblock a read open that is still waiting for a writer by briefly
    /// holding the write end ourselves.
    async fn release_blocked_open(&self, path: &Path, mut open: JoinHandle<io::Result<File>>) {
        for _ in 0..RELEASE_ATTEMPTS {
            // ENXIO here means the blocking open has not reached the kernel yet.
            let _writer = pipe::OpenOptions::new().open_sender(path);
            if tokio::time::timeout(self.poll_interval, &mut open).await.is_ok() {
                return;
            }
        }
        warn!(path = %path.display(), "blocked pipe open was not released");
    }

    /// The write end is ready once the peer holds the read end open;
    /// until then the open fails with `ENXIO`.
    async fn open_sender(
        &self,
        channel: Channel,
        path: &Path,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<pipe::Sender, ControllerError> {
        self.retry_until(channel, path, deadline, timeout, || {
            pipe::OpenOptions::new().open_sender(path)
        })
        .await
    }

    async fn retry_until<T>(
        &self,
        channel: Channel,
        path: &Path,
        deadline: Instant,
        timeout: Duration,
        open: impl Fn() -> io::Result<T>,
    ) -> Result<T, ControllerError> {
        loop {
            match open() {
                Ok(handle) => return Ok(handle),
                Err(e) if peer_not_ready(&e) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!(path = %path.display(), ?channel, "peer did not accept pipe in time");
                        return Err(ControllerError::ConnectTimeout {
                            endpoint: path.to_path_buf(),
                            timeout,
                        });
                    }
                    tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

pub(crate) fn peer_not_ready(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(Errno::ENXIO as i32)
}

/// Create a FIFO at `path`; `false` if something already exists there.
fn create_fifo(path: &Path) -> io::Result<bool> {
    match nix::unistd::mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR) {
        Ok(()) => Ok(true),
        Err(Errno::EEXIST) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Open handles for every declared endpoint.
pub struct ConnectedPipes {
    pub log: pipe::Receiver,
    pub command: Option<pipe::Sender>,
    pub data_in: Option<pipe::Sender>,
    pub data_out: Option<pipe::Receiver>,
    pub cleanup: FifoCleanup,
}

/// Removes the FIFOs this connector created, once, on drop.
#[derive(Debug, Default)]
pub struct FifoCleanup {
    paths: Vec<PathBuf>,
}

impl FifoCleanup {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for FifoCleanup {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed fifo"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove fifo"),
            }
        }
    }
}

#[cfg(test)]
#[path = "connector_tests.rs"]
mod tests;
