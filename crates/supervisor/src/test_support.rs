// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scripted stand-in for the native controller, for tests.

use std::io;
use std::path::Path;
use std::time::Duration;

use nctl_wire::{Level, LogRecord};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::pipe;
use tokio::time::Instant;

use crate::pipes::{peer_not_ready, PipeEndpoints};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The native end of a controller's pipes.
///
/// Holds the write end of the log pipe and the read end of the command
/// pipe. Dropping the peer closes both, which the supervisor sees as the
/// controller exiting.
pub struct FakePeer {
    pid: u32,
    log: pipe::Sender,
    command: BufReader<pipe::Receiver>,
}

impl FakePeer {
    /// Open the peer side of `endpoints`, waiting up to `timeout` for the
    /// FIFOs to exist and for the supervisor to open the log pipe.
    pub async fn accept(endpoints: &PipeEndpoints, pid: u32, timeout: Duration) -> io::Result<Self> {
        let deadline = Instant::now() + timeout;
        let command_path = endpoints.command.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "endpoints have no command pipe")
        })?;

        let command =
            retry(command_path, deadline, || pipe::OpenOptions::new().open_receiver(command_path))
                .await?;
        let log =
            retry(&endpoints.log, deadline, || pipe::OpenOptions::new().open_sender(&endpoints.log))
                .await?;

        Ok(Self { pid, log, command: BufReader::new(command) })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Write one log record stamped with this peer's pid.
    pub async fn log(&mut self, level: Level, message: &str) -> io::Result<()> {
        let record = LogRecord::new(level, message)
            .logger("controller")
            .pid(self.pid)
            .file("Main.cc")
            .line(1);
        let mut frame = serde_json::to_vec(&record)?;
        frame.push(nctl_wire::FRAME_SEPARATOR);
        self.write_raw(&frame).await
    }

    /// Write the startup banner.
    pub async fn banner(&mut self, version: &str, build_hash: &str) -> io::Result<()> {
        let message = format!(
            "controller (64 bit): Version {version} (Build {build_hash}) Copyright (c) 2026"
        );
        self.log(Level::Info, &message).await
    }

    pub async fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.log.write_all(bytes).await?;
        self.log.flush().await
    }

    /// Next command line without its terminator; `None` once the supervisor
    /// closed the command pipe.
    pub async fn read_command(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.command.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(Some(line))
    }
}

async fn retry<T>(
    path: &Path,
    deadline: Instant,
    open: impl Fn() -> io::Result<T>,
) -> io::Result<T> {
    loop {
        match open() {
            Err(e) if peer_not_ready(&e) && Instant::now() < deadline => {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            Err(e) if peer_not_ready(&e) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("supervisor never opened {}", path.display()),
                ));
            }
            result => return result,
        }
    }
}
