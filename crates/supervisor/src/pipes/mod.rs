// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named pipes between the supervisor and a native process.
//!
//! # Channels
//!
//! ```text
//! log       native → supervisor   JSON log documents
//! command   supervisor → native   tab/newline commands (controller only)
//! data-in   supervisor → native   job input (per-job processes only)
//! data-out  native → supervisor   job output (per-job processes only)
//! ```

mod connector;

pub use connector::{ConnectedPipes, FifoCleanup, PipeConnector};
#[cfg(any(test, feature = "test-support"))]
pub(crate) use connector::peer_not_ready;

use std::path::{Path, PathBuf};

/// A logical channel to a native process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Log,
    Command,
    DataIn,
    DataOut,
}

/// Which end of the pipe the supervisor holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl Channel {
    pub fn direction(self) -> Direction {
        match self {
            Channel::Log | Channel::DataOut => Direction::Read,
            Channel::Command | Channel::DataIn => Direction::Write,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Channel::Log => "log",
            Channel::Command => "command",
            Channel::DataIn => "input",
            Channel::DataOut => "output",
        }
    }
}

/// Paths of the pipes to open for one native process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeEndpoints {
    pub log: PathBuf,
    pub command: Option<PathBuf>,
    pub data_in: Option<PathBuf>,
    pub data_out: Option<PathBuf>,
}

impl PipeEndpoints {
    pub fn new(log: impl Into<PathBuf>) -> Self {
        Self { log: log.into(), command: None, data_in: None, data_out: None }
    }

    pub fn with_command(mut self, path: impl Into<PathBuf>) -> Self {
        self.command = Some(path.into());
        self
    }

    pub fn with_data(mut self, data_in: impl Into<PathBuf>, data_out: impl Into<PathBuf>) -> Self {
        self.data_in = Some(data_in.into());
        self.data_out = Some(data_out.into());
        self
    }

    /// Declared channels in the order the peer accepts them.
    pub fn channels(&self) -> Vec<(Channel, &Path)> {
        let mut channels = vec![(Channel::Log, self.log.as_path())];
        let optional = [
            (Channel::Command, &self.command),
            (Channel::DataIn, &self.data_in),
            (Channel::DataOut, &self.data_out),
        ];
        for (channel, path) in optional {
            if let Some(path) = path {
                channels.push((channel, path.as_path()));
            }
        }
        channels
    }
}

/// Well-known naming scheme shared with the native side.
///
/// Names embed the supervisor's pid so that several hosts on one machine
/// never collide.
#[derive(Debug, Clone)]
pub struct PipeNaming {
    dir: PathBuf,
    host_pid: u32,
}

impl PipeNaming {
    pub fn new(dir: impl Into<PathBuf>, host_pid: u32) -> Self {
        Self { dir: dir.into(), host_pid }
    }

    /// `nctl_controller_{log,command}_<pid>`
    pub fn controller(&self) -> PipeEndpoints {
        PipeEndpoints::new(self.path("nctl_controller", Channel::Log))
            .with_command(self.path("nctl_controller", Channel::Command))
    }

    /// `<program>_<job>_{log,command[,input,output]}_<pid>`
    pub fn native_process(&self, program: &str, job_id: &str, with_data: bool) -> PipeEndpoints {
        let prefix = format!("{}_{}", program, job_id);
        let endpoints = PipeEndpoints::new(self.path(&prefix, Channel::Log))
            .with_command(self.path(&prefix, Channel::Command));
        if with_data {
            endpoints
                .with_data(self.path(&prefix, Channel::DataIn), self.path(&prefix, Channel::DataOut))
        } else {
            endpoints
        }
    }

    fn path(&self, prefix: &str, channel: Channel) -> PathBuf {
        self.dir.join(format!("{}_{}_{}", prefix, channel.name(), self.host_pid))
    }
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
