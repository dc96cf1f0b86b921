// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::env;
use crate::pipes::PipeNaming;

/// Everything the supervisor needs to reach one native controller.
#[derive(Debug, Clone)]
pub struct Config {
    /// When false the registry hands out no controller at all
    pub enabled: bool,
    /// Install root; the controller binary is `<home>/bin/controller`
    pub home_dir: PathBuf,
    /// Directory holding the named pipes
    pub pipe_dir: PathBuf,
    /// Directory for the host's own log file
    pub state_dir: PathBuf,
    /// Pid embedded in pipe names (the supervisor's own by default)
    pub host_pid: u32,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
    /// Capacity of the recent-errors buffer
    pub error_capacity: usize,
    /// Create missing FIFOs instead of waiting for the peer to create them
    pub create_pipes: bool,
    /// Launch the controller binary before connecting
    pub spawn_controller: bool,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Self {
        Self {
            enabled: env::use_native(),
            home_dir: env::home_dir(),
            pipe_dir: env::pipe_dir(),
            state_dir: env::state_dir(),
            host_pid: std::process::id(),
            connect_timeout: env::connect_timeout(),
            query_timeout: env::query_timeout(),
            error_capacity: env::error_capacity(),
            create_pipes: env::create_pipes(),
            spawn_controller: env::spawn_controller(),
        }
    }

    /// Defaults rooted at `pipe_dir`, ignoring the environment.
    pub fn new(pipe_dir: impl Into<PathBuf>) -> Self {
        let pipe_dir = pipe_dir.into();
        Self {
            enabled: true,
            home_dir: PathBuf::from("."),
            state_dir: pipe_dir.clone(),
            pipe_dir,
            host_pid: std::process::id(),
            connect_timeout: Duration::from_secs(10),
            query_timeout: Duration::from_secs(10),
            error_capacity: 5,
            create_pipes: false,
            spawn_controller: false,
        }
    }

    nctl_wire::setters! {
        into { home_dir: PathBuf, state_dir: PathBuf }
        set {
            enabled: bool,
            host_pid: u32,
            connect_timeout: Duration,
            query_timeout: Duration,
            error_capacity: usize,
            create_pipes: bool,
            spawn_controller: bool,
        }
    }

    /// Pipe names for this host process.
    pub fn naming(&self) -> PipeNaming {
        PipeNaming::new(self.pipe_dir.clone(), self.host_pid)
    }

    /// Path of the native controller executable.
    pub fn controller_binary(&self) -> PathBuf {
        self.home_dir.join("bin").join("controller")
    }

    /// Path of the host log file.
    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join("nctld.log")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
