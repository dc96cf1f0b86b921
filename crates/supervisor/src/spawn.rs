// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launching the native controller binary.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::info;

use crate::config::Config;
use crate::error::ControllerError;
use crate::pipes::PipeEndpoints;

/// Only variable passed through to the controller.
pub const HOME_ENV: &str = "NCTL_HOME";

/// Starts `<home>/bin/controller` wired to a set of pipes.
///
/// The child runs in a cleared environment holding only [`HOME_ENV`], with
/// stdin closed. It is killed if the returned [`Child`] is dropped.
#[derive(Debug, Clone)]
pub struct ControllerSpawner {
    binary: PathBuf,
    home: PathBuf,
}

impl ControllerSpawner {
    pub fn new(binary: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into(), home: home.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.controller_binary(), config.home_dir.clone())
    }

    /// Pipe arguments understood by the controller.
    pub fn args(endpoints: &PipeEndpoints) -> Vec<String> {
        let mut args = vec![format!("--logPipe={}", endpoints.log.display())];
        if let Some(command) = &endpoints.command {
            args.push(format!("--commandPipe={}", command.display()));
        }
        args
    }

    pub fn command(&self, endpoints: &PipeEndpoints) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::args(endpoints))
            .env_clear()
            .env(HOME_ENV, &self.home)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    pub fn spawn(&self, endpoints: &PipeEndpoints) -> Result<Child, ControllerError> {
        let child = self.command(endpoints).spawn().map_err(|e| {
            ControllerError::Spawn(format!("{}: {}", self.binary.display(), e))
        })?;
        info!(binary = %self.binary.display(), pid = ?child.id(), "spawned native controller");
        Ok(child)
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
