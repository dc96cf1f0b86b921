// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced to callers of the controller.

use std::path::PathBuf;
use std::time::Duration;

use nctl_wire::{BannerError, CommandError};
use thiserror::Error;

/// Everything that can go wrong talking to a native process.
///
/// Transport failures (connect timeout, I/O) and contract failures
/// (validation, banner mismatch) are distinct variants so callers can
/// decide on retries by matching rather than by inspecting messages.
/// Malformed log frames never appear here: they are logged and skipped.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("timed out after {timeout:?} connecting to pipe {}", endpoint.display())]
    ConnectTimeout { endpoint: PathBuf, timeout: Duration },

    #[error("invalid command: {0}")]
    Validation(#[from] CommandError),

    #[error("native binary is incompatible with this supervisor: banner {banner:?} does not match the expected format")]
    ProtocolMismatch { banner: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {timeout:?} waiting for {waiting_for}")]
    Timeout { waiting_for: &'static str, timeout: Duration },

    #[error("native log stream ended")]
    StreamEnded,

    #[error("controller closed")]
    Closed,

    #[error("cannot run command [{command}]: native controller process has stopped")]
    Stopped { command: String },

    #[error("failed to spawn native controller: {0}")]
    Spawn(String),

    #[error("native controller unavailable after failed start: {0}")]
    RegistryFailed(String),
}

impl From<BannerError> for ControllerError {
    fn from(e: BannerError) -> Self {
        match e {
            BannerError::Mismatch(banner) => ControllerError::ProtocolMismatch { banner },
        }
    }
}
