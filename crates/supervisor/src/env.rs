// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the supervisor crate.

use std::path::PathBuf;
use std::time::Duration;

fn flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

fn millis(name: &str) -> Option<Duration> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

fn non_empty_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Whether the native process is used at all (default true)
pub fn use_native() -> bool {
    flag("NCTL_USE_NATIVE").unwrap_or(true)
}

/// Install root holding `bin/controller`: NCTL_HOME > current directory
pub fn home_dir() -> PathBuf {
    non_empty_path("NCTL_HOME").unwrap_or_else(|| PathBuf::from("."))
}

/// Named pipe directory: NCTL_PIPE_DIR > XDG_RUNTIME_DIR > OS temp dir
pub fn pipe_dir() -> PathBuf {
    non_empty_path("NCTL_PIPE_DIR")
        .or_else(|| non_empty_path("XDG_RUNTIME_DIR"))
        .unwrap_or_else(std::env::temp_dir)
}

/// Host log directory: NCTL_STATE_DIR > XDG_STATE_HOME/nctl > ~/.local/state/nctl
pub fn state_dir() -> PathBuf {
    if let Some(dir) = non_empty_path("NCTL_STATE_DIR") {
        return dir;
    }
    if let Some(xdg) = non_empty_path("XDG_STATE_HOME") {
        return xdg.join("nctl");
    }
    dirs::home_dir()
        .map(|h| h.join(".local/state/nctl"))
        .unwrap_or_else(|| std::env::temp_dir().join("nctl"))
}

/// Bound on connecting all pipes (default 10s)
pub fn connect_timeout() -> Duration {
    millis("NCTL_CONNECT_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

/// Bound on waiting for the pid or banner record (default 10s)
pub fn query_timeout() -> Duration {
    millis("NCTL_QUERY_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

/// Number of recent error messages kept for crash reports (default 5)
pub fn error_capacity() -> usize {
    std::env::var("NCTL_ERROR_CAPACITY")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(5)
}

/// Whether the connector creates missing FIFOs itself (default false)
pub fn create_pipes() -> bool {
    flag("NCTL_CREATE_PIPES").unwrap_or(false)
}

/// Whether nctld launches the controller binary (default false)
pub fn spawn_controller() -> bool {
    flag("NCTL_SPAWN_CONTROLLER").unwrap_or(false)
}

/// Suppress the stdout log layer in nctld
pub fn quiet() -> bool {
    flag("NCTL_QUIET").unwrap_or(false)
}
