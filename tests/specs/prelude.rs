// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared setup for the specs.

pub use nctl_supervisor::test_support::FakePeer;
pub use nctl_supervisor::{
    Config, ControllerError, ControllerRegistry, ProcessController, RegistryState, StreamEnd,
};
pub use nctl_wire::Level;
pub use std::time::Duration;

use tempfile::TempDir;

/// Pid embedded in pipe names.
pub const HOST_PID: u32 = 1000;
/// Pid the fake controller reports in its log.
pub const PEER_PID: u32 = 4242;

const TIMEOUT: Duration = Duration::from_secs(5);

/// A pipe directory plus a config pointing at it.
pub struct Harness {
    pub dir: TempDir,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path())
            .host_pid(HOST_PID)
            .create_pipes(true)
            .connect_timeout(TIMEOUT)
            .query_timeout(TIMEOUT);
        Self { dir, config }
    }

    /// Accept as the native controller while the supervisor connects.
    pub async fn accept_peer(&self) -> FakePeer {
        let endpoints = self.config.naming().controller();
        FakePeer::accept(&endpoints, PEER_PID, TIMEOUT).await.unwrap()
    }

    /// Connect a controller and its fake peer to each other.
    pub async fn connect(&self) -> (ProcessController, FakePeer) {
        let (controller, peer) =
            tokio::join!(ProcessController::connect(&self.config), self.accept_peer());
        (controller.unwrap(), peer)
    }
}
