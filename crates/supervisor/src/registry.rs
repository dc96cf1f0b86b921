// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide native controller.
//!
//! ```text
//! Uninitialized ──▶ Connecting ──▶ Ready
//!                        │
//!                        └───────▶ Failed   (terminal)
//! ```

use std::future::Future;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::controller::ProcessController;
use crate::error::ControllerError;

static GLOBAL: LazyLock<ControllerRegistry> = LazyLock::new(ControllerRegistry::new);

/// Observable registry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryState {
    Uninitialized,
    Connecting,
    Ready,
    Failed(String),
}

enum Slot {
    Uninitialized,
    Connecting,
    Ready(Arc<ProcessController>),
    Failed(String),
}

/// Holds at most one [`ProcessController`], created on first demand.
///
/// Concurrent first callers queue on an async lock; only the winner runs
/// the initializer, the rest receive its result.
pub struct ControllerRegistry {
    slot: Mutex<Slot>,
    init: tokio::sync::Mutex<()>,
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self { slot: Mutex::new(Slot::Uninitialized), init: tokio::sync::Mutex::new(()) }
    }

    /// The registry shared by the whole host process.
    pub fn global() -> &'static ControllerRegistry {
        &GLOBAL
    }

    /// The controller described by `config`, connecting on first use.
    ///
    /// `Ok(None)` when native processes are disabled: running without a
    /// native controller is a supported mode, not an error.
    pub async fn get(
        &self,
        config: &Config,
    ) -> Result<Option<Arc<ProcessController>>, ControllerError> {
        if !config.enabled {
            debug!("native controller disabled by configuration");
            return Ok(None);
        }
        self.get_or_init_with(|| ProcessController::connect(config)).await.map(Some)
    }

    /// The cached controller, or the result of running `init` once.
    ///
    /// If `init` fails the registry is failed for good: later calls return
    /// [`ControllerError::RegistryFailed`] without retrying.
    pub async fn get_or_init_with<F, Fut>(
        &self,
        init: F,
    ) -> Result<Arc<ProcessController>, ControllerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ProcessController, ControllerError>>,
    {
        if let Some(controller) = self.cached()? {
            return Ok(controller);
        }

        let _init = self.init.lock().await;
        if let Some(controller) = self.cached()? {
            return Ok(controller);
        }

        *self.slot.lock() = Slot::Connecting;
        match init().await {
            Ok(controller) => {
                let controller = Arc::new(controller);
                *self.slot.lock() = Slot::Ready(controller.clone());
                info!("native controller ready");
                Ok(controller)
            }
            Err(e) => {
                error!(error = %e, "native controller failed to start");
                *self.slot.lock() = Slot::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn state(&self) -> RegistryState {
        match &*self.slot.lock() {
            Slot::Uninitialized => RegistryState::Uninitialized,
            Slot::Connecting => RegistryState::Connecting,
            Slot::Ready(_) => RegistryState::Ready,
            Slot::Failed(reason) => RegistryState::Failed(reason.clone()),
        }
    }

    /// Close the cached controller, if any. Called on host shutdown.
    pub async fn shutdown(&self) {
        let controller = match &*self.slot.lock() {
            Slot::Ready(controller) => Some(controller.clone()),
            _ => None,
        };
        if let Some(controller) = controller {
            controller.close().await;
        }
    }

    fn cached(&self) -> Result<Option<Arc<ProcessController>>, ControllerError> {
        match &*self.slot.lock() {
            Slot::Ready(controller) => Ok(Some(controller.clone())),
            Slot::Failed(reason) => Err(ControllerError::RegistryFailed(reason.clone())),
            Slot::Uninitialized | Slot::Connecting => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
