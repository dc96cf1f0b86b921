// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nctl-supervisor: launches, watches and talks to native worker processes
//! over named pipes.

pub mod config;
pub mod controller;
pub mod env;
pub mod error;
pub mod log_stream;
pub mod pipes;
pub mod registry;
pub mod spawn;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::Config;
pub use controller::{ControllerOptions, ProcessController};
pub use error::ControllerError;
#[cfg(any(test, feature = "test-support"))]
pub use log_stream::CaptureSink;
pub use log_stream::{
    ErrorRingBuffer, LogSink, LogStreamHandler, StreamEnd, StreamState, StreamStats, TracingSink,
};
pub use pipes::{Channel, ConnectedPipes, PipeConnector, PipeEndpoints, PipeNaming};
pub use registry::{ControllerRegistry, RegistryState};
pub use spawn::ControllerSpawner;
