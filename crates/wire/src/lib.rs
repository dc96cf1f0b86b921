// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol spoken between the supervisor and a native process.
//!
//! Two channels, two framings:
//!
//! - log stream (peer → supervisor): compact JSON documents separated by a
//!   single `\n` byte, no length prefix
//! - command channel (supervisor → peer): `verb\targ\targ\n`

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod banner;
mod command;
mod frame;
mod macros;
mod record;

pub use banner::{parse_banner, BannerError, ProcessDescriptor, BANNER_MARKER};
pub use command::{
    encode, write_command, CommandError, ControlCommand, EncodedCommand, ARG_SEPARATOR,
    COMMAND_TERMINATOR, KILL_VERB, START_VERB,
};
pub use frame::{split_frames, LogFrameParser, FRAME_SEPARATOR};
pub use record::{Level, LogRecord};
