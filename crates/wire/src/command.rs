// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command channel encoding.
//!
//! Wire format: ASCII verb, then `\t` + UTF-8 argument for each argument,
//! then a single `\n`. Tab and newline are structural, so they may not
//! appear inside the verb or any argument.

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Separates the verb and each argument.
pub const ARG_SEPARATOR: u8 = b'\t';

/// Ends one command.
pub const COMMAND_TERMINATOR: u8 = b'\n';

/// Ask the controller to start a native process.
pub const START_VERB: &str = "start";

/// Ask the controller to kill a native process it started.
pub const KILL_VERB: &str = "kill";

/// Rejected before any byte is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command verb must not be empty")]
    EmptyVerb,

    #[error("command verb must be ASCII: {0:?}")]
    NonAsciiVerb(String),

    #[error("{field} contains reserved byte {byte:#04x} at offset {offset}")]
    ReservedByte { field: String, offset: usize, byte: u8 },
}

/// A verb plus its ordered arguments, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCommand {
    verb: String,
    args: Vec<String>,
}

impl ControlCommand {
    pub fn new<I, S>(verb: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { verb: verb.into(), args: args.into_iter().map(Into::into).collect() }
    }

    /// `start` followed by the program and its arguments.
    pub fn start<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(START_VERB, args)
    }

    /// `kill` for a process previously started by the controller.
    pub fn kill(pid: u32) -> Self {
        Self::new(KILL_VERB, [pid.to_string()])
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Check the verb and every argument for reserved bytes.
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.verb.is_empty() {
            return Err(CommandError::EmptyVerb);
        }
        if !self.verb.is_ascii() {
            return Err(CommandError::NonAsciiVerb(self.verb.clone()));
        }
        check_reserved("verb", &self.verb)?;
        for (i, arg) in self.args.iter().enumerate() {
            check_reserved(&format!("argument {}", i), arg)?;
        }
        Ok(())
    }

    /// Validate, then produce the exact bytes for the wire.
    pub fn encode(&self) -> Result<EncodedCommand, CommandError> {
        self.validate()?;
        let len = self.verb.len() + self.args.iter().map(|a| a.len() + 1).sum::<usize>() + 1;
        let mut buf = Vec::with_capacity(len);
        buf.extend_from_slice(self.verb.as_bytes());
        for arg in &self.args {
            buf.push(ARG_SEPARATOR);
            buf.extend_from_slice(arg.as_bytes());
        }
        buf.push(COMMAND_TERMINATOR);
        Ok(EncodedCommand(buf))
    }
}

fn check_reserved(field: &str, value: &str) -> Result<(), CommandError> {
    match value.bytes().position(|b| b == ARG_SEPARATOR || b == COMMAND_TERMINATOR) {
        Some(offset) => Err(CommandError::ReservedByte {
            field: field.to_string(),
            offset,
            byte: value.as_bytes()[offset],
        }),
        None => Ok(()),
    }
}

/// Bytes of a command that passed validation.
///
/// Only [`ControlCommand::encode`] builds one, so anything handed to
/// [`write_command`] is known to be well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand(Vec<u8>);

impl EncodedCommand {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Encode `verb` and `args` in one step.
pub fn encode<S: AsRef<str>>(verb: &str, args: &[S]) -> Result<EncodedCommand, CommandError> {
    ControlCommand::new(verb, args.iter().map(|a| a.as_ref().to_string())).encode()
}

/// Write one encoded command and flush it.
pub async fn write_command<W>(writer: &mut W, command: &EncodedCommand) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(command.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
