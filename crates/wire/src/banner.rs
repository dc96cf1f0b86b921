// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version banner contract.
//!
//! The first message a native process logs after startup identifies its
//! version and build. The pattern below is a compatibility contract between
//! supervisor and native binary: if either side changes the banner format,
//! both must change together.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Substring that marks a log record as the banner.
pub const BANNER_MARKER: &str = "Copyright";

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static BANNER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Version (.+) \(Build ([0-9a-f]+)\) Copyright")
        .expect("constant regex pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BannerError {
    #[error("native banner does not match the expected format: {0:?}")]
    Mismatch(String),
}

/// Identity of a running native process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDescriptor {
    pub pid: u32,
    pub version: String,
    pub build_hash: String,
}

impl ProcessDescriptor {
    /// Combine a pid with the version and build parsed from `banner`.
    pub fn from_banner(pid: u32, banner: &str) -> Result<Self, BannerError> {
        let (version, build_hash) = parse_banner(banner)?;
        Ok(Self { pid, version, build_hash })
    }
}

/// Extract `(version, build_hash)` from a banner message.
pub fn parse_banner(banner: &str) -> Result<(String, String), BannerError> {
    let caps =
        BANNER_PATTERN.captures(banner).ok_or_else(|| BannerError::Mismatch(banner.to_string()))?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

#[cfg(test)]
#[path = "banner_tests.rs"]
mod tests;
