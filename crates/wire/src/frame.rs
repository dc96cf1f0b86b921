// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Separator framing for the native log stream.
//!
//! The peer writes compact JSON documents back to back with one
//! [`FRAME_SEPARATOR`] between them. There is no length prefix, so a read
//! from the pipe can end anywhere: mid-document, exactly on a separator, or
//! after several documents. [`LogFrameParser`] carries the unterminated tail
//! over to the next read.

/// Byte that terminates each frame on the log stream.
///
/// A conforming JSON serializer escapes control characters inside strings,
/// so a raw `\n` never appears inside a compact document.
pub const FRAME_SEPARATOR: u8 = b'\n';

/// Split `buf` into complete frames and the unterminated remainder.
///
/// Each byte range that ends at a separator is one frame (the separator is
/// not included). Bytes after the last separator are returned as the
/// remainder. Empty input, or input without a separator, yields no frames
/// and the whole input as remainder.
pub fn split_frames(buf: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut frames = Vec::new();
    let mut start = 0;
    while let Some(offset) = buf[start..].iter().position(|&b| b == FRAME_SEPARATOR) {
        frames.push(&buf[start..start + offset]);
        start += offset + 1;
    }
    (frames, &buf[start..])
}

/// Incremental frame splitter for a stream read in arbitrary chunks.
#[derive(Debug, Default)]
pub struct LogFrameParser {
    pending: Vec<u8>,
}

impl LogFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk read from the stream.
    ///
    /// Returns every frame completed by this chunk, in stream order. The
    /// carried-over remainder never contains a separator, so only the new
    /// chunk is scanned.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let (frames, rest) = split_frames(chunk);
        let mut out = Vec::with_capacity(frames.len());
        let mut frames = frames.into_iter();
        if let Some(first) = frames.next() {
            let mut head = std::mem::take(&mut self.pending);
            head.extend_from_slice(first);
            out.push(head);
            out.extend(frames.map(<[u8]>::to_vec));
        }
        self.pending.extend_from_slice(rest);
        out
    }

    /// Bytes received since the last separator.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Flush the remainder at end of stream.
    ///
    /// A peer that exits without writing a trailing separator still gets its
    /// last document decoded.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
