//! Codec layer: one compression format (Zstandard), two directions.
//!
//! # Format
//! Every object is exactly one zstd frame.  The frame carries its own magic
//! and end-of-frame marker, so stream completion is detected by the codec
//! library and never re-implemented here.  No format negotiation is ever
//! performed: a decoder either recognises the frame or fails.
//!
//! # Determinism
//! Object names are digests of the compressed bytes, so the encoder must
//! be a pure function of (input bytes, [`CodecConfig`]).  Sessions are
//! single-threaded and use a fixed level; the same input chunked the same
//! way always yields the same frame.
//!
//! [`CodecConfig`]: crate::config::CodecConfig

use std::collections::TryReserveError;
use std::fmt;
use std::io;

use thiserror::Error;

use crate::digest::ContentHash;

pub mod session;

pub use session::CodecSession;

// ── Direction ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Compress,
    Decompress,
}

impl Direction {
    /// Human-readable name (for diagnostics only — never parsed).
    pub fn name(self) -> &'static str {
        match self {
            Direction::Compress   => "compress",
            Direction::Decompress => "decompress",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Phase ────────────────────────────────────────────────────────────────────

/// Lifecycle state of a [`CodecSession`].
///
/// A session is born `Active`; construction failure never yields a session.
/// `Finished` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    /// The codec reported the end of the frame.
    Finished,
    /// A push failed; codec state is undefined and no input is accepted.
    Failed,
}

// ── StreamOutcome ────────────────────────────────────────────────────────────

/// Result of pushing one input chunk through a session.
/// Errors travel in the `Err` arm and are always terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Input consumed, frame not yet complete.
    Continue,
    /// The frame is complete and fully drained to the sink.
    End,
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Codec setup failed: {0}")]
    Setup(String),
    #[error("Stream error: {0}")]
    Stream(String),
    /// The source ran dry before the decoder saw the end of the frame.
    #[error("Input exhausted before the end of the compressed stream")]
    IncompleteStream,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Output buffer allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
    /// A fetched object's compressed bytes do not hash to the name it was
    /// requested under.
    #[error("Digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: ContentHash, actual: ContentHash },
    #[error("Session is {phase:?} and accepts no further input")]
    InvalidState { phase: Phase },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CodecError {
    /// True for the variants that mean "these bytes are not a valid
    /// object", as opposed to an environment failure.
    pub fn is_corrupt_input(&self) -> bool {
        matches!(
            self,
            CodecError::Stream(_) | CodecError::IncompleteStream | CodecError::DigestMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_input_classification() {
        assert!(CodecError::IncompleteStream.is_corrupt_input());
        assert!(CodecError::Stream("bad magic".into()).is_corrupt_input());
        let io = CodecError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!io.is_corrupt_input());
    }

    #[test]
    fn direction_names() {
        assert_eq!(Direction::Compress.to_string(), "compress");
        assert_eq!(Direction::Decompress.to_string(), "decompress");
    }
}
