//! # Transport Error Types
//!
//! Wire-decode and dispatch errors are local to the offending packet or
//! frame: the caller drops the input with a diagnostic log and the
//! connection continues. Only `Internal` signals corrupted bookkeeping and
//! is connection-fatal.

#![forbid(unsafe_code)]

use crate::types::StreamId;
use thiserror::Error;

/// Generic result type for transport operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the transport core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Packet header could not be interpreted.
    ///
    /// Covers unknown long-header packet type bytes and nonzero reserved
    /// short-header flag bits.
    #[error("malformed packet header")]
    MalformedHeader,

    /// Packet buffer ended in the middle of a header structure.
    #[error("packet truncated mid-header")]
    TruncatedPacket,

    /// Frame could not be interpreted, or its declared length runs past
    /// the end of the payload.
    #[error("malformed frame")]
    MalformedFrame,

    /// Data transfer attempted against a stream's direction capability.
    #[error("stream {stream_id} cannot carry data in that direction")]
    InvalidStreamDirection {
        /// Stream the violation was attempted on
        stream_id: StreamId,
    },

    /// Data or a write arrived on a stream that was already reset.
    #[error("stream {stream_id} was already reset")]
    StreamAlreadyReset {
        /// Stream the frame was addressed to
        stream_id: StreamId,
    },

    /// Data or a write arrived on a stream that finished cleanly.
    #[error("stream {stream_id} is closed")]
    StreamClosed {
        /// Stream the frame was addressed to
        stream_id: StreamId,
    },

    /// Unrecoverable internal invariant violation.
    #[error("internal invariant violation: {0}")]
    Internal(&'static str),
}
