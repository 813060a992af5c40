//! # Packet Payload
//!
//! An ordered sequence of frames carried by one packet. Order is
//! significant for delivery semantics (a reset is logically ordered after
//! preceding stream data), so parsing and writing both preserve it.

#![forbid(unsafe_code)]

use bytes::BytesMut;

use crate::error::Result;
use crate::frames::Frame;

/// Ordered sequence of frames carried by one packet.
///
/// Equality is frame-sequence equality, order-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    frames: Vec<Frame>,
}

impl Payload {
    /// The valid empty payload.
    pub const EMPTY: Payload = Payload { frames: Vec::new() };

    /// Create a payload from frames, preserving order.
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Parse a payload by repeatedly parsing frames from the front of
    /// `buf` until no bytes remain.
    ///
    /// A zero-length remainder after a complete frame terminates parsing
    /// successfully; a remainder that cannot be interpreted as a further
    /// frame signals `MalformedFrame`.
    pub fn parse(buf: &[u8]) -> Result<Payload> {
        let mut frames = Vec::new();
        let mut offset = 0;
        while offset < buf.len() {
            let (frame, consumed) = Frame::parse(&buf[offset..])?;
            frames.push(frame);
            offset += consumed;
        }
        Ok(Payload { frames })
    }

    /// Append each contained frame's encoding to `out`, in list order.
    pub fn write(&self, out: &mut BytesMut) -> Result<()> {
        for frame in &self.frames {
            frame.write(out)?;
        }
        Ok(())
    }

    /// The contained frames, in order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Return a new payload with `frame` appended.
    pub fn add_frame(&self, frame: Frame) -> Payload {
        let mut frames = self.frames.clone();
        frames.push(frame);
        Payload { frames }
    }

    /// Number of contained frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check whether the payload contains no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
