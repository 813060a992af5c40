//! # Frame Type Definitions
//!
//! All frame types this engine speaks, as a closed tagged union. Every
//! dispatch site matches exhaustively, so adding a frame type is a
//! compile-time-checked exercise.
//!
//! A frame's on-wire length is self-describing or derivable from its type
//! byte, which is what lets a payload be parsed front to back without a
//! frame count.

#![forbid(unsafe_code)]

use bytes::Bytes;
use tinyvec::TinyVec;

use crate::types::{ErrorCode, PacketNumber, StreamId, StreamOffset, VarInt};

/// Frame type byte constants.
///
/// The first byte of each frame identifies its type. STREAM frames occupy
/// the 0x10-0x17 block, with flags encoded in the low three bits.
pub const FRAME_TYPE_PADDING: u8 = 0x00;
pub const FRAME_TYPE_RST_STREAM: u8 = 0x01;
pub const FRAME_TYPE_PING: u8 = 0x07;
pub const FRAME_TYPE_PONG: u8 = 0x0d;
pub const FRAME_TYPE_ACK: u8 = 0x0e;
pub const FRAME_TYPE_STREAM_BASE: u8 = 0x10;

/// STREAM frame flag bits (low three bits of the type byte).
pub const STREAM_FRAME_BIT_FIN: u8 = 0x01;
pub const STREAM_FRAME_BIT_LEN: u8 = 0x02;
pub const STREAM_FRAME_BIT_OFF: u8 = 0x04;

/// STREAM frame: carries application data on a stream.
///
/// This is the primary data-carrying frame. `fin` marks the final byte
/// offset of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    /// Stream the data belongs to
    pub stream_id: StreamId,

    /// Byte offset of `data` within the stream
    pub offset: StreamOffset,

    /// Final frame of the stream
    pub fin: bool,

    /// Stream data
    pub data: Bytes,
}

/// RST_STREAM frame: abruptly terminates a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RstStreamFrame {
    /// Stream being reset
    pub stream_id: StreamId,

    /// Application-defined error code
    pub error_code: ErrorCode,

    /// Final offset of data sent on the stream
    pub offset: StreamOffset,
}

/// PING frame: opaque probe data the peer echoes back in a PONG.
///
/// An empty PING elicits no reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingFrame {
    /// Opaque probe payload
    pub data: Bytes,
}

impl PingFrame {
    /// Check whether this ping carries no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// PONG frame: echo of a non-empty PING's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PongFrame {
    /// Echoed probe payload
    pub data: Bytes,
}

/// One gap-encoded ACK range.
///
/// Describes a run of unacknowledged packet numbers (`gap`) followed by a
/// run of acknowledged ones (`length`), walking downward from the previous
/// range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AckRange {
    /// Unacknowledged packet numbers skipped below the previous range
    pub gap: VarInt,

    /// Acknowledged packet numbers in this range, beyond the first
    pub length: VarInt,
}

/// ACK frame: acknowledges receipt of packet numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFrame {
    /// Largest packet number being acknowledged
    pub largest_acked: PacketNumber,

    /// Time delta since the largest acknowledged packet was received
    pub ack_delay: VarInt,

    /// Acknowledged packet numbers directly below `largest_acked`
    pub first_range: VarInt,

    /// Further gap-encoded ranges, walking downward
    pub ranges: TinyVec<[AckRange; 8]>,
}

impl AckFrame {
    /// Acknowledge a single packet number.
    pub fn for_single(packet_number: PacketNumber) -> Self {
        Self {
            largest_acked: packet_number,
            ack_delay: 0,
            first_range: 0,
            ranges: TinyVec::default(),
        }
    }

    /// Acknowledge `count` contiguous packet numbers ending at `largest`.
    pub fn for_contiguous(largest: PacketNumber, count: u64) -> Self {
        Self {
            largest_acked: largest,
            ack_delay: 0,
            first_range: count.saturating_sub(1),
            ranges: TinyVec::default(),
        }
    }

    /// All acknowledged packet numbers, largest first.
    ///
    /// Walks the gap-encoded ranges downward. Ranges that would underflow
    /// terminate the walk; the parser rejects such frames, so this only
    /// guards hand-constructed values.
    pub fn acked_packet_numbers(&self) -> Vec<PacketNumber> {
        let mut acked = Vec::new();

        let Some(mut low) = self.largest_acked.checked_sub(self.first_range) else {
            return acked;
        };
        let mut high = self.largest_acked;
        acked.extend((low..=high).rev());

        for range in &self.ranges {
            let Some(next_high) = low.checked_sub(range.gap + 2) else {
                break;
            };
            let Some(next_low) = next_high.checked_sub(range.length) else {
                break;
            };
            high = next_high;
            low = next_low;
            acked.extend((low..=high).rev());
        }

        acked
    }
}

/// Unified frame type: a closed union of every frame this engine speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// PADDING (0x00); a run of padding bytes parses as one frame
    Padding,

    /// RST_STREAM (0x01)
    RstStream(RstStreamFrame),

    /// PING (0x07)
    Ping(PingFrame),

    /// PONG (0x0d)
    Pong(PongFrame),

    /// ACK (0x0e)
    Ack(AckFrame),

    /// STREAM (0x10-0x17)
    Stream(StreamFrame),
}

impl Frame {
    /// The wire type byte this frame serializes with.
    ///
    /// For STREAM frames the flag bits are folded in: LEN is always
    /// emitted, OFF only when the offset is nonzero.
    pub fn frame_type(&self) -> u8 {
        match self {
            Frame::Padding => FRAME_TYPE_PADDING,
            Frame::RstStream(_) => FRAME_TYPE_RST_STREAM,
            Frame::Ping(_) => FRAME_TYPE_PING,
            Frame::Pong(_) => FRAME_TYPE_PONG,
            Frame::Ack(_) => FRAME_TYPE_ACK,
            Frame::Stream(stream) => {
                let mut ty = FRAME_TYPE_STREAM_BASE | STREAM_FRAME_BIT_LEN;
                if stream.offset > 0 {
                    ty |= STREAM_FRAME_BIT_OFF;
                }
                if stream.fin {
                    ty |= STREAM_FRAME_BIT_FIN;
                }
                ty
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
