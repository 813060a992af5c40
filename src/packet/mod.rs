//! # Packet Model
//!
//! Long-header and short-header packet structures plus the wire codec.
//! `types` defines the immutable packet structures, `codec` the byte-level
//! encode/decode pair.

pub mod codec;
pub mod types;

pub use types::{LongPacket, LongPacketType, Packet, ShortPacket};
