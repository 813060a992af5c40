//! # quiver: QUIC-family Transport Protocol Engine
//!
//! Frames application data into versioned packets, multiplexes it over
//! logical streams, tracks acknowledgment and retransmission state per
//! connection, and drives a connection through a handshake-to-established
//! state machine over an unreliable, unordered datagram substrate.
//!
//! # Architecture
//!
//! - **Closed frame and packet sum types**: every dispatch site matches
//!   exhaustively, so adding a wire type is compile-time checked
//! - **Per-connection exclusive state**: no cross-connection shared
//!   mutable state; each connection's bookkeeping sits behind its own
//!   locks and inbound processing is serialized
//! - **Fire-and-forget outbound path**: protocol logic never blocks on
//!   network I/O; transmission is delegated to a [`PacketSink`]
//! - **Boundary traits at the seams**: the datagram transport binding
//!   ([`PacketSink`]) and the application delivery surface
//!   ([`StreamListener`]) are supplied by the embedder
//!
//! # Module Organization
//!
//! - `types`: varint codec, connection ids, packet numbers, stream ids
//! - `packet`: long/short header packet model and wire codec
//! - `frames`: frame model and wire codec
//! - `payload`: ordered frame sequence carried by one packet
//! - `buffer`: sent-packet bookkeeping, ack processing, retransmit hook
//! - `stream`: stream set, reassembly, direction capabilities, resets
//! - `connection`: top-level driver and handshake state machine
//!
//! Payload protection, the UDP binding, and the HTTP mapping layer are
//! external collaborators and intentionally absent here.

#![forbid(unsafe_code)]

pub mod buffer;
pub mod connection;
pub mod error;
pub mod frames;
pub mod packet;
pub mod payload;
pub mod stream;
pub mod types;

pub use buffer::{PacketBuffer, PacketSink, SentRecord};
pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use error::{Error, Result};
pub use frames::{AckFrame, Frame, PingFrame, PongFrame, RstStreamFrame, StreamFrame};
pub use packet::{LongPacket, LongPacketType, Packet, ShortPacket};
pub use payload::Payload;
pub use stream::{Stream, StreamListener, Streams};
pub use types::{
    ConnectionId, ErrorCode, PacketNumber, StreamId, StreamOffset, StreamType, Version, VERSION_1,
};
