//! # Connection State Machine
//!
//! Drives a connection from its first datagram to the established state
//! and dispatches established-state frames to their subsystems. The
//! machine itself is not reentrant; the connection serializes access.

#![forbid(unsafe_code)]

use tracing::{debug, info, warn};

use super::Connection;
use crate::frames::{Frame, PongFrame};
use crate::packet::{LongPacket, LongPacketType, Packet};

/// Handshake progression of a connection.
///
/// Closing and draining states are extension points, not part of this
/// core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No Initial packet seen yet
    BeforeInitial,

    /// Handshake response sent, frames are dispatched
    Ready,
}

/// Per-connection handshake and dispatch state machine.
pub(crate) struct StateMachine {
    state: ConnectionState,
}

impl StateMachine {
    pub(crate) fn new() -> Self {
        Self {
            state: ConnectionState::BeforeInitial,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    /// Advance the state machine with one inbound packet.
    ///
    /// Wire-level errors were already weeded out by the decoder; dispatch
    /// errors here are local to the offending frame and never abort the
    /// connection.
    pub(crate) fn process_packet(&mut self, connection: &Connection, packet: Packet) {
        debug!(
            state = ?self.state,
            packet_type = ?packet.long_type(),
            connection_id = ?packet.connection_id(),
            "processing packet"
        );

        match self.state {
            ConnectionState::BeforeInitial => self.process_before_initial(connection, packet),
            ConnectionState::Ready => {
                for frame in packet.payload().frames() {
                    Self::dispatch_frame(connection, frame);
                }
            }
        }
    }

    /// Only an Initial packet is acted upon before the handshake; anything
    /// else is logged and dropped without a state change.
    fn process_before_initial(&mut self, connection: &Connection, packet: Packet) {
        match packet {
            Packet::Long(long) if long.packet_type == LongPacketType::Initial => {
                // TODO negotiate the version instead of adopting the peer's
                connection.set_connection_id(long.connection_id.clone());
                connection.set_version(long.version);

                let handshake = LongPacket::handshake(
                    long.connection_id.clone(),
                    connection.next_packet_number(),
                    long.version,
                );
                connection.send_packet(Packet::Long(handshake));

                self.state = ConnectionState::Ready;
                info!(connection_id = %long.connection_id, "connection ready");
            }
            other => {
                warn!(
                    packet_type = ?other.long_type(),
                    "unexpected packet before initial, dropping"
                );
            }
        }
    }

    /// Established-state frame dispatch.
    ///
    /// ACK frames were already consumed by the packet buffer; padding and
    /// unsolicited pongs elicit nothing. Per-frame errors are logged and
    /// the frame dropped, nothing more.
    fn dispatch_frame(connection: &Connection, frame: &Frame) {
        match frame {
            Frame::Stream(stream_frame) => {
                let stream = connection.get_or_create_stream(stream_frame.stream_id);
                if let Err(error) =
                    stream.on_data(stream_frame.offset, stream_frame.data.clone(), stream_frame.fin)
                {
                    warn!(%error, "dropping stream frame");
                }
            }

            Frame::RstStream(rst) => {
                let stream = connection.get_or_create_stream(rst.stream_id);
                stream.on_reset(rst.error_code, rst.offset);
            }

            Frame::Ping(ping) => {
                if !ping.is_empty() {
                    connection.send_frames(vec![Frame::Pong(PongFrame {
                        data: ping.data.clone(),
                    })]);
                }
            }

            Frame::Padding | Frame::Ack(_) | Frame::Pong(_) => {}
        }
    }
}
