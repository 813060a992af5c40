//! # Connection
//!
//! The top-level driver: owns the connection id, the send packet-number
//! counter, the stream set, and the packet buffer, and feeds inbound
//! packets through the handshake state machine.
//!
//! One connection may be driven by any number of concurrent I/O callers;
//! every piece of mutable state sits behind its own per-connection lock,
//! and inbound packet processing is serialized by the state-machine lock.
//! There is no cross-connection shared state.

#![forbid(unsafe_code)]

pub mod state;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::{PacketBuffer, PacketSink, SentRecord};
use crate::frames::Frame;
use crate::packet::{Packet, ShortPacket};
use crate::payload::Payload;
use crate::stream::{Stream, StreamListener, Streams};
use crate::types::{ConnectionId, PacketNumber, StreamId, StreamType, Version, VERSION_1};

pub use state::ConnectionState;
use state::StateMachine;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Protocol version assumed until the peer's Initial packet is seen
    pub version: Version,

    /// Age past which an unacknowledged packet becomes a retransmission
    /// candidate
    pub retransmit_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            version: VERSION_1,
            retransmit_timeout: Duration::from_millis(500),
        }
    }
}

/// A transport connection between two endpoints.
///
/// Created on the first datagram from a new peer address by the (external)
/// connection registry; that registry also owns teardown.
pub struct Connection {
    listener: Arc<dyn StreamListener>,
    connection_id: Mutex<Option<ConnectionId>>,
    version: Mutex<Version>,
    send_packet_number: Mutex<PacketNumber>,
    streams: Streams,
    packet_buffer: PacketBuffer,
    state: Mutex<StateMachine>,
}

impl Connection {
    /// Create a connection that delivers stream events to `listener` and
    /// transmits packets through `sink`.
    pub fn create(
        listener: Arc<dyn StreamListener>,
        sink: Arc<dyn PacketSink>,
        config: ConnectionConfig,
    ) -> Arc<Connection> {
        Arc::new_cyclic(|connection| Connection {
            listener,
            connection_id: Mutex::new(None),
            version: Mutex::new(config.version),
            send_packet_number: Mutex::new(0),
            streams: Streams::new(connection.clone()),
            packet_buffer: PacketBuffer::new(sink, config.retransmit_timeout),
            state: Mutex::new(StateMachine::new()),
        })
    }

    /// Sole inbound entry point: process one decoded packet.
    ///
    /// Acknowledgment bookkeeping runs first, then the state machine.
    /// Processing is serialized per connection, in the order packets are
    /// handed in.
    pub fn on_packet(&self, packet: Packet) {
        debug!(
            packet_number = packet.packet_number(),
            connection_id = ?packet.connection_id(),
            "inbound packet"
        );
        self.packet_buffer.on_packet(&packet);
        self.state.lock().process_packet(self, packet);
    }

    /// Current handshake state.
    pub fn state(&self) -> ConnectionState {
        self.state.lock().state()
    }

    /// Connection ID, once assigned from the peer's Initial packet.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id.lock().clone()
    }

    pub(crate) fn set_connection_id(&self, connection_id: ConnectionId) {
        *self.connection_id.lock() = Some(connection_id);
    }

    /// Negotiated protocol version.
    pub fn version(&self) -> Version {
        *self.version.lock()
    }

    pub(crate) fn set_version(&self, version: Version) {
        *self.version.lock() = version;
    }

    /// Send a fully formed packet through the packet buffer.
    pub fn send_packet(&self, packet: Packet) {
        self.packet_buffer.send(packet);
    }

    /// Wrap `frames` in a short-header packet with the next send packet
    /// number and send it.
    pub fn send_frames(&self, frames: Vec<Frame>) {
        let packet = Packet::Short(ShortPacket {
            key_phase: false,
            connection_id: self.connection_id(),
            packet_number: self.next_packet_number(),
            payload: Payload::new(frames),
        });
        self.send_packet(packet);
    }

    /// Open (or return) a stream with an explicit direction capability.
    pub fn open_stream(&self, id: StreamId, stream_type: StreamType) -> Arc<Stream> {
        self.streams.get_or_create(id, stream_type, &self.listener)
    }

    /// Stream lookup for inbound frame dispatch; peers get bidirectional
    /// streams by default.
    pub(crate) fn get_or_create_stream(&self, id: StreamId) -> Arc<Stream> {
        self.streams
            .get_or_create(id, StreamType::Bidirectional, &self.listener)
    }

    /// The stream set.
    pub fn streams(&self) -> &Streams {
        &self.streams
    }

    /// Largest packet number the peer has acknowledged.
    pub fn last_acked_packet_number(&self) -> Option<PacketNumber> {
        self.packet_buffer.largest_acked()
    }

    /// Advance and return the send packet-number counter.
    pub fn next_packet_number(&self) -> PacketNumber {
        let mut packet_number = self.send_packet_number.lock();
        *packet_number += 1;
        *packet_number
    }

    /// Invoke `handler` with every sent packet unacknowledged past the
    /// retransmission timeout. See [`PacketBuffer::poll_timeouts`].
    pub fn poll_retransmits(&self, now: Instant, handler: &mut dyn FnMut(&SentRecord)) {
        self.packet_buffer.poll_timeouts(now, handler);
    }

    /// The sent-packet buffer.
    pub fn packet_buffer(&self) -> &PacketBuffer {
        &self.packet_buffer
    }
}
