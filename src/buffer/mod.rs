//! # Sent-Packet Buffer
//!
//! Tracks sent-but-unacknowledged packets per connection, processes
//! incoming ACK frames, and surfaces records that have been in flight past
//! the retransmission timeout.
//!
//! This is a buffering wrapper: the actual bytes-on-wire transmission is
//! delegated to the [`PacketSink`], never performed here. The send call is
//! fire-and-forget from the buffer's perspective.
//!
//! All mutation of the unacknowledged set and the largest-acked counter
//! happens behind one mutex, so concurrent `send` and `on_packet` calls on
//! the same connection never race.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use crate::frames::Frame;
use crate::packet::Packet;
use crate::types::PacketNumber;

/// Outbound transport boundary.
///
/// Expected to perform the wire encode and hand the bytes to the datagram
/// transport, synchronously or asynchronously. Must not re-enter the
/// protocol core.
pub trait PacketSink: Send + Sync {
    /// Transmit one packet.
    fn transmit(&self, packet: Packet);
}

impl<F> PacketSink for F
where
    F: Fn(Packet) + Send + Sync,
{
    fn transmit(&self, packet: Packet) {
        self(packet)
    }
}

/// Bookkeeping record for one sent, not yet acknowledged packet.
#[derive(Debug, Clone)]
pub struct SentRecord {
    /// Packet number the record is keyed by
    pub packet_number: PacketNumber,

    /// The packet as sent, for retransmission
    pub packet: Packet,

    /// Send timestamp
    pub sent_at: Instant,
}

struct BufferState {
    in_flight: BTreeMap<PacketNumber, SentRecord>,
    largest_acked: Option<PacketNumber>,
}

/// Per-connection sent-packet bookkeeping.
pub struct PacketBuffer {
    state: Mutex<BufferState>,
    sink: Arc<dyn PacketSink>,
    retransmit_timeout: Duration,
}

impl PacketBuffer {
    /// Create a buffer that transmits through `sink` and considers records
    /// retransmission candidates after `retransmit_timeout`.
    pub fn new(sink: Arc<dyn PacketSink>, retransmit_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(BufferState {
                in_flight: BTreeMap::new(),
                largest_acked: None,
            }),
            sink,
            retransmit_timeout,
        }
    }

    /// Record `packet` in the unacknowledged set, then hand it to the sink.
    pub fn send(&self, packet: Packet) {
        let packet_number = packet.packet_number();
        {
            let mut state = self.state.lock();
            state.in_flight.insert(
                packet_number,
                SentRecord {
                    packet_number,
                    packet: packet.clone(),
                    sent_at: Instant::now(),
                },
            );
        }
        trace!(packet_number, "buffered outbound packet");
        self.sink.transmit(packet);
    }

    /// Process acknowledgments carried by an inbound packet.
    ///
    /// Every packet number covered by an ACK frame has its record removed
    /// and advances the largest-acked value monotonically. Numbers with no
    /// matching record are ignored: already acked, or never sent.
    pub fn on_packet(&self, packet: &Packet) {
        let mut state = self.state.lock();
        for frame in packet.payload().frames() {
            if let Frame::Ack(ack) = frame {
                for packet_number in ack.acked_packet_numbers() {
                    if state.in_flight.remove(&packet_number).is_some() {
                        trace!(packet_number, "packet acknowledged");
                    }
                    if state.largest_acked.map_or(true, |la| packet_number > la) {
                        state.largest_acked = Some(packet_number);
                    }
                }
            }
        }
    }

    /// Largest packet number acknowledged by the peer so far.
    pub fn largest_acked(&self) -> Option<PacketNumber> {
        self.state.lock().largest_acked
    }

    /// Number of sent packets awaiting acknowledgment.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Check whether a packet number is still awaiting acknowledgment.
    pub fn is_in_flight(&self, packet_number: PacketNumber) -> bool {
        self.state.lock().in_flight.contains_key(&packet_number)
    }

    /// Invoke `handler` with every record unacknowledged for longer than
    /// the retransmission timeout, in packet-number order.
    ///
    /// The bookkeeping is left untouched: a retransmission strategy layers
    /// on top of this hook and decides what to do with each record. Records
    /// are cloned out of the critical section, so the handler is free to
    /// call back into `send`.
    pub fn poll_timeouts(&self, now: Instant, handler: &mut dyn FnMut(&SentRecord)) {
        let expired: Vec<SentRecord> = {
            let state = self.state.lock();
            state
                .in_flight
                .values()
                .filter(|record| {
                    now.saturating_duration_since(record.sent_at) >= self.retransmit_timeout
                })
                .cloned()
                .collect()
        };
        for record in &expired {
            handler(record);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
