//! # Packet Type Definitions
//!
//! Packets are constructed immutably: header fields are fixed at
//! construction, and only the payload's frame list composition happens
//! before that.

#![forbid(unsafe_code)]

use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::types::{ConnectionId, PacketNumber, Version};

/// Long-header packet type.
///
/// Encoded as a fixed one-byte enumeration in the low seven bits of the
/// first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongPacketType {
    /// First packet of a connection attempt (0x7F)
    Initial,
    /// Server-forced address validation round trip (0x7E)
    Retry,
    /// Handshake continuation (0x7D)
    Handshake,
    /// Early data under 0-RTT protection (0x7C)
    ZeroRttProtected,
}

impl LongPacketType {
    /// The wire byte for this packet type.
    pub const fn type_byte(self) -> u8 {
        match self {
            LongPacketType::Initial => 0x7f,
            LongPacketType::Retry => 0x7e,
            LongPacketType::Handshake => 0x7d,
            LongPacketType::ZeroRttProtected => 0x7c,
        }
    }

    /// Read a packet type from its wire byte.
    ///
    /// Any value outside the enumeration is a malformed header.
    pub fn from_type_byte(byte: u8) -> Result<Self> {
        match byte {
            0x7f => Ok(LongPacketType::Initial),
            0x7e => Ok(LongPacketType::Retry),
            0x7d => Ok(LongPacketType::Handshake),
            0x7c => Ok(LongPacketType::ZeroRttProtected),
            _ => Err(Error::MalformedHeader),
        }
    }
}

/// Long-header packet: carries explicit version and connection-id fields,
/// used before a connection is fully established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongPacket {
    /// Packet type
    pub packet_type: LongPacketType,

    /// Connection ID chosen by the peer
    pub connection_id: ConnectionId,

    /// Protocol version
    pub version: Version,

    /// Packet number
    pub packet_number: PacketNumber,

    /// Contained frames
    pub payload: Payload,
}

impl LongPacket {
    /// Synthesize the handshake response to an Initial packet.
    ///
    /// The payload is empty for now: it is the placeholder for a future
    /// crypto handshake payload.
    pub fn handshake(
        connection_id: ConnectionId,
        packet_number: PacketNumber,
        version: Version,
    ) -> LongPacket {
        LongPacket {
            packet_type: LongPacketType::Handshake,
            connection_id,
            version,
            packet_number,
            payload: Payload::EMPTY,
        }
    }
}

/// Short-header packet: compact format used once a connection is
/// established, omitting the version and optionally the connection id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortPacket {
    /// Key phase bit
    pub key_phase: bool,

    /// Connection ID, when not omitted
    pub connection_id: Option<ConnectionId>,

    /// Packet number
    pub packet_number: PacketNumber,

    /// Contained frames
    pub payload: Payload,
}

/// A decoded packet of either header form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Long-header packet
    Long(LongPacket),

    /// Short-header packet
    Short(ShortPacket),
}

impl Packet {
    /// Packet number of either form.
    pub fn packet_number(&self) -> PacketNumber {
        match self {
            Packet::Long(p) => p.packet_number,
            Packet::Short(p) => p.packet_number,
        }
    }

    /// Connection ID, if the packet carries one.
    pub fn connection_id(&self) -> Option<&ConnectionId> {
        match self {
            Packet::Long(p) => Some(&p.connection_id),
            Packet::Short(p) => p.connection_id.as_ref(),
        }
    }

    /// The contained payload.
    pub fn payload(&self) -> &Payload {
        match self {
            Packet::Long(p) => &p.payload,
            Packet::Short(p) => &p.payload,
        }
    }

    /// Long-header packet type, when this is a long packet.
    pub fn long_type(&self) -> Option<LongPacketType> {
        match self {
            Packet::Long(p) => Some(p.packet_type),
            Packet::Short(_) => None,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_bytes_are_fixed() {
        assert_eq!(LongPacketType::Initial.type_byte(), 0x7f);
        assert_eq!(LongPacketType::Retry.type_byte(), 0x7e);
        assert_eq!(LongPacketType::Handshake.type_byte(), 0x7d);
        assert_eq!(LongPacketType::ZeroRttProtected.type_byte(), 0x7c);
    }

    #[test]
    fn type_byte_roundtrip() {
        for ty in [
            LongPacketType::Initial,
            LongPacketType::Retry,
            LongPacketType::Handshake,
            LongPacketType::ZeroRttProtected,
        ] {
            assert_eq!(LongPacketType::from_type_byte(ty.type_byte()), Ok(ty));
        }
    }

    #[test]
    fn unknown_type_byte_is_malformed() {
        assert_eq!(
            LongPacketType::from_type_byte(0x7b),
            Err(Error::MalformedHeader)
        );
        assert_eq!(
            LongPacketType::from_type_byte(0x00),
            Err(Error::MalformedHeader)
        );
    }

    #[test]
    fn handshake_constructor_has_empty_payload() {
        let cid = ConnectionId::from_slice(&[0xaa]).unwrap();
        let packet = LongPacket::handshake(cid.clone(), 1, crate::types::VERSION_1);
        assert_eq!(packet.packet_type, LongPacketType::Handshake);
        assert_eq!(packet.connection_id, cid);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn packet_accessors() {
        let long = Packet::Long(LongPacket {
            packet_type: LongPacketType::Initial,
            connection_id: ConnectionId::from_slice(&[0x01]).unwrap(),
            version: crate::types::VERSION_1,
            packet_number: 7,
            payload: Payload::EMPTY,
        });
        assert_eq!(long.packet_number(), 7);
        assert_eq!(long.long_type(), Some(LongPacketType::Initial));
        assert!(long.connection_id().is_some());

        let short = Packet::Short(ShortPacket {
            key_phase: false,
            connection_id: None,
            packet_number: 9,
            payload: Payload::EMPTY,
        });
        assert_eq!(short.packet_number(), 9);
        assert_eq!(short.long_type(), None);
        assert!(short.connection_id().is_none());
    }
}
