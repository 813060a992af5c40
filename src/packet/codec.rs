//! # Packet Wire Codec
//!
//! Byte-level encode/decode for both header forms. Round-trip exact for
//! all fields: `decode(encode(p)) == p` for every constructible packet.
//!
//! Width policy, applied consistently: connection ids are length-prefixed
//! (one length byte), versions are 4-byte big-endian, packet numbers are
//! varints in both forms, and the payload extends to the end of the
//! datagram.
//!
//! Decoding never reads past the supplied buffer: running out of bytes
//! mid-structure is `TruncatedPacket`, never a panic.

#![forbid(unsafe_code)]

use bytes::{BufMut, Bytes, BytesMut};

use super::types::{LongPacket, LongPacketType, Packet, ShortPacket};
use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::types::{ConnectionId, VarIntCodec, MAX_CID_LENGTH};

/// Header form bit: set for long headers, clear for short headers.
pub const HEADER_FORM_BIT: u8 = 0x80;

/// Short-header flag: a connection id follows the first byte.
pub const SHORT_CID_PRESENT_BIT: u8 = 0x40;

/// Short-header flag: key phase.
pub const SHORT_KEY_PHASE_BIT: u8 = 0x20;

impl Packet {
    /// Decode a packet from a datagram.
    pub fn decode(buf: &[u8]) -> Result<Packet> {
        let mut cursor = Cursor::new(buf);
        let first = cursor.u8()?;

        if first & HEADER_FORM_BIT != 0 {
            decode_long(first, cursor)
        } else {
            decode_short(first, cursor)
        }
    }

    /// Encode this packet into a fresh byte buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.write(&mut out)?;
        Ok(out.freeze())
    }

    /// Append this packet's wire encoding to `out`.
    pub fn write(&self, out: &mut BytesMut) -> Result<()> {
        match self {
            Packet::Long(p) => {
                out.put_u8(HEADER_FORM_BIT | p.packet_type.type_byte());
                write_cid(&p.connection_id, out);
                out.put_u32(p.version);
                VarIntCodec::put(p.packet_number, out)?;
                p.payload.write(out)
            }
            Packet::Short(p) => {
                let mut first = 0u8;
                if p.connection_id.is_some() {
                    first |= SHORT_CID_PRESENT_BIT;
                }
                if p.key_phase {
                    first |= SHORT_KEY_PHASE_BIT;
                }
                out.put_u8(first);
                if let Some(cid) = &p.connection_id {
                    write_cid(cid, out);
                }
                VarIntCodec::put(p.packet_number, out)?;
                p.payload.write(out)
            }
        }
    }
}

fn decode_long(first: u8, mut cursor: Cursor<'_>) -> Result<Packet> {
    let packet_type = LongPacketType::from_type_byte(first & !HEADER_FORM_BIT)?;
    let connection_id = cursor.cid()?;
    let version = cursor.u32()?;
    let packet_number = cursor.varint()?;
    let payload = Payload::parse(cursor.rest())?;

    Ok(Packet::Long(LongPacket {
        packet_type,
        connection_id,
        version,
        packet_number,
        payload,
    }))
}

fn decode_short(first: u8, mut cursor: Cursor<'_>) -> Result<Packet> {
    if first & !(SHORT_CID_PRESENT_BIT | SHORT_KEY_PHASE_BIT) != 0 {
        return Err(Error::MalformedHeader);
    }

    let key_phase = first & SHORT_KEY_PHASE_BIT != 0;
    let connection_id = if first & SHORT_CID_PRESENT_BIT != 0 {
        Some(cursor.cid()?)
    } else {
        None
    };
    let packet_number = cursor.varint()?;
    let payload = Payload::parse(cursor.rest())?;

    Ok(Packet::Short(ShortPacket {
        key_phase,
        connection_id,
        packet_number,
        payload,
    }))
}

fn write_cid(cid: &ConnectionId, out: &mut BytesMut) {
    out.put_u8(cid.len() as u8);
    out.extend_from_slice(cid.as_bytes());
}

/// Bounds-checked reader over a datagram.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(Error::TruncatedPacket);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn varint(&mut self) -> Result<u64> {
        let (value, consumed) =
            VarIntCodec::decode(&self.buf[self.pos..]).ok_or(Error::TruncatedPacket)?;
        self.pos += consumed;
        Ok(value)
    }

    fn cid(&mut self) -> Result<ConnectionId> {
        let len = self.u8()? as usize;
        if len > MAX_CID_LENGTH {
            return Err(Error::MalformedHeader);
        }
        let bytes = self.take(len)?;
        ConnectionId::from_slice(bytes).ok_or(Error::MalformedHeader)
    }

    fn rest(self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
