//! # Frame Wire Codec
//!
//! Parses one frame from the front of a buffer and serializes frames into
//! caller-provided buffers. Parsing never reads past the supplied slice;
//! anything that cannot be interpreted as a frame is `MalformedFrame`.

#![forbid(unsafe_code)]

use bytes::{BufMut, Bytes, BytesMut};
use tinyvec::TinyVec;

use super::types::*;
use crate::error::{Error, Result};
use crate::types::{StreamId, VarIntCodec};

impl Frame {
    /// Parse a single frame from the front of `buf`.
    ///
    /// Returns the frame and the number of bytes consumed.
    pub fn parse(buf: &[u8]) -> Result<(Frame, usize)> {
        let ty = *buf.first().ok_or(Error::MalformedFrame)?;
        let body = &buf[1..];

        // Consecutive padding bytes collapse into one frame
        if ty == FRAME_TYPE_PADDING {
            let run = 1 + body.iter().take_while(|&&b| b == 0x00).count();
            return Ok((Frame::Padding, run));
        }

        let (frame, consumed) = match ty {
            FRAME_TYPE_RST_STREAM => parse_rst_stream(body)?,
            FRAME_TYPE_PING => {
                let (data, consumed) = parse_opaque_data(body)?;
                (Frame::Ping(PingFrame { data }), consumed)
            }
            FRAME_TYPE_PONG => {
                let (data, consumed) = parse_opaque_data(body)?;
                (Frame::Pong(PongFrame { data }), consumed)
            }
            FRAME_TYPE_ACK => parse_ack(body)?,
            ty if ty & !0x07 == FRAME_TYPE_STREAM_BASE => parse_stream(ty, body)?,
            _ => return Err(Error::MalformedFrame),
        };

        Ok((frame, 1 + consumed))
    }

    /// Append this frame's wire encoding to `out`.
    pub fn write(&self, out: &mut BytesMut) -> Result<()> {
        out.put_u8(self.frame_type());

        match self {
            Frame::Padding => {}

            Frame::RstStream(rst) => {
                VarIntCodec::put(rst.stream_id.value(), out)?;
                VarIntCodec::put(rst.error_code, out)?;
                VarIntCodec::put(rst.offset, out)?;
            }

            Frame::Ping(PingFrame { data }) | Frame::Pong(PongFrame { data }) => {
                VarIntCodec::put(data.len() as u64, out)?;
                out.extend_from_slice(data);
            }

            Frame::Ack(ack) => {
                VarIntCodec::put(ack.largest_acked, out)?;
                VarIntCodec::put(ack.ack_delay, out)?;
                VarIntCodec::put(ack.ranges.len() as u64, out)?;
                VarIntCodec::put(ack.first_range, out)?;
                for range in &ack.ranges {
                    VarIntCodec::put(range.gap, out)?;
                    VarIntCodec::put(range.length, out)?;
                }
            }

            Frame::Stream(stream) => {
                VarIntCodec::put(stream.stream_id.value(), out)?;
                if stream.offset > 0 {
                    VarIntCodec::put(stream.offset, out)?;
                }
                VarIntCodec::put(stream.data.len() as u64, out)?;
                out.extend_from_slice(&stream.data);
            }
        }

        Ok(())
    }
}

fn read_varint(buf: &[u8], offset: &mut usize) -> Result<u64> {
    let (value, consumed) = VarIntCodec::decode(&buf[*offset..]).ok_or(Error::MalformedFrame)?;
    *offset += consumed;
    Ok(value)
}

fn read_bytes(buf: &[u8], offset: &mut usize, len: u64) -> Result<Bytes> {
    let remaining = (buf.len() - *offset) as u64;
    if len > remaining {
        return Err(Error::MalformedFrame);
    }
    let data = Bytes::copy_from_slice(&buf[*offset..*offset + len as usize]);
    *offset += len as usize;
    Ok(data)
}

fn parse_rst_stream(buf: &[u8]) -> Result<(Frame, usize)> {
    let mut offset = 0;
    let stream_id = read_varint(buf, &mut offset)?;
    let error_code = read_varint(buf, &mut offset)?;
    let final_offset = read_varint(buf, &mut offset)?;

    Ok((
        Frame::RstStream(RstStreamFrame {
            stream_id: StreamId::new(stream_id),
            error_code,
            offset: final_offset,
        }),
        offset,
    ))
}

fn parse_opaque_data(buf: &[u8]) -> Result<(Bytes, usize)> {
    let mut offset = 0;
    let len = read_varint(buf, &mut offset)?;
    let data = read_bytes(buf, &mut offset, len)?;
    Ok((data, offset))
}

fn parse_ack(buf: &[u8]) -> Result<(Frame, usize)> {
    let mut offset = 0;
    let largest_acked = read_varint(buf, &mut offset)?;
    let ack_delay = read_varint(buf, &mut offset)?;
    let range_count = read_varint(buf, &mut offset)?;
    let first_range = read_varint(buf, &mut offset)?;

    // The downward walk must stay above packet number zero
    let mut low = largest_acked
        .checked_sub(first_range)
        .ok_or(Error::MalformedFrame)?;

    let mut ranges: TinyVec<[AckRange; 8]> = TinyVec::default();
    for _ in 0..range_count {
        let gap = read_varint(buf, &mut offset)?;
        let length = read_varint(buf, &mut offset)?;

        let high = low
            .checked_sub(gap.checked_add(2).ok_or(Error::MalformedFrame)?)
            .ok_or(Error::MalformedFrame)?;
        low = high.checked_sub(length).ok_or(Error::MalformedFrame)?;
        ranges.push(AckRange { gap, length });
    }

    Ok((
        Frame::Ack(AckFrame {
            largest_acked,
            ack_delay,
            first_range,
            ranges,
        }),
        offset,
    ))
}

fn parse_stream(ty: u8, buf: &[u8]) -> Result<(Frame, usize)> {
    let fin = ty & STREAM_FRAME_BIT_FIN != 0;
    let has_len = ty & STREAM_FRAME_BIT_LEN != 0;
    let has_offset = ty & STREAM_FRAME_BIT_OFF != 0;

    let mut offset = 0;
    let stream_id = read_varint(buf, &mut offset)?;

    let stream_offset = if has_offset {
        read_varint(buf, &mut offset)?
    } else {
        0
    };

    let data = if has_len {
        let len = read_varint(buf, &mut offset)?;
        read_bytes(buf, &mut offset, len)?
    } else {
        // No length field: the data extends to the end of the payload
        let data = Bytes::copy_from_slice(&buf[offset..]);
        offset = buf.len();
        data
    };

    Ok((
        Frame::Stream(StreamFrame {
            stream_id: StreamId::new(stream_id),
            offset: stream_offset,
            fin,
            data,
        }),
        offset,
    ))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(frame: Frame) {
        let mut buf = BytesMut::new();
        frame.write(&mut buf).unwrap();
        let (parsed, consumed) = Frame::parse(&buf).unwrap();
        assert_eq!(parsed, frame);
        assert_eq!(consumed, buf.len());
    }

    mod padding_tests {
        use super::*;

        #[test]
        fn single_padding_byte() {
            let (frame, consumed) = Frame::parse(&[0x00]).unwrap();
            assert_eq!(frame, Frame::Padding);
            assert_eq!(consumed, 1);
        }

        #[test]
        fn padding_run_collapses() {
            let (frame, consumed) = Frame::parse(&[0x00, 0x00, 0x00, 0x00, 0x01]).unwrap();
            assert_eq!(frame, Frame::Padding);
            assert_eq!(consumed, 4);
        }
    }

    mod ping_pong_tests {
        use super::*;

        #[test]
        fn parse_ping_with_data() {
            let (frame, consumed) = Frame::parse(&[0x07, 0x02, 0x61, 0x62]).unwrap();
            assert_eq!(
                frame,
                Frame::Ping(PingFrame {
                    data: Bytes::from_static(b"ab")
                })
            );
            assert_eq!(consumed, 4);
        }

        #[test]
        fn parse_empty_ping() {
            let (frame, consumed) = Frame::parse(&[0x07, 0x00]).unwrap();
            match frame {
                Frame::Ping(ping) => assert!(ping.is_empty()),
                other => panic!("expected ping, got {:?}", other),
            }
            assert_eq!(consumed, 2);
        }

        #[test]
        fn ping_data_truncated() {
            assert_eq!(Frame::parse(&[0x07, 0x05, 0x61]), Err(Error::MalformedFrame));
        }

        #[test]
        fn pong_roundtrip() {
            roundtrip(Frame::Pong(PongFrame {
                data: Bytes::from_static(b"probe"),
            }));
        }
    }

    mod rst_stream_tests {
        use super::*;

        #[test]
        fn parse_rst_stream() {
            let (frame, consumed) = Frame::parse(&[0x01, 0x04, 0x09, 0x10]).unwrap();
            assert_eq!(
                frame,
                Frame::RstStream(RstStreamFrame {
                    stream_id: StreamId::new(4),
                    error_code: 9,
                    offset: 16,
                })
            );
            assert_eq!(consumed, 4);
        }

        #[test]
        fn rst_stream_roundtrip_wide_fields() {
            roundtrip(Frame::RstStream(RstStreamFrame {
                stream_id: StreamId::new(1234),
                error_code: 70_000,
                offset: 5_000_000_000,
            }));
        }

        #[test]
        fn rst_stream_truncated() {
            assert_eq!(Frame::parse(&[0x01, 0x04]), Err(Error::MalformedFrame));
        }
    }

    mod ack_tests {
        use super::*;

        #[test]
        fn parse_simple_ack() {
            // largest=5, delay=0, ranges=0, first=2
            let (frame, consumed) = Frame::parse(&[0x0e, 0x05, 0x00, 0x00, 0x02]).unwrap();
            match frame {
                Frame::Ack(ack) => {
                    assert_eq!(ack.largest_acked, 5);
                    assert_eq!(ack.first_range, 2);
                    assert_eq!(ack.acked_packet_numbers(), vec![5, 4, 3]);
                }
                other => panic!("expected ack, got {:?}", other),
            }
            assert_eq!(consumed, 5);
        }

        #[test]
        fn parse_ack_with_ranges() {
            // largest=10, delay=0, ranges=1, first=1, gap=1, len=2
            let (frame, _) = Frame::parse(&[0x0e, 0x0a, 0x00, 0x01, 0x01, 0x01, 0x02]).unwrap();
            match frame {
                Frame::Ack(ack) => {
                    assert_eq!(ack.acked_packet_numbers(), vec![10, 9, 6, 5, 4]);
                }
                other => panic!("expected ack, got {:?}", other),
            }
        }

        #[test]
        fn ack_first_range_underflow_rejected() {
            // first range larger than the largest acknowledged number
            assert_eq!(
                Frame::parse(&[0x0e, 0x01, 0x00, 0x00, 0x02]),
                Err(Error::MalformedFrame)
            );
        }

        #[test]
        fn ack_range_underflow_rejected() {
            // gap walks below packet number zero
            assert_eq!(
                Frame::parse(&[0x0e, 0x05, 0x00, 0x01, 0x00, 0x3f, 0x00]),
                Err(Error::MalformedFrame)
            );
        }

        #[test]
        fn ack_roundtrip_with_ranges() {
            let mut ack = AckFrame::for_contiguous(1000, 10);
            ack.ack_delay = 250;
            ack.ranges.push(AckRange { gap: 4, length: 7 });
            ack.ranges.push(AckRange { gap: 0, length: 0 });
            roundtrip(Frame::Ack(ack));
        }
    }

    mod stream_tests {
        use super::*;

        #[test]
        fn parse_stream_with_length() {
            let (frame, consumed) = Frame::parse(&[0x12, 0x00, 0x03, 0x61, 0x62, 0x63]).unwrap();
            assert_eq!(
                frame,
                Frame::Stream(StreamFrame {
                    stream_id: StreamId::new(0),
                    offset: 0,
                    fin: false,
                    data: Bytes::from_static(b"abc"),
                })
            );
            assert_eq!(consumed, 6);
        }

        #[test]
        fn parse_stream_with_offset_and_fin() {
            // type 0x17 = FIN | LEN | OFF, offset=100 (0x4064)
            let (frame, _) = Frame::parse(&[0x17, 0x04, 0x40, 0x64, 0x02, 0xde, 0xad]).unwrap();
            assert_eq!(
                frame,
                Frame::Stream(StreamFrame {
                    stream_id: StreamId::new(4),
                    offset: 100,
                    fin: true,
                    data: Bytes::from_static(&[0xde, 0xad]),
                })
            );
        }

        #[test]
        fn parse_stream_without_length_takes_rest() {
            let (frame, consumed) = Frame::parse(&[0x10, 0x00, 0xaa, 0xbb, 0xcc]).unwrap();
            match frame {
                Frame::Stream(stream) => assert_eq!(&stream.data[..], &[0xaa, 0xbb, 0xcc]),
                other => panic!("expected stream, got {:?}", other),
            }
            assert_eq!(consumed, 5);
        }

        #[test]
        fn stream_length_past_buffer_rejected() {
            assert_eq!(
                Frame::parse(&[0x12, 0x00, 0x05, 0x61]),
                Err(Error::MalformedFrame)
            );
        }

        #[test]
        fn stream_roundtrip() {
            roundtrip(Frame::Stream(StreamFrame {
                stream_id: StreamId::new(8),
                offset: 4096,
                fin: true,
                data: Bytes::from_static(b"hello stream"),
            }));
        }
    }

    mod unknown_type_tests {
        use super::*;

        #[test]
        fn unknown_type_bytes_rejected() {
            assert_eq!(Frame::parse(&[0x05]), Err(Error::MalformedFrame));
            assert_eq!(Frame::parse(&[0x1f]), Err(Error::MalformedFrame));
            assert_eq!(Frame::parse(&[0xff]), Err(Error::MalformedFrame));
        }

        #[test]
        fn empty_buffer_rejected() {
            assert_eq!(Frame::parse(&[]), Err(Error::MalformedFrame));
        }
    }
}
