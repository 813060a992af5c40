//! # Receive-Side Reassembly
//!
//! Reconstructs an ordered byte stream from out-of-order, offset-tagged
//! fragments. Gapped data is retained undelivered until the gap fills;
//! duplicate and overlapping ranges are trimmed on insertion so no byte is
//! ever handed out twice.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::types::StreamOffset;

/// Offset-keyed reassembly buffer for one stream's receive side.
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    /// End of the contiguous prefix already handed to the listener
    delivered: StreamOffset,

    /// Out-of-order chunks, keyed by start offset, pairwise disjoint
    pending: BTreeMap<StreamOffset, Bytes>,

    /// Stream length fixed by a FIN, once seen
    final_size: Option<StreamOffset>,
}

impl ReceiveBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `data` at `offset`, returning any newly contiguous chunks in
    /// offset order.
    ///
    /// Bytes already delivered or already buffered are trimmed away, so
    /// retransmitted and overlapping fragments never produce duplicate
    /// delivery. `fin` fixes the final size at the end of this fragment;
    /// the first FIN wins.
    pub fn insert(&mut self, offset: StreamOffset, data: Bytes, fin: bool) -> Vec<Bytes> {
        if fin && self.final_size.is_none() {
            self.final_size = Some(offset + data.len() as u64);
        }

        self.store_new_ranges(offset, data);
        self.drain_contiguous()
    }

    /// Store the sub-ranges of `data` that are not yet covered by the
    /// delivered prefix or a pending chunk.
    fn store_new_ranges(&mut self, offset: StreamOffset, data: Bytes) {
        let end = offset + data.len() as u64;
        if end <= self.delivered {
            return;
        }

        let (base, data) = if offset < self.delivered {
            (
                self.delivered,
                data.slice((self.delivered - offset) as usize..),
            )
        } else {
            (offset, data)
        };

        let mut fresh: Vec<(StreamOffset, Bytes)> = Vec::new();
        let mut cursor = base;
        for (&start, chunk) in &self.pending {
            let chunk_end = start + chunk.len() as u64;
            if chunk_end <= cursor {
                continue;
            }
            if start >= end {
                break;
            }
            if start > cursor {
                fresh.push((
                    cursor,
                    data.slice((cursor - base) as usize..(start.min(end) - base) as usize),
                ));
            }
            cursor = cursor.max(chunk_end);
            if cursor >= end {
                break;
            }
        }
        if cursor < end {
            fresh.push((cursor, data.slice((cursor - base) as usize..)));
        }

        for (start, chunk) in fresh {
            if !chunk.is_empty() {
                self.pending.insert(start, chunk);
            }
        }
    }

    /// Pop pending chunks that extend the contiguous prefix.
    fn drain_contiguous(&mut self) -> Vec<Bytes> {
        let mut out = Vec::new();
        while let Some(entry) = self.pending.first_entry() {
            if *entry.key() > self.delivered {
                break;
            }
            let (_, chunk) = entry.remove_entry();
            self.delivered += chunk.len() as u64;
            out.push(chunk);
        }
        out
    }

    /// End of the contiguous prefix delivered so far.
    pub fn delivered_offset(&self) -> StreamOffset {
        self.delivered
    }

    /// Stream length, once fixed by a FIN.
    pub fn final_size(&self) -> Option<StreamOffset> {
        self.final_size
    }

    /// Check whether the contiguous prefix reaches the FIN-fixed length.
    pub fn is_complete(&self) -> bool {
        self.final_size
            .map_or(false, |final_size| self.delivered >= final_size)
    }

    /// Number of out-of-order chunks waiting for a gap to fill.
    pub fn pending_chunks(&self) -> usize {
        self.pending.len()
    }

    /// Discard all buffered, undelivered data.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &'static [u8]) -> Bytes {
        Bytes::from_static(s)
    }

    fn concat(chunks: &[Bytes]) -> Vec<u8> {
        chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }

    #[test]
    fn in_order_data_delivers_immediately() {
        let mut buffer = ReceiveBuffer::new();
        assert_eq!(concat(&buffer.insert(0, bytes(b"hello"), false)), b"hello");
        assert_eq!(concat(&buffer.insert(5, bytes(b" world"), false)), b" world");
        assert_eq!(buffer.delivered_offset(), 11);
    }

    #[test]
    fn gapped_data_waits_for_the_gap() {
        let mut buffer = ReceiveBuffer::new();
        assert!(buffer.insert(5, bytes(b"world"), false).is_empty());
        assert_eq!(buffer.pending_chunks(), 1);

        let delivered = buffer.insert(0, bytes(b"hello"), false);
        assert_eq!(concat(&delivered), b"helloworld");
        assert_eq!(buffer.pending_chunks(), 0);
    }

    #[test]
    fn duplicate_range_delivers_once() {
        let mut buffer = ReceiveBuffer::new();
        assert_eq!(concat(&buffer.insert(0, bytes(b"abc"), false)), b"abc");
        assert!(buffer.insert(0, bytes(b"abc"), false).is_empty());
        assert_eq!(buffer.delivered_offset(), 3);
    }

    #[test]
    fn overlapping_range_delivers_only_new_bytes() {
        let mut buffer = ReceiveBuffer::new();
        buffer.insert(0, bytes(b"abcd"), false);
        let delivered = buffer.insert(2, bytes(b"cdef"), false);
        assert_eq!(concat(&delivered), b"ef");
        assert_eq!(buffer.delivered_offset(), 6);
    }

    #[test]
    fn duplicate_of_pending_chunk_is_dropped() {
        let mut buffer = ReceiveBuffer::new();
        buffer.insert(5, bytes(b"world"), false);
        buffer.insert(5, bytes(b"world"), false);
        assert_eq!(buffer.pending_chunks(), 1);

        let delivered = buffer.insert(0, bytes(b"hello"), false);
        assert_eq!(concat(&delivered), b"helloworld");
    }

    #[test]
    fn fragment_bridging_two_pending_chunks() {
        let mut buffer = ReceiveBuffer::new();
        buffer.insert(2, bytes(b"c"), false);
        buffer.insert(6, bytes(b"g"), false);
        // covers 0..=7, overlapping both pending chunks
        let delivered = buffer.insert(0, bytes(b"abcdefgh"), false);
        assert_eq!(concat(&delivered), b"abcdefgh");
        assert_eq!(buffer.pending_chunks(), 0);
    }

    #[test]
    fn fin_fixes_final_size_and_completes() {
        let mut buffer = ReceiveBuffer::new();
        buffer.insert(3, bytes(b"de"), true);
        assert_eq!(buffer.final_size(), Some(5));
        assert!(!buffer.is_complete());

        buffer.insert(0, bytes(b"abc"), false);
        assert!(buffer.is_complete());
    }

    #[test]
    fn empty_fin_only_fragment_completes_delivered_stream() {
        let mut buffer = ReceiveBuffer::new();
        buffer.insert(0, bytes(b"abc"), false);
        assert!(buffer.insert(3, Bytes::new(), true).is_empty());
        assert!(buffer.is_complete());
    }

    #[test]
    fn clear_discards_pending_data() {
        let mut buffer = ReceiveBuffer::new();
        buffer.insert(5, bytes(b"world"), false);
        buffer.clear();
        assert_eq!(buffer.pending_chunks(), 0);
        assert!(buffer.insert(0, bytes(b"hello"), false).len() == 1);
        assert_eq!(buffer.delivered_offset(), 5);
    }
}
