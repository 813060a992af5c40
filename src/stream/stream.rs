//! # Stream Lifecycle
//!
//! A stream is an ordered byte channel multiplexed over one connection.
//! Created lazily on first reference, it terminates on a reset or a fully
//! delivered FIN and is never reused afterwards.

#![forbid(unsafe_code)]

use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use super::reassembly::ReceiveBuffer;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::frames::{Frame, RstStreamFrame, StreamFrame};
use crate::types::{ErrorCode, StreamId, StreamOffset, StreamType};

/// Lifecycle condition of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Carrying data
    Open,
    /// Terminated by a fully delivered FIN
    Closed,
    /// Terminated by a reset
    Reset,
}

/// Application-side delivery boundary for stream events.
///
/// `on_data` receives contiguous bytes in offset order, each byte exactly
/// once. `on_reset` is invoked once when the peer resets a stream.
/// Implementations may write to streams from these callbacks but must not
/// feed packets back into the connection.
pub trait StreamListener: Send + Sync {
    /// Ordered stream bytes became available.
    fn on_data(&self, stream_id: StreamId, data: Bytes);

    /// The peer reset a stream.
    fn on_reset(&self, stream_id: StreamId, error_code: ErrorCode, offset: StreamOffset);
}

struct StreamInner {
    state: StreamState,
    recv: ReceiveBuffer,
    send_offset: StreamOffset,
    fin_sent: bool,
}

/// One logical stream within a connection.
pub struct Stream {
    id: StreamId,
    stream_type: StreamType,
    connection: Weak<Connection>,
    listener: Arc<dyn StreamListener>,
    inner: Mutex<StreamInner>,
}

impl Stream {
    pub(crate) fn new(
        id: StreamId,
        stream_type: StreamType,
        connection: Weak<Connection>,
        listener: Arc<dyn StreamListener>,
    ) -> Self {
        Self {
            id,
            stream_type,
            connection,
            listener,
            inner: Mutex::new(StreamInner {
                state: StreamState::Open,
                recv: ReceiveBuffer::new(),
                send_offset: 0,
                fin_sent: false,
            }),
        }
    }

    /// Stream identifier.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Direction capability.
    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    /// Current lifecycle condition.
    pub fn state(&self) -> StreamState {
        self.inner.lock().state
    }

    /// Accept inbound stream data at `offset`.
    ///
    /// Newly contiguous bytes are delivered to the listener in offset
    /// order, exactly once. Gapped data is retained until the gap fills.
    pub fn on_data(&self, offset: StreamOffset, data: Bytes, fin: bool) -> Result<()> {
        if !self.stream_type.can_receive() {
            return Err(Error::InvalidStreamDirection { stream_id: self.id });
        }

        let deliverable = {
            let mut inner = self.inner.lock();
            match inner.state {
                StreamState::Reset => {
                    return Err(Error::StreamAlreadyReset { stream_id: self.id })
                }
                StreamState::Closed => return Err(Error::StreamClosed { stream_id: self.id }),
                StreamState::Open => {}
            }

            let deliverable = inner.recv.insert(offset, data, fin);
            if inner.recv.is_complete() {
                debug!(stream_id = %self.id, "stream finished");
                inner.state = StreamState::Closed;
            }
            deliverable
        };

        for chunk in deliverable {
            self.listener.on_data(self.id, chunk);
        }
        Ok(())
    }

    /// Accept an inbound reset.
    ///
    /// Terminal: buffered undelivered data is discarded and the listener
    /// is notified once. Repeated resets, or a reset after a clean close,
    /// are ignored.
    pub fn on_reset(&self, error_code: ErrorCode, offset: StreamOffset) {
        {
            let mut inner = self.inner.lock();
            if inner.state != StreamState::Open {
                debug!(stream_id = %self.id, "reset on terminated stream ignored");
                return;
            }
            inner.recv.clear();
            inner.state = StreamState::Reset;
        }
        self.listener.on_reset(self.id, error_code, offset);
    }

    /// Send `data` on this stream at the current send offset.
    ///
    /// `fin` marks the end of the send direction; nothing more can be
    /// written afterwards.
    pub fn write(&self, data: Bytes, fin: bool) -> Result<()> {
        if !self.stream_type.can_send() {
            return Err(Error::InvalidStreamDirection { stream_id: self.id });
        }

        let frame = {
            let mut inner = self.inner.lock();
            match inner.state {
                StreamState::Reset => {
                    return Err(Error::StreamAlreadyReset { stream_id: self.id })
                }
                StreamState::Closed => return Err(Error::StreamClosed { stream_id: self.id }),
                StreamState::Open => {}
            }
            if inner.fin_sent {
                return Err(Error::StreamClosed { stream_id: self.id });
            }

            let offset = inner.send_offset;
            inner.send_offset += data.len() as u64;
            inner.fin_sent = fin;

            Frame::Stream(StreamFrame {
                stream_id: self.id,
                offset,
                fin,
                data,
            })
        };

        self.connection()?.send_frames(vec![frame]);
        Ok(())
    }

    /// Reset the send direction of this stream.
    ///
    /// Terminal for the whole stream; already-terminated streams reject
    /// the call.
    pub fn reset(&self, error_code: ErrorCode) -> Result<()> {
        if !self.stream_type.can_send() {
            return Err(Error::InvalidStreamDirection { stream_id: self.id });
        }

        let frame = {
            let mut inner = self.inner.lock();
            match inner.state {
                StreamState::Reset => {
                    return Err(Error::StreamAlreadyReset { stream_id: self.id })
                }
                StreamState::Closed => return Err(Error::StreamClosed { stream_id: self.id }),
                StreamState::Open => {}
            }

            inner.recv.clear();
            inner.state = StreamState::Reset;

            Frame::RstStream(RstStreamFrame {
                stream_id: self.id,
                error_code,
                offset: inner.send_offset,
            })
        };

        self.connection()?.send_frames(vec![frame]);
        Ok(())
    }

    fn connection(&self) -> Result<Arc<Connection>> {
        self.connection
            .upgrade()
            .ok_or(Error::Internal("connection released"))
    }
}

impl core::fmt::Debug for Stream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("type", &self.stream_type)
            .field("state", &self.state())
            .finish()
    }
}
