//! # Per-Connection Stream Set
//!
//! Streams are created lazily on first reference: either a local open or
//! the first received frame naming the id.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use super::stream::{Stream, StreamListener};
use crate::connection::Connection;
use crate::types::{StreamId, StreamType};

/// The set of logical streams owned by one connection.
pub struct Streams {
    connection: Weak<Connection>,
    streams: Mutex<HashMap<StreamId, Arc<Stream>>>,
}

impl Streams {
    pub(crate) fn new(connection: Weak<Connection>) -> Self {
        Self {
            connection,
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Return the stream registered for `id`, creating it with the given
    /// direction capability and delivery listener if it does not exist.
    ///
    /// Idempotent for the same id: an existing stream is returned as-is.
    pub fn get_or_create(
        &self,
        id: StreamId,
        stream_type: StreamType,
        listener: &Arc<dyn StreamListener>,
    ) -> Arc<Stream> {
        self.streams
            .lock()
            .entry(id)
            .or_insert_with(|| {
                debug!(stream_id = %id, ?stream_type, "creating stream");
                Arc::new(Stream::new(
                    id,
                    stream_type,
                    self.connection.clone(),
                    listener.clone(),
                ))
            })
            .clone()
    }

    /// Look up an existing stream without creating one.
    pub fn get(&self, id: StreamId) -> Option<Arc<Stream>> {
        self.streams.lock().get(&id).cloned()
    }

    /// Number of streams created so far.
    pub fn len(&self) -> usize {
        self.streams.lock().len()
    }

    /// Check whether any stream has been created.
    pub fn is_empty(&self) -> bool {
        self.streams.lock().is_empty()
    }
}
