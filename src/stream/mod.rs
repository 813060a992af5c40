//! # Stream Multiplexing
//!
//! Logical streams within a connection: lazy creation, out-of-order
//! reassembly into ordered byte delivery, direction capabilities, and
//! reset semantics.

pub mod manager;
pub mod reassembly;
pub mod stream;

pub use manager::Streams;
pub use reassembly::ReceiveBuffer;
pub use stream::{Stream, StreamListener, StreamState};

pub use crate::types::{StreamId, StreamType};
