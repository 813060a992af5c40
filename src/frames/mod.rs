//! # Frame Model
//!
//! Self-delimiting units of protocol or application data carried inside a
//! packet's payload. `types` defines the closed frame sum type, `codec`
//! the wire parse/serialize pair.

pub mod codec;
pub mod types;

pub use types::{AckFrame, AckRange, Frame, PingFrame, PongFrame, RstStreamFrame, StreamFrame};
