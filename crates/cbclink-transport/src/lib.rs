//! Byte-sink abstraction for CBC logical channels.
//!
//! Every outgoing transmission in the CBC stack is a call to
//! [`Transmit::transmit`] with a logical channel id and a byte slice:
//! - framed packets go to the virtual serial line
//! - unframed service payloads go to the native device channels
//!
//! [`ChannelWriters`] is the sink for real devices: one `Write` per channel
//! (the serial pty, native device nodes, capture files). [`MemoryTransport`]
//! records transmissions for tests and offline replay.
//!
//! This is the lowest layer of cbclink. Everything else builds on top of
//! the [`Transmit`] trait provided here.

pub mod error;
pub mod memory;
pub mod traits;
pub mod writer;

pub use error::{Result, TransportError};
pub use memory::{MemoryTransport, Transmission};
pub use traits::Transmit;
pub use writer::ChannelWriters;
