//! CBC link-layer framing with channel multiplexing over one serial line.
//!
//! Every frame on the wire carries:
//! - a start-of-frame marker (`0x05`)
//! - one packed link byte (extension, length, sequence)
//! - one packed address byte (channel mux id, priority)
//! - the service command byte and its payload, padded with `0xFF`
//! - a trailing additive checksum
//!
//! Incoming bytes accumulate in a fixed ring buffer; [`FrameReader`]
//! resynchronizes byte by byte on any corruption and never stalls.

pub mod channel;
pub mod codec;
pub mod error;
pub mod reader;
pub mod request;
pub mod ring;
pub mod writer;

pub use channel::{
    channel_name, is_raw, priority_for, Priority, DIAG, DLT, EARLY_SIGNAL, LIFECYCLE, LINDA,
    LOCAL_EVENT, PMT, RAW0, RAW11, SIGNAL, VIRTUAL_UART,
};
pub use codec::{checksum, AddressHeader, FrameConfig, LinkHeader};
pub use error::{FrameError, Result};
pub use reader::{FrameReader, FrameStats};
pub use request::{CbcRequest, RequestType};
pub use ring::RingBuffer;
pub use writer::{FrameWriter, TxSequence};
