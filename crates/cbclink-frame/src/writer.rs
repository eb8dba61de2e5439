use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use cbclink_transport::Transmit;
use tracing::{debug, warn};

use crate::channel::{priority_for, VIRTUAL_UART};
use crate::codec::{
    checksum, fill_padding, AddressHeader, FrameConfig, LinkHeader, ADDR_HDR_SIZE, ADDR_POS,
    ELS_POS, LINK_HDR_SIZE, SEQ_MASK, SOF_POS, SOF_VALUE, SRV_POS,
};
use crate::error::{FrameError, Result};
use crate::request::CbcRequest;

/// Transmit sequence counter of one serial line.
///
/// Clones share the counter, so every writer framing onto the same line
/// draws from one wrapping sequence.
#[derive(Debug, Clone, Default)]
pub struct TxSequence(Arc<AtomicU8>);

impl TxSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next frame will carry.
    pub fn current(&self) -> u8 {
        self.0.load(Ordering::Acquire) & SEQ_MASK
    }

    /// Take the current sequence number and advance the counter.
    pub fn advance(&self) -> u8 {
        // 256 is a multiple of the sequence range, so u8 wrap-around keeps
        // the masked value continuous.
        self.0.fetch_add(1, Ordering::AcqRel) & SEQ_MASK
    }
}

/// Frames outgoing requests and hands them to a [`Transmit`] sink.
///
/// Each writer starts with its own [`TxSequence`]; writers that share one
/// serial line should share it through [`FrameWriter::with_sequence`].
pub struct FrameWriter<T> {
    inner: T,
    tx_seq: TxSequence,
    config: FrameConfig,
}

impl<T> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            tx_seq: TxSequence::new(),
            config: FrameConfig::default(),
        }
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner,
            tx_seq: TxSequence::new(),
            config,
        })
    }

    /// Draw transmit sequence numbers from `seq` instead of a private counter.
    pub fn with_sequence(mut self, seq: TxSequence) -> Self {
        self.tx_seq = seq;
        self
    }

    /// The sequence counter this writer draws from.
    pub fn sequence(&self) -> &TxSequence {
        &self.tx_seq
    }

    /// Write the address byte: the request's channel id and its priority.
    pub fn pack_address(&self, req: &mut CbcRequest) {
        req.buf[ADDR_POS] = AddressHeader {
            mux: req.id,
            priority: priority_for(req.id),
        }
        .pack();
    }

    /// Write the link header, padding and checksum around the service bytes.
    ///
    /// On success `link_len` holds the padded frame length and the transmit
    /// sequence advances.
    pub fn pack_link(&mut self, req: &mut CbcRequest) -> Result<()> {
        if req.srv_len > self.config.max_service_size {
            debug!(srv_len = req.srv_len, "refusing to pack oversized service");
            return Err(FrameError::ServiceTooLarge {
                size: req.srv_len,
                max: self.config.max_service_size,
            });
        }
        if req.srv_len == 0 {
            return Err(FrameError::EmptyService);
        }

        let len = req.srv_len + ADDR_HDR_SIZE + LINK_HDR_SIZE;
        let len = fill_padding(&mut req.buf, len, self.config.granularity);

        req.buf[SOF_POS] = SOF_VALUE;
        req.buf[ELS_POS] = LinkHeader::for_service(req.srv_len, self.tx_seq.advance()).pack();
        req.buf[len - 1] = checksum(&req.buf[..len - 1]);
        req.link_len = len;
        Ok(())
    }

    /// Address-pack then link-pack a request from a device channel.
    pub fn pack(&mut self, req: &mut CbcRequest) -> Result<()> {
        self.pack_address(req);
        self.pack_link(req)
    }

    /// Sequence number the next framed request will carry.
    pub fn tx_sequence(&self) -> u8 {
        self.tx_seq.current()
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transmit> FrameWriter<T> {
    /// Send a request toward its destination.
    ///
    /// A request with `link_len == 0` came from a device channel: it is
    /// framed and sent on the virtual serial line. Otherwise it came off the
    /// serial line and only its service bytes go out, on its own channel.
    pub fn send(&mut self, req: &mut CbcRequest) -> Result<usize> {
        let channel = if req.link_len == 0 {
            self.pack(req)?;
            VIRTUAL_UART
        } else {
            req.id
        };

        let data = if channel == VIRTUAL_UART {
            &req.buf[..req.link_len]
        } else {
            let end = SRV_POS + req.srv_len;
            if end > req.buf.len() {
                return Err(FrameError::ServiceTooLarge {
                    size: req.srv_len,
                    max: req.buf.len() - SRV_POS,
                });
            }
            &req.buf[SRV_POS..end]
        };

        self.inner.transmit(channel, data).map_err(|err| {
            warn!(channel, error = %err, "cbc transmit failed");
            FrameError::Transport(err)
        })
    }
}

impl<T> std::fmt::Debug for FrameWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("tx_seq", &self.tx_seq.current())
            .field("config", &self.config)
            .finish()
    }
}
