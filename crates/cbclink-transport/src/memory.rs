use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::Transmit;

/// One recorded call to [`Transmit::transmit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    /// Logical channel the bytes were sent on.
    pub channel: u8,
    /// The transmitted bytes.
    pub data: Bytes,
}

/// In-memory sink that records every transmission.
///
/// Clones share the same log, so one handle can be given to the stack while
/// another inspects what was sent.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    log: Arc<Mutex<Vec<Transmission>>>,
    refused: Arc<Mutex<Vec<u8>>>,
}

impl MemoryTransport {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transmission on `channel` fail with `Closed`.
    pub fn refuse(&self, channel: u8) {
        self.refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(channel);
    }

    /// Snapshot of all transmissions so far.
    pub fn sent(&self) -> Vec<Transmission> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return all transmissions so far.
    pub fn take(&self) -> Vec<Transmission> {
        std::mem::take(&mut *self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Transmit for MemoryTransport {
    fn transmit(&mut self, channel: u8, data: &[u8]) -> Result<usize> {
        let refused = self
            .refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&channel);
        if refused {
            return Err(TransportError::Closed(channel));
        }

        trace!(channel, len = data.len(), "recorded transmission");
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Transmission {
                channel,
                data: Bytes::copy_from_slice(data),
            });
        Ok(data.len())
    }
}
