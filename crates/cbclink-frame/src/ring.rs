use tracing::warn;

use crate::codec::RING_BUFFER_SIZE;
use crate::error::{FrameError, Result};

/// Fixed-capacity circular byte buffer.
///
/// `head` is the next byte to read, `tail` the next slot to write. One slot
/// always stays free, so `head == tail` means empty and at most
/// `capacity - 1` bytes are ever buffered.
pub struct RingBuffer {
    buf: Box<[u8]>,
    head: usize,
    tail: usize,
    mask: usize,
}

impl RingBuffer {
    /// Create a ring with the default capacity.
    pub fn new() -> Self {
        Self::alloc(RING_BUFFER_SIZE)
    }

    /// Create a ring with an explicit capacity, which must be a power of two.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() || capacity < 2 {
            return Err(FrameError::InvalidConfig(format!(
                "ring capacity {capacity} is not a power of two"
            )));
        }
        Ok(Self::alloc(capacity))
    }

    fn alloc(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            mask: capacity - 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of unread bytes.
    pub fn available(&self) -> usize {
        self.tail.wrapping_sub(self.head) & self.mask
    }

    /// Number of bytes that can still be appended.
    pub fn free(&self) -> usize {
        self.mask - self.available()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Copy `bytes` into the ring.
    ///
    /// Stops at the first byte that would overwrite unread data; everything
    /// written before that point is kept.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let room = self.free();
        let take = bytes.len().min(room);

        let first = take.min(self.buf.len() - self.tail);
        self.buf[self.tail..self.tail + first].copy_from_slice(&bytes[..first]);
        self.buf[..take - first].copy_from_slice(&bytes[first..take]);
        self.tail = (self.tail + take) & self.mask;

        if take < bytes.len() {
            let dropped = bytes.len() - take;
            warn!(written = take, dropped, "cbc ring buffer is full");
            return Err(FrameError::RingFull {
                written: take,
                dropped,
            });
        }
        Ok(())
    }

    /// Drop `n` bytes from the head. The caller keeps `n <= available()`.
    pub fn skip(&mut self, n: usize) {
        debug_assert!(n <= self.available());
        self.head = (self.head + n) & self.mask;
    }

    /// The byte `offset` positions past the head.
    pub fn peek(&self, offset: usize) -> u8 {
        self.buf[(self.head + offset) & self.mask]
    }

    /// Checksum over `len` bytes starting `offset` past the head, read in
    /// place across the wrap point.
    pub fn checksum(&self, offset: usize, len: usize) -> u8 {
        let (a, b) = self.window(offset, len);
        crate::codec::checksum(a).wrapping_add(crate::codec::checksum(b))
    }

    /// Copy `dst.len()` bytes starting `offset` past the head into `dst`.
    pub fn copy_out(&self, offset: usize, dst: &mut [u8]) {
        let (a, b) = self.window(offset, dst.len());
        dst[..a.len()].copy_from_slice(a);
        dst[a.len()..].copy_from_slice(b);
    }

    /// The two contiguous halves of a wrapped window.
    fn window(&self, offset: usize, len: usize) -> (&[u8], &[u8]) {
        debug_assert!(len < self.buf.len());
        let start = (self.head + offset) & self.mask;
        let first = len.min(self.buf.len() - start);
        (&self.buf[start..start + first], &self.buf[..len - first])
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("available", &self.available())
            .finish()
    }
}
