use std::io::{ErrorKind, Read};

use tracing::{debug, trace, warn};

use crate::codec::{FrameConfig, LinkHeader, ELS_POS, SEQ_MASK, SOF_POS, SOF_VALUE};
use crate::error::{FrameError, Result};
use crate::request::CbcRequest;
use crate::ring::RingBuffer;

/// Counters kept by the deframer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames accepted and emitted.
    pub frames: u64,
    /// Bytes dropped one at a time while resynchronizing.
    pub skipped: u64,
    /// Frames whose announced length exceeded the maximum.
    pub oversized: u64,
    pub checksum_errors: u64,
    /// Accepted frames whose sequence did not follow the previous one.
    pub sequence_errors: u64,
    /// Incoming bytes lost because the ring was full.
    pub overflow_drops: u64,
}

/// Incremental CBC deframer over a ring buffer.
///
/// Bytes are pushed in (or read from the inner stream) in arbitrary chunks;
/// complete, checksum-valid frames come out as [`CbcRequest`]s with
/// `link_len` set. A partially received frame is remembered across calls.
pub struct FrameReader<T> {
    inner: T,
    ring: RingBuffer,
    /// Length of a frame whose header was seen but whose bytes are not all in.
    remains: usize,
    rx_seq: u8,
    config: FrameConfig,
    stats: FrameStats,
}

impl FrameReader<std::io::Empty> {
    /// A deframer fed only through [`push`](Self::push).
    pub fn detached() -> Self {
        Self::new(std::io::empty())
    }

    /// A push-fed deframer with explicit configuration.
    pub fn detached_with_config(config: FrameConfig) -> Result<Self> {
        Self::with_config(std::io::empty(), config)
    }
}

impl<T> FrameReader<T> {
    /// Create a frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            ring: RingBuffer::new(),
            remains: 0,
            rx_seq: 0,
            config: FrameConfig::default(),
            stats: FrameStats::default(),
        }
    }

    /// Create a frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner,
            ring: RingBuffer::with_capacity(config.ring_capacity)?,
            remains: 0,
            rx_seq: 0,
            config,
            stats: FrameStats::default(),
        })
    }

    /// Absorb bytes from the serial line.
    ///
    /// On overflow the bytes that fit are kept and the rest are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        let result = self.ring.append(bytes);
        if let Err(FrameError::RingFull { dropped, .. }) = &result {
            self.stats.overflow_drops += *dropped as u64;
        }
        result
    }

    /// Parse the next complete frame out of the buffered bytes.
    ///
    /// Returns `None` once more input is needed. Any structural or checksum
    /// failure drops exactly one byte and parsing resumes at the next one.
    pub fn next_request(&mut self) -> Option<CbcRequest> {
        loop {
            let available = self.ring.available();
            if available < self.config.min_frame_size || available < self.remains {
                return None;
            }
            self.remains = 0;

            if self.ring.peek(SOF_POS) != SOF_VALUE {
                debug!(byte = self.ring.peek(SOF_POS), "dropping byte before start of frame");
                self.resync();
                continue;
            }

            let header = LinkHeader::unpack(self.ring.peek(ELS_POS));
            let srv_len = header.service_len();
            let frame_len = header.frame_len();

            if frame_len > self.config.max_frame_size {
                debug!(
                    frame_len,
                    max = self.config.max_frame_size,
                    "frame length exceeds maximum"
                );
                self.stats.oversized += 1;
                self.resync();
                continue;
            }

            if available < frame_len {
                self.remains = frame_len;
                return None;
            }

            let expected = self.ring.peek(frame_len - 1);
            let actual = self.ring.checksum(0, frame_len - 1);
            if actual != expected {
                warn!(expected, actual, frame_len, "cbc frame checksum mismatch");
                self.stats.checksum_errors += 1;
                self.resync();
                continue;
            }

            self.rx_seq = (self.rx_seq + 1) & SEQ_MASK;
            if self.rx_seq != header.sequence {
                warn!(
                    expected = self.rx_seq,
                    observed = header.sequence,
                    "cbc rx sequence check failed"
                );
                self.stats.sequence_errors += 1;
                self.rx_seq = header.sequence;
            }

            let req = CbcRequest::from_ring(&self.ring, frame_len, srv_len);
            self.ring.skip(frame_len);
            self.stats.frames += 1;
            trace!(frame_len, srv_len, seq = header.sequence, "frame accepted");
            return Some(req);
        }
    }

    /// Parse every complete frame currently buffered, handing each to `sink`.
    ///
    /// Returns the number of frames emitted.
    pub fn unpack(&mut self, mut sink: impl FnMut(CbcRequest)) -> usize {
        let mut count = 0;
        while let Some(req) = self.next_request() {
            sink(req);
            count += 1;
        }
        count
    }

    fn resync(&mut self) {
        self.ring.skip(1);
        self.stats.skipped += 1;
    }

    /// Unread bytes in the ring.
    pub fn buffered(&self) -> usize {
        self.ring.available()
    }

    /// Length of the frame currently awaiting more bytes, or 0.
    pub fn pending(&self) -> usize {
        self.remains
    }

    /// Last accepted receive sequence number.
    pub fn rx_sequence(&self) -> u8 {
        self.rx_seq
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> FrameReader<T> {
    /// Read one chunk from the inner stream into the ring.
    ///
    /// Returns the number of bytes absorbed; 0 means end of stream.
    pub fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; crate::codec::RING_BUFFER_SIZE];
        let want = self.ring.free().min(chunk.len());
        if want == 0 {
            return Ok(0);
        }
        loop {
            match self.inner.read(&mut chunk[..want]) {
                Ok(n) => {
                    self.push(&chunk[..n])?;
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_request(&mut self) -> Result<CbcRequest> {
        loop {
            if let Some(req) = self.next_request() {
                return Ok(req);
            }
            if self.fill()? == 0 {
                return Err(FrameError::ConnectionClosed);
            }
        }
    }
}

impl<T> std::fmt::Debug for FrameReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("ring", &self.ring)
            .field("remains", &self.remains)
            .field("rx_seq", &self.rx_seq)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;
    use crate::channel::{LIFECYCLE, RAW0};
    use crate::codec::{checksum, MIN_FRAME_SIZE, SRV_POS};
    use crate::writer::FrameWriter;
    use cbclink_transport::MemoryTransport;

    /// Frame `service` for `channel` the way the framer would.
    fn framed(channel: u8, service: &[u8], writer: &mut FrameWriter<MemoryTransport>) -> Vec<u8> {
        let mut req = CbcRequest::from_service(channel, service).unwrap();
        writer.pack(&mut req).unwrap();
        req.frame().to_vec()
    }

    fn writer() -> FrameWriter<MemoryTransport> {
        FrameWriter::new(MemoryTransport::new())
    }

    #[test]
    fn decodes_single_frame() {
        let mut w = writer();
        let wire = framed(LIFECYCLE, &[0x02, 0x01, 0x00], &mut w);

        let mut reader = FrameReader::detached();
        reader.push(&wire).unwrap();
        let req = reader.next_request().unwrap();

        assert_eq!(req.link_len, wire.len());
        assert_eq!(req.srv_len, 4);
        assert_eq!(req.address().mux, LIFECYCLE);
        assert_eq!(req.command(), 0x02);
        assert_eq!(&req.payload()[..2], &[0x01, 0x00]);
        assert!(reader.next_request().is_none());
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn too_few_bytes_waits() {
        let mut reader = FrameReader::detached();
        reader.push(&[SOF_VALUE, 0x00, 0x08]).unwrap();
        assert!(reader.next_request().is_none());
        assert_eq!(reader.buffered(), 3);
    }

    #[test]
    fn garbage_byte_then_frame_resyncs() {
        let mut w = writer();
        let frame = framed(RAW0, &[0x10, 0x20, 0x30], &mut w);
        let mut wire = vec![0xEE];
        wire.extend_from_slice(&frame);

        let mut reader = FrameReader::detached();
        reader.push(&wire).unwrap();

        let mut out = Vec::new();
        assert_eq!(reader.unpack(|req| out.push(req)), 1);
        assert_eq!(out[0].address().mux, RAW0);
        assert_eq!(reader.stats().skipped, 1);
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn bad_checksum_skips_one_byte() {
        let mut w = writer();
        let mut wire = framed(RAW0, &[0x10, 0x20, 0x30], &mut w);
        let last = wire.len() - 1;
        wire[last] ^= 0x01;

        let mut reader = FrameReader::detached();
        reader.push(&wire).unwrap();

        assert!(reader.next_request().is_none());
        assert_eq!(reader.stats().checksum_errors, 1);
        assert_eq!(reader.buffered(), MIN_FRAME_SIZE - 1);
    }

    #[test]
    fn corrupted_frame_does_not_hide_following_frame() {
        let mut w = writer();
        let mut bad = framed(RAW0, &[0x10, 0x20, 0x30], &mut w);
        bad[SRV_POS + 1] ^= 0xFF;
        let good = framed(RAW0, &[0x11, 0x22, 0x33], &mut w);

        let mut reader = FrameReader::detached();
        reader.push(&bad).unwrap();
        reader.push(&good).unwrap();

        let req = reader.next_request().unwrap();
        assert_eq!(&req.service()[..4], &[0x11, 0x22, 0x33, 0xFF]);
        assert_eq!(reader.stats().checksum_errors, 1);
    }

    #[test]
    fn oversized_header_resyncs() {
        let cfg = FrameConfig {
            max_frame_size: 12,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::detached_with_config(cfg).unwrap();
        // Length field 0xF announces a 68-byte frame.
        let mut wire = vec![SOF_VALUE, 0xF << 2, 0x08, 0x01, 0, 0, 0];
        wire.push(checksum(&wire));
        reader.push(&wire).unwrap();

        assert!(reader.next_request().is_none());
        assert_eq!(reader.stats().oversized, 1);
        assert_eq!(reader.pending(), 0);
    }

    #[test]
    fn partial_frame_records_remains() {
        let mut w = writer();
        let wire = framed(RAW0, &[0x01; 9], &mut w);
        assert_eq!(wire.len(), 16);

        let mut reader = FrameReader::detached();
        reader.push(&wire[..10]).unwrap();
        assert!(reader.next_request().is_none());
        assert_eq!(reader.pending(), 16);

        reader.push(&wire[10..12]).unwrap();
        assert!(reader.next_request().is_none());

        reader.push(&wire[12..]).unwrap();
        let req = reader.next_request().unwrap();
        assert_eq!(req.link_len, 16);
        assert_eq!(reader.pending(), 0);
    }

    #[test]
    fn sequence_gap_is_counted_but_frame_kept() {
        let mut w = writer();
        // The writer starts at sequence 0; the reader expects 1 first.
        let first = framed(RAW0, &[0x01], &mut w);
        let second = framed(RAW0, &[0x02], &mut w);

        let mut reader = FrameReader::detached();
        reader.push(&first).unwrap();
        reader.push(&second).unwrap();

        assert_eq!(reader.unpack(|_| {}), 2);
        assert_eq!(reader.stats().sequence_errors, 1);
        assert_eq!(reader.rx_sequence(), 1);
    }

    #[test]
    fn sequence_wraps_at_mask() {
        let mut w = writer();
        let mut reader = FrameReader::detached();
        for _ in 0..9 {
            let wire = framed(RAW0, &[0x01], &mut w);
            reader.push(&wire).unwrap();
            assert!(reader.next_request().is_some());
        }
        // Only the very first frame (sequence 0) was out of step.
        assert_eq!(reader.stats().sequence_errors, 1);
        assert_eq!(reader.rx_sequence(), 0);
    }

    #[test]
    fn overflow_is_counted() {
        let cfg = FrameConfig {
            ring_capacity: 128,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::detached_with_config(cfg).unwrap();
        let err = reader.push(&[0u8; 130]).unwrap_err();
        assert!(matches!(err, FrameError::RingFull { .. }));
        assert_eq!(reader.stats().overflow_drops, 3);
    }

    #[test]
    fn read_request_from_stream() {
        let mut w = writer();
        let mut wire = framed(LIFECYCLE, &[0x01, 0x00, 0x00, 0x80], &mut w);
        wire.extend(framed(RAW0, &[0x09], &mut w));

        let mut reader = FrameReader::new(Cursor::new(wire));
        assert_eq!(reader.read_request().unwrap().address().mux, LIFECYCLE);
        assert_eq!(reader.read_request().unwrap().address().mux, RAW0);
        assert!(matches!(
            reader.read_request().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn read_request_byte_by_byte() {
        let mut w = writer();
        let wire = framed(RAW0, &[0x07, 0x08], &mut w);
        let mut reader = FrameReader::new(ByteByByteReader {
            bytes: wire,
            pos: 0,
        });
        let req = reader.read_request().unwrap();
        assert_eq!(&req.service()[..2], &[0x07, 0x08]);
    }

    #[test]
    fn interrupted_read_retries() {
        let mut w = writer();
        let wire = framed(RAW0, &[0x05], &mut w);
        let mut reader = FrameReader::new(InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire),
        });
        assert!(reader.read_request().is_ok());
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config(), &FrameConfig::default());
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    proptest! {
        #[test]
        fn split_feed_matches_single_feed(
            service in proptest::collection::vec(any::<u8>(), 1..=64),
            channel in 0u8..=18,
            split in any::<prop::sample::Index>(),
        ) {
            let mut w = writer();
            let wire = framed(channel, &service, &mut w);
            let at = split.index(wire.len());

            let mut whole = FrameReader::detached();
            whole.push(&wire).unwrap();
            let a = whole.next_request().unwrap();

            let mut parts = FrameReader::detached();
            parts.push(&wire[..at]).unwrap();
            prop_assert!(parts.next_request().is_none());
            parts.push(&wire[at..]).unwrap();
            let b = parts.next_request().unwrap();

            prop_assert_eq!(a.frame(), b.frame());
            prop_assert_eq!(a.srv_len, b.srv_len);
            prop_assert_eq!(&b.service()[..service.len()], service.as_slice());
        }
    }
}
