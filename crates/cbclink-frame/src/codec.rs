use crate::channel::Priority;
use crate::error::{FrameError, Result};

/// Capacity of the receive ring buffer (power of two).
pub const RING_BUFFER_SIZE: usize = 256;

/// Start-of-frame marker.
pub const SOF_VALUE: u8 = 0x05;

pub const SOF_POS: usize = 0;
pub const ELS_POS: usize = 1;
pub const ADDR_POS: usize = 2;
pub const SRV_POS: usize = 3;
pub const PAYLOAD_POS: usize = 4;

/// SOF + link byte + checksum.
pub const LINK_HDR_SIZE: usize = 3;
pub const ADDR_HDR_SIZE: usize = 1;
pub const SRV_HDR_SIZE: usize = 1;
pub const CHKSUM_SIZE: usize = 1;

pub const MIN_FRAME_SIZE: usize = 8;
pub const MAX_FRAME_SIZE: usize = 96;
pub const MAX_SERVICE_SIZE: usize = 64;

/// Frames are padded to a multiple of this many bytes.
pub const GRANULARITY: usize = 4;

/// The link length field counts service bytes in units of this size.
pub const LEN_UNIT: usize = 4;

/// Size of the byte buffer carried by every request.
pub const REQUEST_BUFFER_SIZE: usize = MAX_FRAME_SIZE;

pub const EXT_OFFSET: u8 = 6;
pub const EXT_MASK: u8 = 0x3;
pub const EXT_VALUE: u8 = 0x0;
pub const LEN_OFFSET: u8 = 2;
pub const LEN_MASK: u8 = 0xF;
pub const SEQ_OFFSET: u8 = 0;
pub const SEQ_MASK: u8 = 0x3;

pub const MUX_OFFSET: u8 = 3;
pub const MUX_MASK: u8 = 0x1F;
pub const PRIO_OFFSET: u8 = 0;
pub const PRIO_MASK: u8 = 0x7;

/// Additive checksum: low byte of the sum of `0x100 - b` over `data`.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc.wrapping_add(b.wrapping_neg()))
}

/// The packed link-layer byte.
///
/// ```text
///  7   6   5   4   3   2   1   0
/// ┌───────┬───────────────┬───────┐
/// │  ext  │    length     │  seq  │
/// └───────┴───────────────┴───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHeader {
    pub extension: u8,
    pub length: u8,
    pub sequence: u8,
}

impl LinkHeader {
    /// Build the header for a service payload of `srv_len` bytes.
    ///
    /// `srv_len` must be non-zero; zero would underflow the length field.
    pub fn for_service(srv_len: usize, sequence: u8) -> Self {
        Self {
            extension: EXT_VALUE,
            length: (((srv_len - 1) / LEN_UNIT) as u8) & LEN_MASK,
            sequence: sequence & SEQ_MASK,
        }
    }

    pub fn unpack(byte: u8) -> Self {
        Self {
            extension: (byte >> EXT_OFFSET) & EXT_MASK,
            length: (byte >> LEN_OFFSET) & LEN_MASK,
            sequence: (byte >> SEQ_OFFSET) & SEQ_MASK,
        }
    }

    pub fn pack(self) -> u8 {
        ((self.extension & EXT_MASK) << EXT_OFFSET)
            | ((self.length & LEN_MASK) << LEN_OFFSET)
            | ((self.sequence & SEQ_MASK) << SEQ_OFFSET)
    }

    /// Service bytes announced by the length field. Zero encodes one unit.
    pub fn service_len(self) -> usize {
        (self.length as usize + 1) * LEN_UNIT
    }

    /// Total frame length announced by this header.
    pub fn frame_len(self) -> usize {
        self.service_len() + LINK_HDR_SIZE + ADDR_HDR_SIZE
    }
}

/// The packed address-layer byte: channel mux id and priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressHeader {
    pub mux: u8,
    pub priority: Priority,
}

impl AddressHeader {
    pub fn unpack(byte: u8) -> Self {
        Self {
            mux: (byte >> MUX_OFFSET) & MUX_MASK,
            priority: Priority::from_bits((byte >> PRIO_OFFSET) & PRIO_MASK),
        }
    }

    pub fn pack(self) -> u8 {
        ((self.mux & MUX_MASK) << MUX_OFFSET) | (((self.priority as u8) & PRIO_MASK) << PRIO_OFFSET)
    }
}

/// Pad `buf` so that `size` becomes a multiple of `unit`.
///
/// The bytes from the would-be checksum slot up to the padded length are
/// filled with `0xFF`. Returns the padded length.
pub fn fill_padding(buf: &mut [u8], size: usize, unit: usize) -> usize {
    let left = size % unit;
    if left == 0 {
        return size;
    }
    let padded = size + unit - left;
    buf[size - CHKSUM_SIZE..padded].fill(0xFF);
    padded
}

/// Configuration for the CBC framer and deframer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Receive ring capacity in bytes. Must be a power of two.
    pub ring_capacity: usize,
    /// Smallest possible frame; fewer buffered bytes never parse.
    pub min_frame_size: usize,
    /// Frames announcing more than this are treated as corrupt.
    pub max_frame_size: usize,
    /// Largest service payload (command byte included) that may be framed.
    pub max_service_size: usize,
    /// Outgoing frames are padded to a multiple of this.
    pub granularity: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            ring_capacity: RING_BUFFER_SIZE,
            min_frame_size: MIN_FRAME_SIZE,
            max_frame_size: MAX_FRAME_SIZE,
            max_service_size: MAX_SERVICE_SIZE,
            granularity: GRANULARITY,
        }
    }
}

impl FrameConfig {
    /// Check that the sizes are consistent with each other and the wire format.
    pub fn validate(&self) -> Result<()> {
        if !self.ring_capacity.is_power_of_two() || self.ring_capacity < 2 {
            return Err(FrameError::InvalidConfig(format!(
                "ring capacity {} is not a power of two",
                self.ring_capacity
            )));
        }
        if self.max_frame_size >= self.ring_capacity {
            return Err(FrameError::InvalidConfig(format!(
                "max frame size {} does not fit a ring of {}",
                self.max_frame_size, self.ring_capacity
            )));
        }
        if self.max_frame_size > REQUEST_BUFFER_SIZE {
            return Err(FrameError::InvalidConfig(format!(
                "max frame size {} exceeds request buffer {REQUEST_BUFFER_SIZE}",
                self.max_frame_size
            )));
        }
        if self.min_frame_size < PAYLOAD_POS + CHKSUM_SIZE
            || self.min_frame_size > self.max_frame_size
        {
            return Err(FrameError::InvalidConfig(format!(
                "min frame size {} out of range",
                self.min_frame_size
            )));
        }
        if self.granularity == 0 {
            return Err(FrameError::InvalidConfig("granularity must be non-zero".into()));
        }
        let largest = self.max_service_size + ADDR_HDR_SIZE + LINK_HDR_SIZE;
        if largest.div_ceil(self.granularity) * self.granularity > REQUEST_BUFFER_SIZE {
            return Err(FrameError::InvalidConfig(format!(
                "max service size {} does not fit the request buffer",
                self.max_service_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn checksum_of_zeroes_is_zero() {
        assert_eq!(checksum(&[0, 0, 0]), 0);
    }

    #[test]
    fn checksum_matches_definition() {
        // (0x100 - 0x05) + (0x100 - 0x01) = 0x1FA -> 0xFA
        assert_eq!(checksum(&[0x05, 0x01]), 0xFA);
        assert_eq!(checksum(&[0xFF]), 0x01);
    }

    #[test]
    fn frame_plus_checksum_sums_to_zero() {
        let data = [0x05, 0x04, 0x0B, 0x02, 0x01, 0x10, 0x20];
        let sum = checksum(&data);
        let total = data.iter().fold(sum, |acc, b| acc.wrapping_add(*b));
        assert_eq!(total, 0);
    }

    #[test]
    fn link_header_bit_layout() {
        let header = LinkHeader {
            extension: 0x2,
            length: 0x9,
            sequence: 0x1,
        };
        assert_eq!(header.pack(), 0b10_1001_01);
        assert_eq!(LinkHeader::unpack(0b10_1001_01), header);
    }

    #[test]
    fn length_zero_means_one_unit() {
        let header = LinkHeader::unpack(0x00);
        assert_eq!(header.service_len(), 4);
        assert_eq!(header.frame_len(), MIN_FRAME_SIZE);
    }

    #[test]
    fn length_field_for_service() {
        assert_eq!(LinkHeader::for_service(1, 0).length, 0);
        assert_eq!(LinkHeader::for_service(4, 0).length, 0);
        assert_eq!(LinkHeader::for_service(5, 0).length, 1);
        assert_eq!(LinkHeader::for_service(MAX_SERVICE_SIZE, 0).length, 15);
        assert_eq!(LinkHeader::for_service(5, 6).sequence, 2);
    }

    #[test]
    fn address_header_bit_layout() {
        let addr = AddressHeader {
            mux: 2,
            priority: Priority::High,
        };
        assert_eq!(addr.pack(), (2 << 3) | 3);
        assert_eq!(AddressHeader::unpack(addr.pack()), addr);
    }

    #[test]
    fn padding_fills_from_checksum_slot() {
        let mut buf = [0u8; 16];
        let padded = fill_padding(&mut buf, 9, 4);
        assert_eq!(padded, 12);
        assert_eq!(&buf[..8], &[0; 8]);
        assert_eq!(&buf[8..12], &[0xFF; 4]);
        assert_eq!(&buf[12..], &[0; 4]);
    }

    #[test]
    fn aligned_size_is_untouched() {
        let mut buf = [0u8; 8];
        assert_eq!(fill_padding(&mut buf, 8, 4), 8);
        assert_eq!(buf, [0u8; 8]);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(FrameConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_ring() {
        let cfg = FrameConfig {
            ring_capacity: 100,
            ..FrameConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(FrameError::InvalidConfig(_))));

        let cfg = FrameConfig {
            ring_capacity: 64,
            ..FrameConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(FrameError::InvalidConfig(_))));
    }

    #[test]
    fn config_rejects_oversized_service() {
        let cfg = FrameConfig {
            max_service_size: 200,
            ..FrameConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(FrameError::InvalidConfig(_))));
    }

    proptest! {
        #[test]
        fn single_byte_corruption_changes_checksum(
            data in proptest::collection::vec(any::<u8>(), 1..96),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let original = checksum(&data);
            let mut corrupted = data.clone();
            let i = index.index(corrupted.len());
            corrupted[i] ^= 1 << bit;
            prop_assert_ne!(checksum(&corrupted), original);
        }
    }
}
