use cbclink_transport::TransportError;

/// Errors that can occur during CBC framing and deframing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The ring buffer filled up while absorbing incoming bytes.
    #[error("ring buffer full ({written} bytes stored, {dropped} dropped)")]
    RingFull { written: usize, dropped: usize },

    /// The service payload exceeds the configured maximum size.
    #[error("service payload too large ({size} bytes, max {max})")]
    ServiceTooLarge { size: usize, max: usize },

    /// A request with no service bytes cannot be framed.
    #[error("service payload is empty")]
    EmptyService,

    /// The frame configuration is inconsistent.
    #[error("invalid frame config: {0}")]
    InvalidConfig(String),

    /// Transmitting the packed bytes failed.
    #[error("transmit failed: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error occurred while reading from the serial source.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial source reached end of stream.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
