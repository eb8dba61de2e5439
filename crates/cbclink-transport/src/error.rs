/// Errors that can occur while transmitting on a logical channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No sink is attached to the requested channel.
    #[error("no sink attached to channel {0}")]
    UnknownChannel(u8),

    /// The sink accepted zero bytes; the peer end is gone.
    #[error("channel {0} closed")]
    Closed(u8),

    /// An I/O error occurred on the channel sink.
    #[error("transmit I/O error on channel {channel}: {source}")]
    Io {
        channel: u8,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TransportError>;
