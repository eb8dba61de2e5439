/// Errors that can occur while dispatching CBC service requests.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] cbclink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] cbclink_frame::FrameError),

    /// Signal table error.
    #[error("table error: {0}")]
    Tables(#[from] cbclink_tables::TableError),

    /// A multi-id invalidation lists more ids than a service can carry.
    #[error("invalidation of {count} ids exceeds service size {max}")]
    InvalidationTooLong { count: usize, max: usize },

    /// A multi-signal payload walks past the end of the service region.
    #[error("signal offset {offset} exceeds service size {max}")]
    SignalOverrun { offset: usize, max: usize },

    /// The worker on the other side of a hand-off has gone away.
    #[error("worker disconnected: {0}")]
    Disconnected(&'static str),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
