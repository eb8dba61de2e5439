use std::fmt;
use std::io;

use cbclink_frame::FrameError;
use cbclink_service::ServiceError;
use cbclink_tables::TableError;
use cbclink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io { source, .. } => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ServiceTooLarge { .. } | FrameError::EmptyService => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::Transport(_) => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn table_error(context: &str, err: TableError) -> CliError {
    match err {
        TableError::LoadFailed(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn service_error(context: &str, err: ServiceError) -> CliError {
    match err {
        ServiceError::Frame(err) => frame_error(context, err),
        ServiceError::Tables(err) => table_error(context, err),
        ServiceError::Transport(_) => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        ServiceError::InvalidationTooLong { .. } | ServiceError::SignalOverrun { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_service_is_data_invalid() {
        let err = frame_error("encode failed", FrameError::ServiceTooLarge { size: 70, max: 64 });
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("encode failed: "));
    }

    #[test]
    fn closed_channel_is_transport_error() {
        let err = transport_error("write failed", TransportError::Closed(19));
        assert_eq!(err.code, TRANSPORT_ERROR);

        let denied = TransportError::Io {
            channel: 7,
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(transport_error("write failed", denied).code, PERMISSION_DENIED);
    }

    #[test]
    fn missing_table_file_is_usage() {
        let err = table_error("tables", TableError::LoadFailed("missing".into()));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn nested_service_errors_unwrap() {
        let err = service_error(
            "submit failed",
            ServiceError::Frame(FrameError::EmptyService),
        );
        assert_eq!(err.code, DATA_INVALID);
    }
}
