//! CBC link-layer stack: several logical channels over one serial line.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte sinks for the serial line and device channels
//! - [`frame`]: ring buffer, checksum, framer and deframer
//! - [`tables`]: signal, group and whitelist tables (behind `service` feature)
//! - [`service`]: lifecycle, signal filtering and rx/tx workers (behind `service` feature)

/// Re-export transport types.
pub mod transport {
    pub use cbclink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cbclink_frame::*;
}

/// Re-export table types (requires `service` feature).
#[cfg(feature = "service")]
pub mod tables {
    pub use cbclink_tables::*;
}

/// Re-export service types (requires `service` feature).
#[cfg(feature = "service")]
pub mod service {
    pub use cbclink_service::*;
}
