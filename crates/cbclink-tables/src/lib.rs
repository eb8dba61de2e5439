//! Signal, group and whitelist tables for CBC signal forwarding.
//!
//! Signals carry a bit width used to walk multi-signal payloads; signals and
//! groups carry an activation flag that invalidation commands clear.
//! Whitelists decide which ids may be forwarded at all.
//!
//! Tables are described by a JSON document ([`TableConfig`]) and turned into
//! runtime [`SignalTables`] shared by the receive and transmit paths.

pub mod config;
pub mod error;
pub mod registry;
pub mod whitelist;

pub use config::{GroupEntry, LoadLimits, SignalEntry, TableConfig, WhitelistConfig};
pub use error::{Result, TableError};
pub use registry::SignalTables;
pub use whitelist::Whitelist;
