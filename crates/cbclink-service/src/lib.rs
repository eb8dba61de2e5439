//! CBC service layer: routing of deframed and device-originated requests.
//!
//! Requests are dispatched by channel:
//! - lifecycle: heartbeat tracking and wakeup-reason broadcasts
//! - signal: whitelist filtering, invalidation and the channel gate
//! - raw: passed straight through
//!
//! [`RxWorker`] handles the serial line, [`TxWorker`] the device channels.
//! They share one [`Session`] and are wired together by [`link`].

pub mod command;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod packet;
pub mod signal;
pub mod worker;

pub use command::{
    HeartbeatCommand, LifecycleCommand, SignalCommand, WAKEUP_REASON_MASK, WAKEUP_REASON_SOC,
};
pub use error::{Result, ServiceError};
pub use handler::ServiceHandler;
pub use packet::{CbcPacket, LifecycleState, QueueType, Session};
pub use signal::{filter_signals, FilteredSignals, InvalidationScope};
pub use worker::{link, link_with_config, RxWorker, TxWorker};
