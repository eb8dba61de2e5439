use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cbclink_frame::CbcRequest;
use cbclink_tables::SignalTables;

/// Which worker a packet must be processed by next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueType {
    /// Serial line toward device channels.
    Rx,
    /// Device channels toward the serial line.
    Tx,
}

/// A request on its way through one of the workers.
#[derive(Debug, Clone)]
pub struct CbcPacket {
    pub req: CbcRequest,
    pub qtype: QueueType,
}

impl CbcPacket {
    pub fn rx(req: CbcRequest) -> Self {
        Self {
            req,
            qtype: QueueType::Rx,
        }
    }

    pub fn tx(req: CbcRequest) -> Self {
        Self {
            req,
            qtype: QueueType::Tx,
        }
    }
}

/// Heartbeat and wakeup-reason state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleState {
    /// Guest heartbeat reads as active.
    pub hb_state: bool,
    /// Last SoC state applied on the transmit path.
    pub soc_active: bool,
    /// Reason reported until the SoC first becomes active; 0 when cleared.
    pub boot_reason: u32,
    /// Last wakeup reason broadcast.
    pub reason: u32,
}

/// State shared by the receive and transmit workers of one link.
#[derive(Debug)]
pub struct Session {
    lifecycle: Mutex<LifecycleState>,
    signal_open: AtomicBool,
    tables: Arc<SignalTables>,
}

impl Session {
    pub fn new(tables: Arc<SignalTables>) -> Self {
        Self {
            lifecycle: Mutex::new(LifecycleState::default()),
            signal_open: AtomicBool::new(false),
            tables,
        }
    }

    /// Seed the reason reported before the SoC comes up.
    pub fn with_boot_reason(self, boot_reason: u32) -> Self {
        self.lifecycle().boot_reason = boot_reason;
        self
    }

    pub fn tables(&self) -> &SignalTables {
        &self.tables
    }

    pub(crate) fn lifecycle(&self) -> MutexGuard<'_, LifecycleState> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the lifecycle state.
    pub fn lifecycle_state(&self) -> LifecycleState {
        *self.lifecycle()
    }

    /// Whether the guest has opened the signal channel.
    pub fn signal_channel_open(&self) -> bool {
        self.signal_open.load(Ordering::Acquire)
    }

    pub(crate) fn set_signal_channel_open(&self, open: bool) {
        self.signal_open.store(open, Ordering::Release);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Arc::new(SignalTables::new()))
    }
}
