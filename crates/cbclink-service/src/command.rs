//! Service command codes carried in the byte after the address header.

/// Wakeup reason bits that fit in the three payload bytes.
pub const WAKEUP_REASON_MASK: u32 = 0x00FF_FFFF;
/// Wakeup reason bit set while the SoC is active.
pub const WAKEUP_REASON_SOC: u32 = 1 << 23;

/// Commands on the lifecycle channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleCommand {
    WakeupReason = 1,
    Heartbeat = 2,
    Rtc = 3,
}

impl TryFrom<u8> for LifecycleCommand {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            1 => Ok(Self::WakeupReason),
            2 => Ok(Self::Heartbeat),
            3 => Ok(Self::Rtc),
            other => Err(other),
        }
    }
}

/// Heartbeat commands, payload byte 0 of a lifecycle heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeartbeatCommand {
    Initial = 0,
    Active = 1,
    Standby = 2,
    ShutdownPrepare = 3,
    ShutdownDelay = 4,
    Shutdown = 5,
}

impl HeartbeatCommand {
    /// Whether a heartbeat code means the guest is up.
    ///
    /// Initial, active and standby count as up; every other code,
    /// unknown ones included, counts as down.
    pub fn is_active_code(code: u8) -> bool {
        matches!(
            Self::try_from(code),
            Ok(Self::Initial | Self::Active | Self::Standby)
        )
    }
}

impl TryFrom<u8> for HeartbeatCommand {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            0 => Ok(Self::Initial),
            1 => Ok(Self::Active),
            2 => Ok(Self::Standby),
            3 => Ok(Self::ShutdownPrepare),
            4 => Ok(Self::ShutdownDelay),
            5 => Ok(Self::Shutdown),
            other => Err(other),
        }
    }
}

/// Commands on the signal channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SignalCommand {
    Single = 1,
    Multi = 2,
    Group = 3,
    InvalidateSignal = 4,
    InvalidateSignals = 5,
    InvalidateGroup = 6,
    InvalidateGroups = 7,
    OpenChannel = 0xFD,
    CloseChannel = 0xFE,
    ResetChannel = 0xFF,
}

impl SignalCommand {
    /// Commands carrying signal data, subject to the channel gate.
    pub fn carries_data(self) -> bool {
        matches!(self, Self::Single | Self::Multi | Self::Group)
    }
}

impl TryFrom<u8> for SignalCommand {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            1 => Ok(Self::Single),
            2 => Ok(Self::Multi),
            3 => Ok(Self::Group),
            4 => Ok(Self::InvalidateSignal),
            5 => Ok(Self::InvalidateSignals),
            6 => Ok(Self::InvalidateGroup),
            7 => Ok(Self::InvalidateGroups),
            0xFD => Ok(Self::OpenChannel),
            0xFE => Ok(Self::CloseChannel),
            0xFF => Ok(Self::ResetChannel),
            other => Err(other),
        }
    }
}
