//! Logical channel (mux) ids and their link priorities.
//!
//! Ids 0-18 name native device channels, 19 is the virtual serial line
//! carrying framed traffic and 20 is reserved for local events.

/// Power management.
pub const PMT: u8 = 0;

/// Lifecycle: heartbeat, wakeup reasons.
pub const LIFECYCLE: u8 = 1;

/// Vehicle signal data.
pub const SIGNAL: u8 = 2;

/// Early signal data.
pub const EARLY_SIGNAL: u8 = 3;

/// Diagnostics.
pub const DIAG: u8 = 4;

/// Diagnostic log and trace.
pub const DLT: u8 = 5;

/// LINDA channel.
pub const LINDA: u8 = 6;

/// First raw pass-through channel.
pub const RAW0: u8 = 7;

/// Last raw pass-through channel.
pub const RAW11: u8 = 18;

/// The virtual serial line that carries framed traffic.
pub const VIRTUAL_UART: u8 = 19;

/// Local event channel.
pub const LOCAL_EVENT: u8 = 20;

/// Link priority carried in the address header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Priority {
    /// Decode a priority field; unknown values read as medium.
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => Priority::Low,
            3 => Priority::High,
            _ => Priority::Medium,
        }
    }
}

/// Map a channel id to the priority it is framed with.
pub fn priority_for(id: u8) -> Priority {
    match id {
        PMT | LIFECYCLE | SIGNAL | DLT => Priority::High,
        DIAG => Priority::Low,
        _ => Priority::Medium,
    }
}

/// Returns true if the channel is a raw pass-through channel.
pub fn is_raw(id: u8) -> bool {
    (RAW0..=RAW11).contains(&id)
}

/// Returns a human-readable name for a channel id.
pub fn channel_name(id: u8) -> &'static str {
    match id {
        PMT => "PMT",
        LIFECYCLE => "LIFECYCLE",
        SIGNAL => "SIGNAL",
        EARLY_SIGNAL => "EARLY_SIGNAL",
        DIAG => "DIAG",
        DLT => "DLT",
        LINDA => "LINDA",
        RAW0..=RAW11 => "RAW",
        VIRTUAL_UART => "VIRTUAL_UART",
        LOCAL_EVENT => "LOCAL_EVENT",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_table() {
        for id in [PMT, LIFECYCLE, SIGNAL, DLT] {
            assert_eq!(priority_for(id), Priority::High, "channel {id}");
        }
        assert_eq!(priority_for(DIAG), Priority::Low);
        for id in [EARLY_SIGNAL, LINDA, RAW0, RAW11, VIRTUAL_UART, 31] {
            assert_eq!(priority_for(id), Priority::Medium, "channel {id}");
        }
    }

    #[test]
    fn raw_range_is_inclusive() {
        assert!(!is_raw(LINDA));
        assert!(is_raw(RAW0));
        assert!(is_raw(12));
        assert!(is_raw(RAW11));
        assert!(!is_raw(VIRTUAL_UART));
    }

    #[test]
    fn names() {
        assert_eq!(channel_name(LIFECYCLE), "LIFECYCLE");
        assert_eq!(channel_name(10), "RAW");
        assert_eq!(channel_name(30), "UNKNOWN");
    }

    #[test]
    fn priority_bits_roundtrip() {
        for prio in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::from_bits(prio as u8), prio);
        }
        assert_eq!(Priority::from_bits(7), Priority::Medium);
    }
}
