use cbclink_frame::codec::{SRV_HDR_SIZE, SRV_POS};
use cbclink_tables::SignalTables;
use cbclink_transport::Transmit;
use tracing::debug;

use crate::command::SignalCommand;
use crate::error::{Result, ServiceError};
use crate::handler::ServiceHandler;
use crate::packet::CbcPacket;

/// Bytes taken by a signal id in a multi-signal entry.
const SIGNAL_ID_SIZE: usize = 2;

/// Which table an invalidation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    Signal,
    Group,
}

/// Outcome of [`filter_signals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilteredSignals {
    /// Entries kept.
    pub count: u8,
    /// Payload bytes in use after compaction, count byte included.
    pub len: usize,
}

/// Compact a multi-signal payload in place, keeping only permitted signals.
///
/// `payload[0]` is the entry count, followed by entries of a 2-byte
/// little-endian id and the signal value. Kept entries are shifted left
/// over rejected ones; their order is preserved. The count byte itself is
/// not rewritten.
///
/// Fails if walking the entries runs past `max_service` or past the end of
/// `payload`.
pub fn filter_signals(
    payload: &mut [u8],
    tables: &SignalTables,
    max_service: usize,
) -> Result<FilteredSignals> {
    let Some(&declared) = payload.first() else {
        return Err(ServiceError::SignalOverrun {
            offset: 1,
            max: max_service,
        });
    };
    let mut count = 0u8;
    // Read cursor.
    let mut offset = 1;
    // Write cursor, never ahead of `offset`.
    let mut valids = 1;

    for _ in 0..declared {
        if offset + SIGNAL_ID_SIZE > payload.len() {
            debug!(offset, len = payload.len(), "multi-signal entry truncated");
            return Err(ServiceError::SignalOverrun {
                offset: offset + SIGNAL_ID_SIZE,
                max: max_service,
            });
        }
        let id = u16::from_le_bytes([payload[offset], payload[offset + 1]]);
        let span = tables.signal_len(id) + SIGNAL_ID_SIZE;
        let next = offset + span;
        if next + 1 > max_service || next > payload.len() {
            debug!(offset = next, max_service, "multi-signal payload overruns service");
            return Err(ServiceError::SignalOverrun {
                offset: next,
                max: max_service,
            });
        }

        if tables.permits_signal(id) {
            count += 1;
            debug_assert!(valids <= offset);
            if valids < offset {
                payload.copy_within(offset..next, valids);
            }
            valids += span;
        } else {
            debug!(id, "signal filtered");
        }
        offset = next;
    }

    Ok(FilteredSignals {
        count,
        len: valids,
    })
}

impl<T: Transmit> ServiceHandler<T> {
    pub(crate) fn process_signal(&mut self, pkt: &mut CbcPacket) -> Result<()> {
        let code = pkt.req.command();
        let command = match SignalCommand::try_from(code) {
            Ok(command) => command,
            Err(code) => {
                debug!(command = code, "unknown signal command");
                return Ok(());
            }
        };

        // Signal data heading for the serial line waits for the guest to
        // open the channel; device channels always receive it.
        if pkt.req.link_len == 0 && command.carries_data() && !self.session.signal_channel_open()
        {
            debug!(command = code, "signal channel closed, dropping");
            return Ok(());
        }

        let payload = pkt.req.payload();
        let id = u16::from_le_bytes([payload[0], payload[1]]);
        let tables = self.session.tables();

        match command {
            SignalCommand::Single => {
                if tables.permits_signal(id) {
                    self.send(&mut pkt.req)?;
                }
                Ok(())
            }
            SignalCommand::Multi => self.forward_signals(pkt),
            SignalCommand::Group => {
                if tables.permits_group(id) {
                    self.send(&mut pkt.req)?;
                }
                Ok(())
            }
            SignalCommand::InvalidateSignal => {
                if !tables.disable_signal(id) {
                    debug!(id, "invalidating unknown signal");
                }
                Ok(())
            }
            SignalCommand::InvalidateSignals => {
                self.set_invalidation(pkt, InvalidationScope::Signal)
            }
            SignalCommand::InvalidateGroup => {
                if !tables.disable_group(id) {
                    debug!(id, "invalidating unknown group");
                }
                Ok(())
            }
            SignalCommand::InvalidateGroups => self.set_invalidation(pkt, InvalidationScope::Group),
            SignalCommand::OpenChannel | SignalCommand::ResetChannel => {
                self.session.set_signal_channel_open(true);
                Ok(())
            }
            SignalCommand::CloseChannel => {
                self.session.set_signal_channel_open(false);
                Ok(())
            }
        }
    }

    /// Filter a multi-signal packet and send whatever survives.
    fn forward_signals(&mut self, pkt: &mut CbcPacket) -> Result<()> {
        let max_service = self.max_service_size();
        let filtered = filter_signals(pkt.req.payload_mut(), self.session.tables(), max_service)?;
        if filtered.count == 0 {
            return Ok(());
        }

        pkt.req.payload_mut()[0] = filtered.count;
        pkt.req.buf[SRV_POS] = SignalCommand::Multi as u8;
        pkt.req.srv_len = filtered.len + SRV_HDR_SIZE;
        self.send(&mut pkt.req)
    }

    /// Invalidate the ids listed in a multi-id payload: a count at byte 1,
    /// then 2-byte little-endian ids from byte 2.
    fn set_invalidation(&mut self, pkt: &CbcPacket, scope: InvalidationScope) -> Result<()> {
        let payload = pkt.req.payload();
        let count = payload[1] as usize;
        let max = self.max_service_size();
        if count * 2 + 2 >= max {
            debug!(count, max, "invalidation list too long");
            return Err(ServiceError::InvalidationTooLong { count, max });
        }

        let tables = self.session.tables();
        for entry in payload[2..2 + count * 2].chunks_exact(2) {
            let id = u16::from_le_bytes([entry[0], entry[1]]);
            let known = match scope {
                InvalidationScope::Signal => tables.disable_signal(id),
                InvalidationScope::Group => tables.disable_group(id),
            };
            if !known {
                debug!(id, ?scope, "invalidating unknown id");
            }
        }
        Ok(())
    }
}
