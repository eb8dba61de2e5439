use cbclink_frame::codec::SRV_POS;
use cbclink_frame::{RequestType, LIFECYCLE};
use cbclink_transport::Transmit;
use tracing::debug;

use crate::command::{
    HeartbeatCommand, LifecycleCommand, WAKEUP_REASON_MASK, WAKEUP_REASON_SOC,
};
use crate::error::Result;
use crate::handler::ServiceHandler;
use crate::packet::{CbcPacket, LifecycleState, QueueType};

impl LifecycleState {
    /// Fold a raw wakeup reason with the SoC state and any pending boot
    /// reason, record it, and return the value to broadcast.
    pub fn fold_wakeup_reason(&mut self, reason: u32) -> u32 {
        let mut reason = if self.soc_active {
            self.boot_reason = 0;
            reason | WAKEUP_REASON_SOC
        } else {
            reason & !WAKEUP_REASON_SOC
        };
        reason &= WAKEUP_REASON_MASK;

        if self.boot_reason != 0 {
            reason = self.boot_reason;
        }
        self.reason = reason;
        reason
    }
}

impl<T: Transmit> ServiceHandler<T> {
    pub(crate) fn process_lifecycle(&mut self, pkt: &mut CbcPacket) -> Result<()> {
        let command = pkt.req.command();
        let payload = pkt.req.payload();
        match LifecycleCommand::try_from(command) {
            Ok(LifecycleCommand::WakeupReason) => {
                let reason = u32::from_le_bytes([payload[0], payload[1], payload[2], 0]);
                self.update_wakeup_reason(pkt, reason)
            }
            Ok(LifecycleCommand::Heartbeat) => {
                let heartbeat = payload[0];
                self.update_heartbeat(pkt, heartbeat);
                Ok(())
            }
            Ok(LifecycleCommand::Rtc) | Err(_) => {
                debug!(command, "lifecycle command not handled");
                Ok(())
            }
        }
    }

    /// Track the guest heartbeat. On an active/inactive transition the
    /// packet becomes a SoC update routed to the transmit worker.
    fn update_heartbeat(&self, pkt: &mut CbcPacket, heartbeat: u8) {
        let active = HeartbeatCommand::is_active_code(heartbeat);
        let mut state = self.session.lifecycle();
        if active == state.hb_state {
            return;
        }
        state.hb_state = active;
        debug!(heartbeat, active, "heartbeat state changed");

        pkt.qtype = QueueType::Tx;
        pkt.req.rtype = RequestType::SocUpdate;
        pkt.req.buf[0] = u8::from(active);
    }

    /// Broadcast a wakeup reason on the lifecycle channel.
    ///
    /// The packet is rewritten into a lifecycle wakeup-reason service and
    /// sent framed onto the serial line.
    pub fn update_wakeup_reason(&mut self, pkt: &mut CbcPacket, reason: u32) -> Result<()> {
        let reason = self.session.lifecycle().fold_wakeup_reason(reason);

        let req = &mut pkt.req;
        req.payload_mut()[..3].copy_from_slice(&reason.to_le_bytes()[..3]);
        req.id = LIFECYCLE;
        req.buf[SRV_POS] = LifecycleCommand::WakeupReason as u8;
        req.srv_len = 4;
        req.link_len = 0;

        debug!(reason, "broadcasting wakeup reason");
        self.send(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::tests::{deframe, handler};
    use cbclink_frame::{CbcRequest, FrameReader, VIRTUAL_UART};

    fn decode_reason(frame: &[u8]) -> u32 {
        let mut reader = FrameReader::detached();
        reader.push(frame).unwrap();
        let req = reader.next_request().unwrap();
        assert_eq!(req.address().mux, LIFECYCLE);
        assert_eq!(req.command(), LifecycleCommand::WakeupReason as u8);
        let p = req.payload();
        u32::from_le_bytes([p[0], p[1], p[2], 0])
    }

    #[test]
    fn fold_sets_soc_bit_when_active() {
        let mut state = LifecycleState {
            soc_active: true,
            ..LifecycleState::default()
        };
        assert_eq!(state.fold_wakeup_reason(0x01), 0x80_0001);
        assert_eq!(state.reason, 0x80_0001);
    }

    #[test]
    fn fold_clears_soc_bit_and_masks_when_inactive() {
        let mut state = LifecycleState::default();
        assert_eq!(state.fold_wakeup_reason(0xFF80_0002), 0x02);
    }

    #[test]
    fn boot_reason_overrides_until_soc_active() {
        let mut state = LifecycleState {
            boot_reason: 0x40,
            ..LifecycleState::default()
        };
        assert_eq!(state.fold_wakeup_reason(0x01), 0x40);
        assert_eq!(state.boot_reason, 0x40);

        state.soc_active = true;
        assert_eq!(state.fold_wakeup_reason(0x01), 0x80_0001);
        assert_eq!(state.boot_reason, 0);
    }

    #[test]
    fn heartbeat_transition_routes_soc_update() {
        let (mut handler, sink) = handler();
        let mut pkt = CbcPacket::rx(deframe(
            LIFECYCLE,
            &[LifecycleCommand::Heartbeat as u8, HeartbeatCommand::Active as u8, 0],
        ));

        handler.rx_handler(&mut pkt).unwrap();

        assert_eq!(pkt.qtype, QueueType::Tx);
        assert_eq!(pkt.req.rtype, RequestType::SocUpdate);
        assert_eq!(pkt.req.buf[0], 1);
        assert!(handler.session().lifecycle_state().hb_state);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn repeated_heartbeat_is_a_no_op() {
        let (mut handler, _sink) = handler();
        let service = [LifecycleCommand::Heartbeat as u8, HeartbeatCommand::Active as u8];

        let mut first = CbcPacket::rx(deframe(LIFECYCLE, &service));
        handler.rx_handler(&mut first).unwrap();
        assert_eq!(first.qtype, QueueType::Tx);

        let mut second = CbcPacket::rx(deframe(LIFECYCLE, &service));
        handler.rx_handler(&mut second).unwrap();
        assert_eq!(second.qtype, QueueType::Rx);
        assert_eq!(second.req.rtype, RequestType::Protocol);
    }

    #[test]
    fn shutdown_after_active_transitions_back() {
        let (mut handler, _sink) = handler();
        let active = [LifecycleCommand::Heartbeat as u8, HeartbeatCommand::Standby as u8];
        let shutdown = [LifecycleCommand::Heartbeat as u8, HeartbeatCommand::Shutdown as u8];

        handler
            .rx_handler(&mut CbcPacket::rx(deframe(LIFECYCLE, &active)))
            .unwrap();
        let mut pkt = CbcPacket::rx(deframe(LIFECYCLE, &shutdown));
        handler.rx_handler(&mut pkt).unwrap();

        assert_eq!(pkt.req.rtype, RequestType::SocUpdate);
        assert_eq!(pkt.req.buf[0], 0);
        assert!(!handler.session().lifecycle_state().hb_state);
    }

    #[test]
    fn wakeup_reason_from_device_is_framed() {
        let (mut handler, sink) = handler();
        let req = CbcRequest::from_service(
            LIFECYCLE,
            &[LifecycleCommand::WakeupReason as u8, 0x03, 0x02, 0x81],
        )
        .unwrap();

        handler.tx_handler(&mut CbcPacket::tx(req)).unwrap();

        let sent = sink.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel, VIRTUAL_UART);
        // SoC inactive: bit 23 cleared.
        assert_eq!(decode_reason(&sent[0].data), 0x01_0203);
        assert_eq!(handler.session().lifecycle_state().reason, 0x01_0203);
    }

    #[test]
    fn rtc_is_logged_and_dropped() {
        let (mut handler, sink) = handler();
        let mut pkt = CbcPacket::rx(deframe(LIFECYCLE, &[LifecycleCommand::Rtc as u8, 0]));
        handler.rx_handler(&mut pkt).unwrap();
        assert!(sink.sent().is_empty());
        assert_eq!(pkt.qtype, QueueType::Rx);
    }
}
