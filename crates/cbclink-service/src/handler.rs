use std::sync::Arc;

use cbclink_frame::{is_raw, CbcRequest, FrameWriter, RequestType, LIFECYCLE, SIGNAL};
use cbclink_transport::Transmit;
use tracing::{debug, trace};

use crate::error::Result;
use crate::packet::{CbcPacket, Session};

/// Routes requests to the lifecycle, signal and raw paths.
///
/// One handler serves one direction. It owns that direction's
/// [`FrameWriter`] and shares the [`Session`] with the handler of the other
/// direction. Both writers of a link share one transmit sequence.
pub struct ServiceHandler<T> {
    pub(crate) session: Arc<Session>,
    pub(crate) writer: FrameWriter<T>,
}

impl<T> ServiceHandler<T> {
    pub fn new(session: Arc<Session>, sink: T) -> Self {
        Self {
            session,
            writer: FrameWriter::new(sink),
        }
    }

    /// Build a handler around an already configured writer.
    pub fn from_writer(session: Arc<Session>, writer: FrameWriter<T>) -> Self {
        Self { session, writer }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn writer(&self) -> &FrameWriter<T> {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut FrameWriter<T> {
        &mut self.writer
    }

    pub(crate) fn max_service_size(&self) -> usize {
        self.writer.config().max_service_size
    }
}

impl<T: Transmit> ServiceHandler<T> {
    /// Send a request: framed onto the serial line when it came from a
    /// device channel, unframed onto its channel otherwise.
    pub fn send(&mut self, req: &mut CbcRequest) -> Result<()> {
        let written = self.writer.send(req)?;
        trace!(channel = req.id, written, "request sent");
        Ok(())
    }

    /// Handle a request deframed from the serial line.
    ///
    /// Only protocol requests are processed. The channel id is taken from
    /// the address header and stored on the request.
    pub fn rx_handler(&mut self, pkt: &mut CbcPacket) -> Result<()> {
        if pkt.req.rtype != RequestType::Protocol {
            return Ok(());
        }
        // Priority is carried but not acted on.
        let address = pkt.req.address();
        pkt.req.id = address.mux;
        self.dispatch(pkt, "rx")
    }

    /// Handle a request from a device channel or an internal SoC update.
    pub fn tx_handler(&mut self, pkt: &mut CbcPacket) -> Result<()> {
        match pkt.req.rtype {
            RequestType::Protocol => self.dispatch(pkt, "tx"),
            RequestType::SocUpdate => {
                let active = pkt.req.buf[0] != 0;
                let reason = {
                    let mut state = self.session.lifecycle();
                    state.soc_active = active;
                    state.reason
                };
                debug!(active, reason, "applying soc state update");
                self.update_wakeup_reason(pkt, reason)
            }
        }
    }

    fn dispatch(&mut self, pkt: &mut CbcPacket, direction: &'static str) -> Result<()> {
        match pkt.req.id {
            LIFECYCLE => self.process_lifecycle(pkt),
            SIGNAL => self.process_signal(pkt),
            id if is_raw(id) => self.send(&mut pkt.req),
            id => {
                debug!(channel = id, direction, "dropping request for unhandled channel");
                Ok(())
            }
        }
    }
}

impl<T> std::fmt::Debug for ServiceHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandler")
            .field("session", &self.session)
            .field("writer", &self.writer)
            .finish()
    }
}
