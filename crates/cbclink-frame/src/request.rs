use bytes::BytesMut;

use crate::codec::{
    AddressHeader, LinkHeader, ADDR_POS, ELS_POS, PAYLOAD_POS, REQUEST_BUFFER_SIZE, SRV_POS,
};
use crate::error::{FrameError, Result};
use crate::ring::RingBuffer;

/// What a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    /// A CBC protocol packet.
    Protocol,
    /// An internal SoC state update; byte 0 of the buffer holds the new state.
    SocUpdate,
}

/// One in-flight protocol unit.
///
/// The buffer mirrors the frame layout: link header at 0..2, address byte
/// at 2, service command at 3 and payload from 4. `link_len` is zero while
/// the request has not been link-framed (it came from a device channel) and
/// holds the frame length once it has (it came off, or is going to, the
/// serial line).
#[derive(Debug, Clone)]
pub struct CbcRequest {
    pub buf: BytesMut,
    pub rtype: RequestType,
    /// Logical channel mux id.
    pub id: u8,
    /// Service-layer length, command byte included.
    pub srv_len: usize,
    pub link_len: usize,
}

impl CbcRequest {
    /// An empty protocol request with a zeroed buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::zeroed(REQUEST_BUFFER_SIZE),
            rtype: RequestType::Protocol,
            id: 0,
            srv_len: 0,
            link_len: 0,
        }
    }

    /// A request for service bytes read from a device channel.
    ///
    /// `service` starts with the command byte.
    pub fn from_service(channel: u8, service: &[u8]) -> Result<Self> {
        let max = REQUEST_BUFFER_SIZE - SRV_POS;
        if service.len() > max {
            return Err(FrameError::ServiceTooLarge {
                size: service.len(),
                max,
            });
        }
        let mut req = Self::new();
        req.id = channel;
        req.buf[SRV_POS..SRV_POS + service.len()].copy_from_slice(service);
        req.srv_len = service.len();
        Ok(req)
    }

    /// A request for a complete frame already in contiguous memory.
    pub fn from_frame(frame: &[u8], srv_len: usize) -> Result<Self> {
        if frame.len() > REQUEST_BUFFER_SIZE {
            return Err(FrameError::ServiceTooLarge {
                size: frame.len(),
                max: REQUEST_BUFFER_SIZE,
            });
        }
        let mut req = Self::new();
        req.buf[..frame.len()].copy_from_slice(frame);
        req.srv_len = srv_len;
        req.link_len = frame.len();
        Ok(req)
    }

    /// A request for the frame at the head of `ring`.
    pub(crate) fn from_ring(ring: &RingBuffer, frame_len: usize, srv_len: usize) -> Self {
        let mut req = Self::new();
        ring.copy_out(0, &mut req.buf[..frame_len]);
        req.srv_len = srv_len;
        req.link_len = frame_len;
        req
    }

    /// An internal SoC state update carrying `active`.
    pub fn soc_update(active: bool) -> Self {
        let mut req = Self::new();
        req.rtype = RequestType::SocUpdate;
        req.buf[0] = u8::from(active);
        req
    }

    /// The service command byte.
    pub fn command(&self) -> u8 {
        self.buf[SRV_POS]
    }

    /// The payload region following the command byte.
    pub fn payload(&self) -> &[u8] {
        &self.buf[PAYLOAD_POS..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[PAYLOAD_POS..]
    }

    /// The service region: command byte plus `srv_len - 1` payload bytes.
    pub fn service(&self) -> &[u8] {
        let end = (SRV_POS + self.srv_len).min(self.buf.len());
        &self.buf[SRV_POS..end]
    }

    /// The link-framed bytes; empty until the request has been framed.
    pub fn frame(&self) -> &[u8] {
        &self.buf[..self.link_len.min(self.buf.len())]
    }

    pub fn address(&self) -> AddressHeader {
        AddressHeader::unpack(self.buf[ADDR_POS])
    }

    pub fn link_header(&self) -> LinkHeader {
        LinkHeader::unpack(self.buf[ELS_POS])
    }
}

impl Default for CbcRequest {
    fn default() -> Self {
        Self::new()
    }
}
