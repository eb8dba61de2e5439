use std::io::{ErrorKind, Read};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use cbclink_frame::codec::RING_BUFFER_SIZE;
use cbclink_frame::{
    CbcRequest, FrameConfig, FrameError, FrameReader, FrameStats, FrameWriter, RequestType,
    TxSequence,
};
use cbclink_transport::Transmit;
use tracing::{debug, warn};

use crate::error::{Result, ServiceError};
use crate::handler::ServiceHandler;
use crate::packet::{CbcPacket, QueueType, Session};

/// Build the receive and transmit workers of one link.
///
/// `rx_sink` receives what the receive worker sends (device channels, and
/// the serial line for synthesized lifecycle frames); `tx_sink` receives
/// what the transmit worker sends. SoC updates observed on receive are
/// handed to the transmit worker through a single-producer channel.
///
/// Both workers frame onto the same serial line, so their writers share
/// one transmit sequence.
pub fn link<R, T>(session: Arc<Session>, rx_sink: R, tx_sink: T) -> (RxWorker<R>, TxWorker<T>) {
    let seq = TxSequence::new();
    let (handoff, queue) = mpsc::channel();
    let rx = RxWorker {
        reader: FrameReader::detached(),
        handler: ServiceHandler::from_writer(
            Arc::clone(&session),
            FrameWriter::new(rx_sink).with_sequence(seq.clone()),
        ),
        handoff,
    };
    let tx = TxWorker {
        handler: ServiceHandler::from_writer(session, FrameWriter::new(tx_sink).with_sequence(seq)),
        queue,
    };
    (rx, tx)
}

/// Same as [`link`] with explicit frame sizes for both directions.
pub fn link_with_config<R, T>(
    session: Arc<Session>,
    rx_sink: R,
    tx_sink: T,
    config: FrameConfig,
) -> Result<(RxWorker<R>, TxWorker<T>)> {
    let seq = TxSequence::new();
    let (handoff, queue) = mpsc::channel();
    let rx_writer = FrameWriter::with_config(rx_sink, config.clone())?.with_sequence(seq.clone());
    let tx_writer = FrameWriter::with_config(tx_sink, config.clone())?.with_sequence(seq);
    let rx = RxWorker {
        reader: FrameReader::detached_with_config(config)?,
        handler: ServiceHandler::from_writer(Arc::clone(&session), rx_writer),
        handoff,
    };
    let tx = TxWorker {
        handler: ServiceHandler::from_writer(session, tx_writer),
        queue,
    };
    Ok((rx, tx))
}

/// Serial line toward device channels.
pub struct RxWorker<T> {
    reader: FrameReader<std::io::Empty>,
    handler: ServiceHandler<T>,
    handoff: Sender<CbcRequest>,
}

impl<T: Transmit> RxWorker<T> {
    /// Absorb bytes from the serial line and handle every frame they
    /// complete. Returns the number of frames handled.
    ///
    /// Handler failures are logged and the request dropped.
    pub fn feed(&mut self, mut bytes: &[u8]) -> usize {
        let mut frames = 0;
        while !bytes.is_empty() {
            let room = self.reader.config().ring_capacity - 1 - self.reader.buffered();
            if room == 0 {
                // Let the ring record the overflow.
                if let Err(err) = self.reader.push(bytes) {
                    debug!(error = %err, "serial bytes dropped");
                }
                break;
            }
            let (chunk, rest) = bytes.split_at(room.min(bytes.len()));
            if let Err(err) = self.reader.push(chunk) {
                debug!(error = %err, "serial bytes dropped");
            }
            bytes = rest;
            frames += self.drain_frames();
        }
        frames
    }

    /// Read the serial line until end of stream.
    ///
    /// Returns the number of frames handled.
    pub fn run<S: Read>(&mut self, mut source: S) -> Result<usize> {
        let mut chunk = [0u8; RING_BUFFER_SIZE];
        let mut frames = 0;
        loop {
            match source.read(&mut chunk) {
                Ok(0) => return Ok(frames),
                Ok(n) => frames += self.feed(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err).into()),
            }
        }
    }

    /// Handle one deframed request.
    pub fn process(&mut self, req: CbcRequest) -> Result<()> {
        let mut pkt = CbcPacket::rx(req);
        self.handler.rx_handler(&mut pkt)?;
        if pkt.qtype == QueueType::Tx {
            self.handoff
                .send(pkt.req)
                .map_err(|_| ServiceError::Disconnected("tx worker"))?;
        }
        Ok(())
    }

    fn drain_frames(&mut self) -> usize {
        let mut frames = 0;
        while let Some(req) = self.reader.next_request() {
            frames += 1;
            if let Err(err) = self.process(req) {
                warn!(error = %err, "rx request dropped");
            }
        }
        frames
    }
}

impl<T> RxWorker<T> {
    pub fn stats(&self) -> FrameStats {
        self.reader.stats()
    }

    pub fn handler(&self) -> &ServiceHandler<T> {
        &self.handler
    }
}

/// Device channels toward the serial line.
pub struct TxWorker<T> {
    handler: ServiceHandler<T>,
    queue: Receiver<CbcRequest>,
}

impl<T: Transmit> TxWorker<T> {
    /// Handle service bytes read from a device channel.
    pub fn submit(&mut self, channel: u8, service: &[u8]) -> Result<()> {
        let req = CbcRequest::from_service(channel, service)?;
        self.process(req)
    }

    /// Handle one request on the transmit path.
    pub fn process(&mut self, req: CbcRequest) -> Result<()> {
        let mut pkt = CbcPacket::tx(req);
        let was_protocol = pkt.req.rtype == RequestType::Protocol;
        self.handler.tx_handler(&mut pkt)?;
        // A heartbeat seen here turns into a SoC update for this same path.
        if was_protocol && pkt.req.rtype == RequestType::SocUpdate {
            self.handler.tx_handler(&mut pkt)?;
        }
        Ok(())
    }

    /// Handle every request handed off so far without blocking.
    ///
    /// Returns the number handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.queue.try_recv() {
                Ok(req) => {
                    handled += 1;
                    self.process_logged(req);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return handled,
            }
        }
    }

    /// Block on hand-offs until the receive worker is dropped.
    pub fn run(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(req) = self.queue.recv() {
            handled += 1;
            self.process_logged(req);
        }
        debug!(handled, "rx worker gone, tx queue closed");
        handled
    }

    fn process_logged(&mut self, req: CbcRequest) {
        if let Err(err) = self.process(req) {
            warn!(error = %err, "tx request dropped");
        }
    }
}

impl<T> TxWorker<T> {
    pub fn handler(&self) -> &ServiceHandler<T> {
        &self.handler
    }
}

impl<T> std::fmt::Debug for RxWorker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RxWorker")
            .field("reader", &self.reader)
            .field("handler", &self.handler)
            .finish()
    }
}

impl<T> std::fmt::Debug for TxWorker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxWorker")
            .field("handler", &self.handler)
            .finish()
    }
}
