use std::collections::HashMap;
use std::io::{ErrorKind, Write};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transmit;

type Sink = Box<dyn Write + Send>;

/// Routes each logical channel to its own `Write` sink.
///
/// Typical wiring attaches the pty backing the virtual serial line and the
/// native device nodes, one per channel id.
#[derive(Default)]
pub struct ChannelWriters {
    sinks: HashMap<u8, Sink>,
}

impl ChannelWriters {
    /// Create a router with no channels attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach (or replace) the sink for `channel`.
    pub fn attach(&mut self, channel: u8, sink: impl Write + Send + 'static) -> &mut Self {
        debug!(channel, "attached channel sink");
        self.sinks.insert(channel, Box::new(sink));
        self
    }

    /// Builder-style variant of [`attach`](Self::attach).
    pub fn with_channel(mut self, channel: u8, sink: impl Write + Send + 'static) -> Self {
        self.attach(channel, sink);
        self
    }

    /// Detach the sink for `channel`, returning it if present.
    pub fn detach(&mut self, channel: u8) -> Option<Box<dyn Write + Send>> {
        self.sinks.remove(&channel)
    }

    /// Returns true if a sink is attached to `channel`.
    pub fn is_attached(&self, channel: u8) -> bool {
        self.sinks.contains_key(&channel)
    }
}

impl Transmit for ChannelWriters {
    fn transmit(&mut self, channel: u8, data: &[u8]) -> Result<usize> {
        let sink = self
            .sinks
            .get_mut(&channel)
            .ok_or(TransportError::UnknownChannel(channel))?;

        let mut offset = 0usize;
        while offset < data.len() {
            match sink.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Closed(channel)),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(source) => return Err(TransportError::Io { channel, source }),
            }
        }

        loop {
            match sink.flush() {
                Ok(()) => return Ok(data.len()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(source) => return Err(TransportError::Io { channel, source }),
            }
        }
    }
}

impl std::fmt::Debug for ChannelWriters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut channels: Vec<_> = self.sinks.keys().copied().collect();
        channels.sort_unstable();
        f.debug_struct("ChannelWriters")
            .field("channels", &channels)
            .finish()
    }
}
