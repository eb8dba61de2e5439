use crate::error::Result;

/// A synchronous byte sink addressed by logical channel id.
///
/// Implementations either write the whole slice or fail; there are no
/// partial transmissions visible to the caller.
pub trait Transmit {
    /// Transmit `data` on `channel`, returning the number of bytes sent.
    fn transmit(&mut self, channel: u8, data: &[u8]) -> Result<usize>;
}

impl<T: Transmit + ?Sized> Transmit for &mut T {
    fn transmit(&mut self, channel: u8, data: &[u8]) -> Result<usize> {
        (**self).transmit(channel, data)
    }
}

impl<T: Transmit + ?Sized> Transmit for Box<T> {
    fn transmit(&mut self, channel: u8, data: &[u8]) -> Result<usize> {
        (**self).transmit(channel, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    fn send_through<T: Transmit>(mut sink: T) -> usize {
        sink.transmit(3, b"abc").unwrap()
    }

    #[test]
    fn mut_ref_forwards() {
        let mut transport = MemoryTransport::new();
        assert_eq!(send_through(&mut transport), 3);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn boxed_dyn_forwards() {
        let transport = MemoryTransport::new();
        let boxed: Box<dyn Transmit> = Box::new(transport.clone());
        assert_eq!(send_through(boxed), 3);
        assert_eq!(transport.sent()[0].channel, 3);
    }
}
