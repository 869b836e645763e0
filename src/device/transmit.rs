//! Outbound command queue

use std::io;

use crate::Result;
use crate::error::GpsError;
use crate::protocol::TERMINATOR;
use crate::transport::Transport;

/// Bytes waiting to be written to the receiver
///
/// Commands are appended with a single CR LF. Draining writes as much as the
/// transport accepts and keeps the rest at the front of the queue, so a
/// command split over several write windows goes out exactly once and in
/// order.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    buf: Vec<u8>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one command and its terminator
    ///
    /// A trailing CR LF already present on `command` is not duplicated. A
    /// command with a line terminator anywhere else is rejected, since it
    /// would reach the receiver as more than one sentence.
    pub fn enqueue(&mut self, command: &[u8]) -> Result<()> {
        let body = command.strip_suffix(TERMINATOR).unwrap_or(command);
        if body.iter().any(|b| *b == b'\r' || *b == b'\n') {
            return Err(GpsError::ProtocolError(
                "command contains an embedded line terminator",
            ));
        }
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(TERMINATOR);
        Ok(())
    }

    /// Writes up to the transport's current window; returns bytes written
    pub fn drain(&mut self, transport: &mut dyn Transport) -> io::Result<usize> {
        if self.buf.is_empty() {
            return Ok(0);
        }
        let len = self.buf.len().min(transport.write_available());
        if len == 0 {
            return Ok(0);
        }

        let written = transport.write(&self.buf[..len])?.min(len);
        tracing::debug!(
            "TX {:?}",
            String::from_utf8_lossy(&self.buf[..written])
        );
        self.buf.drain(..written);
        transport.flush()?;
        Ok(written)
    }

    /// Bytes still queued
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn test_terminator_appended_once() {
        let mut queue = CommandQueue::new();
        queue.enqueue(b"$CMD").unwrap();
        queue.enqueue(b"$CMD\r\n").unwrap();
        assert_eq!(queue.pending(), b"$CMD\r\n$CMD\r\n");
    }

    #[test]
    fn test_embedded_terminator_rejected() {
        let mut queue = CommandQueue::new();
        assert!(queue.enqueue(b"$A\r\n$B").is_err());
        assert!(queue.enqueue(b"$A\n").is_err());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_one_byte_at_a_time() {
        let host = MemoryTransport::new();
        let mut transport = host.clone();
        host.set_write_window(1);

        let mut queue = CommandQueue::new();
        queue.enqueue(b"$CMD").unwrap();

        let mut drains = 0;
        while !queue.is_empty() {
            assert_eq!(queue.drain(&mut transport).unwrap(), 1);
            drains += 1;
        }
        assert_eq!(drains, 6);
        assert_eq!(host.take_written(), b"$CMD\r\n");
        assert_eq!(queue.drain(&mut transport).unwrap(), 0);
    }

    #[test]
    fn test_drain_with_closed_window() {
        let host = MemoryTransport::new();
        let mut transport = host.clone();
        host.set_write_window(0);

        let mut queue = CommandQueue::new();
        queue.enqueue(b"$CMD").unwrap();
        assert_eq!(queue.drain(&mut transport).unwrap(), 0);
        assert_eq!(queue.len(), 6);

        host.set_write_window(4);
        assert_eq!(queue.drain(&mut transport).unwrap(), 4);
        host.set_write_window(64);
        assert_eq!(queue.drain(&mut transport).unwrap(), 2);
        assert_eq!(host.take_written(), b"$CMD\r\n");
    }
}
