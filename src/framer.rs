//! Byte stream to sentence framing
//!
//! The receiver delivers bytes in whatever chunks the transport hands over.
//! [`LineFramer`] accumulates them and yields one [`RawLine`] per CR LF
//! terminated sentence, keeping any unterminated tail for the next feed.
//! Framing is chunk-invariant: the same byte stream yields the same lines no
//! matter where the chunk boundaries fall.
//!
//! The buffer is bounded. Once every complete line has been extracted, a
//! leftover tail longer than the configured limit is handled according to
//! the [`OverflowPolicy`].

use serde::{Deserialize, Serialize};

use crate::protocol::{RawLine, TERMINATOR};

/// Default bound on unterminated bytes kept between feeds
pub const DEFAULT_BUFFER_LIMIT: usize = 4096;

/// What to do when unterminated input exceeds the buffer limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the whole pending tail
    #[default]
    Reset,
    /// Keep only the newest `limit` bytes
    DropOldest,
}

/// Accumulates bytes and extracts CR LF terminated lines
#[derive(Debug, Clone)]
pub struct LineFramer {
    buf: Vec<u8>,
    /// Index from which the next terminator search starts
    scan_from: usize,
    limit: usize,
    policy: OverflowPolicy,
    overflows: u64,
}

impl Default for LineFramer {
    fn default() -> Self {
        LineFramer::new(DEFAULT_BUFFER_LIMIT, OverflowPolicy::default())
    }
}

impl LineFramer {
    /// Creates a framer keeping at most `limit` unterminated bytes
    pub fn new(limit: usize, policy: OverflowPolicy) -> Self {
        LineFramer {
            buf: Vec::with_capacity(limit.min(DEFAULT_BUFFER_LIMIT)),
            scan_from: 0,
            limit,
            policy,
            overflows: 0,
        }
    }

    /// Appends bytes and returns an iterator over the lines now complete
    ///
    /// The iterator is lazy: lines are removed from the buffer as they are
    /// yielded. Lines left unconsumed when the iterator is dropped stay
    /// buffered and are returned by the next call. The overflow bound is
    /// applied once the iterator runs dry.
    pub fn feed(&mut self, bytes: &[u8]) -> Lines<'_> {
        self.push(bytes);
        Lines { framer: self }
    }

    /// Appends bytes without extracting lines
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Removes and returns the next complete line, if any
    ///
    /// Returns `None` when no terminator remains in the buffer; at that
    /// point the overflow bound is enforced on the remaining tail.
    pub fn next_line(&mut self) -> Option<RawLine> {
        match self.find_terminator() {
            Some(end) => {
                let line: Vec<u8> = self.buf.drain(..end).collect();
                self.scan_from = 0;
                Some(RawLine::new(line))
            }
            None => {
                self.enforce_limit();
                None
            }
        }
    }

    /// Bytes currently buffered without a terminator
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Number of times the overflow policy has been applied
    pub fn overflow_count(&self) -> u64 {
        self.overflows
    }

    /// Discards everything buffered
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scan_from = 0;
    }

    /// Returns the end index (exclusive, terminator included) of the first line
    fn find_terminator(&mut self) -> Option<usize> {
        let start = self.scan_from;
        let found = self.buf[start..]
            .windows(TERMINATOR.len())
            .position(|w| w == TERMINATOR)
            .map(|pos| start + pos + TERMINATOR.len());

        if found.is_none() {
            // a lone trailing CR may be completed by the next feed
            self.scan_from = self.buf.len().saturating_sub(TERMINATOR.len() - 1);
        }
        found
    }

    fn enforce_limit(&mut self) {
        if self.buf.len() <= self.limit {
            return;
        }
        self.overflows += 1;
        match self.policy {
            OverflowPolicy::Reset => {
                tracing::warn!(
                    "Receive buffer exceeded {} bytes without a terminator, discarding {} bytes",
                    self.limit,
                    self.buf.len()
                );
                self.buf.clear();
            }
            OverflowPolicy::DropOldest => {
                let excess = self.buf.len() - self.limit;
                tracing::warn!(
                    "Receive buffer exceeded {} bytes without a terminator, dropping {} oldest bytes",
                    self.limit,
                    excess
                );
                self.buf.drain(..excess);
            }
        }
        self.scan_from = 0;
    }
}

/// Lazy iterator over the complete lines in a [`LineFramer`]
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = RawLine;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &[u8] = b"$GPRMC,1*00\r\n$GPGGA,2*00\r\n\r\n$PMTK001,220,3*30\r\n";

    fn collect(framer: &mut LineFramer, bytes: &[u8]) -> Vec<Vec<u8>> {
        framer.feed(bytes).map(RawLine::into_bytes).collect()
    }

    #[test]
    fn test_whole_stream() {
        let mut framer = LineFramer::default();
        let lines = collect(&mut framer, STREAM);
        assert_eq!(
            lines,
            vec![
                b"$GPRMC,1*00\r\n".to_vec(),
                b"$GPGGA,2*00\r\n".to_vec(),
                b"\r\n".to_vec(),
                b"$PMTK001,220,3*30\r\n".to_vec(),
            ]
        );
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_chunk_invariance() {
        let mut whole = LineFramer::default();
        let expected = collect(&mut whole, STREAM);

        for chunk_size in 1..=STREAM.len() {
            let mut framer = LineFramer::default();
            let mut lines = Vec::new();
            for chunk in STREAM.chunks(chunk_size) {
                lines.extend(collect(&mut framer, chunk));
            }
            assert_eq!(lines, expected, "chunk size {}", chunk_size);
            assert!(framer.pending().is_empty());
        }

        // every single split point, two chunks
        for split in 0..=STREAM.len() {
            let mut framer = LineFramer::default();
            let (a, b) = STREAM.split_at(split);
            let mut lines = collect(&mut framer, a);
            lines.extend(collect(&mut framer, b));
            assert_eq!(lines, expected, "split at {}", split);
        }
    }

    #[test]
    fn test_terminator_split_across_feeds() {
        let mut framer = LineFramer::default();
        assert!(collect(&mut framer, b"$GPGGA\r").is_empty());
        assert_eq!(framer.pending(), b"$GPGGA\r");
        assert_eq!(collect(&mut framer, b"\n"), vec![b"$GPGGA\r\n".to_vec()]);
    }

    #[test]
    fn test_bare_lf_is_not_a_terminator() {
        let mut framer = LineFramer::default();
        assert!(collect(&mut framer, b"$A\n$B\n").is_empty());
        assert_eq!(collect(&mut framer, b"\r\n"), vec![b"$A\n$B\n\r\n".to_vec()]);
    }

    #[test]
    fn test_partial_iteration_keeps_remaining_lines() {
        let mut framer = LineFramer::default();
        let first = framer.feed(b"$A\r\n$B\r\n").next();
        assert_eq!(first, Some(RawLine::from("$A\r\n")));
        assert_eq!(framer.next_line(), Some(RawLine::from("$B\r\n")));
        assert_eq!(framer.next_line(), None);
    }

    #[test]
    fn test_overflow_reset() {
        let mut framer = LineFramer::new(8, OverflowPolicy::Reset);
        assert!(collect(&mut framer, b"0123456789").is_empty());
        assert!(framer.pending().is_empty());
        assert_eq!(framer.overflow_count(), 1);
        assert_eq!(collect(&mut framer, b"$A\r\n"), vec![b"$A\r\n".to_vec()]);
    }

    #[test]
    fn test_overflow_drop_oldest() {
        let mut framer = LineFramer::new(4, OverflowPolicy::DropOldest);
        assert!(collect(&mut framer, b"0123456789").is_empty());
        assert_eq!(framer.pending(), b"6789");
        assert_eq!(collect(&mut framer, b"\r\n"), vec![b"6789\r\n".to_vec()]);
    }

    #[test]
    fn test_complete_lines_longer_than_limit_are_kept() {
        let mut framer = LineFramer::new(4, OverflowPolicy::Reset);
        assert_eq!(
            collect(&mut framer, b"$GPGGA,long\r\n"),
            vec![b"$GPGGA,long\r\n".to_vec()]
        );
        assert_eq!(framer.overflow_count(), 0);
    }
}
