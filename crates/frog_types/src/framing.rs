//! Newline framing with a bound on line length.
//!
//! Both ends of a connection read the socket through a [`LineReader`]. A line
//! longer than the configured limit is skipped up to its newline instead of
//! being buffered, so a peer that never sends a newline cannot grow the read
//! buffer past `max_line_bytes`.

use std::io::{self, BufRead};

/// Default upper bound on the length of one line, terminator excluded.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Outcome of [`LineReader::read_line`].
#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete line without its `\n`.
    Line(Vec<u8>),
    /// A line over the limit was dropped; carries the number of bytes skipped.
    Oversized(usize),
    /// The peer closed the stream. Any unterminated input is discarded.
    Eof,
}

/// Reads `\n`-terminated lines of bounded length.
///
/// Read errors (including socket timeouts) leave the partial line buffered,
/// so the next call picks up where the failed one stopped.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_line_bytes: usize,
    discarded: Option<usize>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, max_line_bytes: usize) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            max_line_bytes: max_line_bytes.max(1),
            discarded: None,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Bytes of the current partial line held in memory.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Reads until a line completes, an oversized line has been skipped, or
    /// the stream ends.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frog_types::framing::{LineEvent, LineReader};
    ///
    /// let input: &[u8] = b"short\nthis line is too long\nok\n";
    /// let mut reader = LineReader::new(input, 8);
    ///
    /// assert_eq!(reader.read_line().unwrap(), LineEvent::Line(b"short".to_vec()));
    /// assert_eq!(reader.read_line().unwrap(), LineEvent::Oversized(22));
    /// assert_eq!(reader.read_line().unwrap(), LineEvent::Line(b"ok".to_vec()));
    /// assert_eq!(reader.read_line().unwrap(), LineEvent::Eof);
    /// ```
    pub fn read_line(&mut self) -> io::Result<LineEvent> {
        loop {
            let available = self.inner.fill_buf()?;
            if available.is_empty() {
                self.buf.clear();
                self.discarded = None;
                return Ok(LineEvent::Eof);
            }

            let (used, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };

            if let Some(skipped) = self.discarded.as_mut() {
                *skipped += used;
                let skipped = *skipped;
                self.inner.consume(used);
                if complete {
                    self.discarded = None;
                    return Ok(LineEvent::Oversized(skipped));
                }
                continue;
            }

            let content = self.buf.len() + used - usize::from(complete);
            if content > self.max_line_bytes {
                let skipped = self.buf.len() + used;
                self.buf.clear();
                self.inner.consume(used);
                if complete {
                    return Ok(LineEvent::Oversized(skipped));
                }
                self.discarded = Some(skipped);
                continue;
            }

            self.buf.extend_from_slice(&available[..used]);
            self.inner.consume(used);
            if complete {
                self.buf.pop();
                return Ok(LineEvent::Line(std::mem::take(&mut self.buf)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Read};

    /// Yields its chunks one read at a time, then a timeout, then the rest.
    struct Stalling {
        chunks: Vec<&'static [u8]>,
        stall_after: usize,
        reads: usize,
    }

    impl Read for Stalling {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            if self.reads == self.stall_after + 1 {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "stalled"));
            }
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            out[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_lines_across_small_buffers() {
        let input: &[u8] = b"first\nsecond line\n\nlast";
        let mut reader = LineReader::new(BufReader::with_capacity(3, input), 64);

        assert_eq!(reader.read_line().unwrap(), LineEvent::Line(b"first".to_vec()));
        assert_eq!(reader.read_line().unwrap(), LineEvent::Line(b"second line".to_vec()));
        assert_eq!(reader.read_line().unwrap(), LineEvent::Line(Vec::new()));
        assert_eq!(reader.read_line().unwrap(), LineEvent::Eof);
    }

    #[test]
    fn test_line_at_limit_is_kept() {
        let input: &[u8] = b"12345678\n123456789\n";
        let mut reader = LineReader::new(BufReader::with_capacity(4, input), 8);

        assert_eq!(reader.read_line().unwrap(), LineEvent::Line(b"12345678".to_vec()));
        assert_eq!(reader.read_line().unwrap(), LineEvent::Oversized(10));
        assert_eq!(reader.read_line().unwrap(), LineEvent::Eof);
    }

    #[test]
    fn test_endless_line_stays_bounded() {
        let mut input = vec![b'x'; 10_000];
        input.extend_from_slice(b"\nnext\n");
        let mut reader = LineReader::new(BufReader::with_capacity(16, input.as_slice()), 32);

        assert_eq!(reader.read_line().unwrap(), LineEvent::Oversized(10_001));
        assert_eq!(reader.buffered(), 0);
        assert_eq!(reader.read_line().unwrap(), LineEvent::Line(b"next".to_vec()));
    }

    #[test]
    fn test_partial_line_survives_timeout() {
        let source = Stalling {
            chunks: vec![b"hel", b"lo\n"],
            stall_after: 1,
            reads: 0,
        };
        let mut reader = LineReader::new(BufReader::new(source), 64);

        let err = reader.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert_eq!(reader.buffered(), 3);
        assert_eq!(reader.read_line().unwrap(), LineEvent::Line(b"hello".to_vec()));
    }
}
