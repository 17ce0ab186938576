//! Accumulating buffer for device output

mod ansi;

pub use ansi::strip_ansi;

use crate::pattern::PatternMatcher;
use crate::result::MatchResult;
use crate::transport::{ReadOutcome, Transport};
use bytes::{Buf, BytesMut};
use std::borrow::Cow;
use std::io;
use std::time::{Duration, Instant};
use thiserror::Error;

/// When the buffer overflows, discard at least 1/DISCARD_RATIO of it.
const DISCARD_RATIO: usize = 3;

/// Bytes requested per transport read.
const READ_CHUNK: usize = 4096;

/// Pause after a read that came back empty before its timeout, so
/// transports that never block do not spin.
const IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// Why a pull stopped without data.
#[derive(Error, Debug)]
pub enum BufferError {
    /// The transport reported that the stream is closed.
    #[error("End of stream")]
    EndOfStream,

    /// The transport failed to read.
    #[error("Read failed: {0}")]
    Io(#[from] io::Error),
}

/// Unconsumed device output.
///
/// Holds everything read since the last match. A match consumes the
/// matched bytes and everything before them; whatever follows stays
/// buffered for the next pattern.
pub struct ExpectBuffer {
    buffer: BytesMut,
    max_size: usize,
    strip_ansi: bool,
    held: Vec<u8>,
    discarded: usize,
}

impl ExpectBuffer {
    /// Create a new buffer limited to `max_size` unconsumed bytes
    /// (see [`enforce_limit`](Self::enforce_limit))
    pub fn new(max_size: usize, strip_ansi: bool) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_size.min(READ_CHUNK * 4)),
            max_size: max_size.max(1),
            strip_ansi,
            held: Vec::new(),
            discarded: 0,
        }
    }

    /// Read from `transport` until data arrives or `max_wait` elapses.
    ///
    /// Returns whether new bytes were appended. Empty reads are not errors;
    /// at least one read is always attempted, even with a zero wait.
    pub fn pull<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        max_wait: Duration,
    ) -> Result<bool, BufferError> {
        let deadline = Instant::now() + max_wait;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let attempt = Instant::now();
            let remaining = deadline.saturating_duration_since(attempt);

            match transport.read_nonblocking(&mut chunk, remaining)? {
                ReadOutcome::Data(0) | ReadOutcome::Idle => {}
                ReadOutcome::Data(n) => {
                    tracing::trace!(
                        bytes = n,
                        data = %String::from_utf8_lossy(&chunk[..n]).escape_debug(),
                        "read"
                    );
                    self.append(&chunk[..n]);
                    return Ok(true);
                }
                ReadOutcome::Closed => return Err(BufferError::EndOfStream),
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            if now - attempt < IDLE_BACKOFF {
                std::thread::sleep(IDLE_BACKOFF.min(deadline - now));
            }
        }
    }

    /// Append data to the buffer
    pub fn append(&mut self, data: &[u8]) {
        if self.strip_ansi {
            self.held.extend_from_slice(data);
            let cut = ansi::incomplete_tail(&self.held);
            let clean = strip_ansi(&self.held[..cut]);
            self.held.drain(..cut);
            self.buffer.extend_from_slice(&clean);
        } else {
            self.buffer.extend_from_slice(data);
        }
    }

    /// Check `matcher` against everything currently buffered.
    pub fn try_match(&self, matcher: &PatternMatcher) -> Option<MatchResult> {
        let found = matcher.matches(&self.buffer)?;

        Some(MatchResult {
            key: matcher.key().to_owned(),
            matched: String::from_utf8_lossy(&self.buffer[found.start..found.end]).into_owned(),
            start: found.start,
            end: found.end,
            before: String::from_utf8_lossy(&self.buffer[..found.start]).into_owned(),
            captures: found.captures,
        })
    }

    /// Drop the matched bytes and everything before them.
    pub fn consume_through(&mut self, found: &MatchResult) {
        let end = found.end.min(self.buffer.len());
        self.buffer.advance(end);
    }

    /// Get the buffer as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer as text, replacing invalid UTF-8
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total bytes dropped because the buffer overflowed
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Discard the oldest output if the buffer is over its limit.
    ///
    /// Appending never discards, so call this only after the current
    /// pattern failed to match: fresh output is always searched in full
    /// before anything is dropped. Returns the number of bytes dropped.
    pub fn enforce_limit(&mut self) -> usize {
        if self.buffer.len() <= self.max_size {
            return 0;
        }
        self.compact()
    }

    /// Drop at least a third of the limit so compaction does not run on
    /// every read.
    fn compact(&mut self) -> usize {
        let excess = self.buffer.len() - self.max_size;
        let drop = excess
            .max(self.max_size / DISCARD_RATIO)
            .min(self.buffer.len());

        tracing::warn!(
            dropped = drop,
            max_size = self.max_size,
            "expect buffer full, discarding oldest output"
        );
        self.buffer.advance(drop);
        self.discarded += drop;
        drop
    }
}

impl std::fmt::Debug for ExpectBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpectBuffer")
            .field("buffer", &self.text())
            .field("max_size", &self.max_size)
            .field("strip_ansi", &self.strip_ansi)
            .field("discarded", &self.discarded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use crate::transport::MockTransport;

    fn exact(s: &str) -> PatternMatcher {
        PatternMatcher::new(&Pattern::exact(s)).unwrap()
    }

    #[test]
    fn test_new_buffer() {
        let buffer = ExpectBuffer::new(1024, false);
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_appends() {
        let mut buffer = ExpectBuffer::new(1024, false);
        buffer.append(b"Hello ");
        buffer.append(b"World");
        assert_eq!(buffer.text(), "Hello World");
    }

    #[test]
    fn test_match_across_appends() {
        let mut buffer = ExpectBuffer::new(1024, false);
        let ok = exact("OK");

        buffer.append(b"AT\r\nO");
        assert!(buffer.try_match(&ok).is_none());
        buffer.append(b"K\r\n");

        let found = buffer.try_match(&ok).unwrap();
        assert_eq!(found.matched, "OK");
        assert_eq!(found.before, "AT\r\n");
        assert_eq!((found.start, found.end), (4, 6));
    }

    #[test]
    fn test_try_match_is_pure() {
        let mut buffer = ExpectBuffer::new(1024, false);
        buffer.append(b"login: ");
        let login = exact("login:");

        assert!(buffer.try_match(&login).is_some());
        assert!(buffer.try_match(&login).is_some());
        assert_eq!(buffer.len(), 7);
    }

    #[test]
    fn test_consume_keeps_trailing_bytes() {
        let mut buffer = ExpectBuffer::new(1024, false);
        buffer.append(b"login: Password: ");

        let found = buffer.try_match(&exact("login:")).unwrap();
        buffer.consume_through(&found);
        assert_eq!(buffer.as_bytes(), b" Password: ");

        let found = buffer.try_match(&exact("Password:")).unwrap();
        assert_eq!(found.before, " ");
        buffer.consume_through(&found);
        assert_eq!(buffer.as_bytes(), b" ");
    }

    #[test]
    fn test_compact_discards_oldest() {
        let mut buffer = ExpectBuffer::new(90, false);
        buffer.append(&b"0123456789".repeat(5));
        buffer.append(&b"ABCDEFGHIJ".repeat(5));
        assert_eq!(buffer.len(), 100);

        // 100 bytes against a limit of 90: a third of the limit goes.
        assert_eq!(buffer.enforce_limit(), 30);
        assert_eq!(buffer.len(), 70);
        assert_eq!(buffer.discarded(), 30);
        assert!(buffer.as_bytes().ends_with(b"ABCDEFGHIJ"));
    }

    #[test]
    fn test_compact_oversized_chunk() {
        let mut buffer = ExpectBuffer::new(10, false);
        buffer.append(&b"x".repeat(25));
        buffer.enforce_limit();
        buffer.append(b"tail");
        buffer.enforce_limit();
        assert!(buffer.len() <= 10);
        assert!(buffer.as_bytes().ends_with(b"tail"));
    }

    #[test]
    fn test_oversized_append_is_searchable_before_limit() {
        let mut buffer = ExpectBuffer::new(16, false);
        let mut chunk = b"READY".to_vec();
        chunk.extend_from_slice(&[b'.'; 200]);
        buffer.append(&chunk);

        assert_eq!(buffer.discarded(), 0);
        assert!(buffer.try_match(&exact("READY")).is_some());
    }

    #[test]
    fn test_enforce_limit_under_limit_is_noop() {
        let mut buffer = ExpectBuffer::new(16, false);
        buffer.append(b"login: ");
        assert_eq!(buffer.enforce_limit(), 0);
        assert_eq!(buffer.len(), 7);
    }

    #[test]
    fn test_strip_ansi_enabled() {
        let mut buffer = ExpectBuffer::new(1024, true);
        buffer.append(b"Hello \x1b[31mRed\x1b[0m World");
        assert_eq!(buffer.text(), "Hello Red World");
    }

    #[test]
    fn test_strip_ansi_split_sequence() {
        let mut buffer = ExpectBuffer::new(1024, true);
        buffer.append(b"root\x1b[1");
        assert_eq!(buffer.text(), "root");
        buffer.append(b";32m# ");
        assert_eq!(buffer.text(), "root# ");
    }

    #[test]
    fn test_strip_ansi_disabled() {
        let mut buffer = ExpectBuffer::new(1024, false);
        let data = b"Hello \x1b[31mRed\x1b[0m World";
        buffer.append(data);
        assert_eq!(buffer.as_bytes(), data);
    }

    #[test]
    fn test_invalid_utf8_kept_verbatim() {
        let mut buffer = ExpectBuffer::new(1024, false);
        buffer.append(&[0xFF, b'O', b'K']);
        assert_eq!(buffer.as_bytes(), &[0xFF, b'O', b'K']);
        assert_eq!(buffer.text(), "\u{FFFD}OK");
    }

    #[test]
    fn test_pull_appends_data() {
        let mut buffer = ExpectBuffer::new(1024, false);
        let mut device = MockTransport::new().output("READY\n");

        assert!(buffer.pull(&mut device, Duration::from_millis(100)).unwrap());
        assert_eq!(buffer.text(), "READY\n");
    }

    #[test]
    fn test_pull_idle_returns_false() {
        let mut buffer = ExpectBuffer::new(1024, false);
        let mut device = MockTransport::new();
        let started = Instant::now();

        assert!(!buffer.pull(&mut device, Duration::from_millis(40)).unwrap());
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_pull_end_of_stream() {
        let mut buffer = ExpectBuffer::new(1024, false);
        let mut device = MockTransport::new().close();

        let err = buffer.pull(&mut device, Duration::from_millis(40)).unwrap_err();
        assert!(matches!(err, BufferError::EndOfStream));
    }
}
