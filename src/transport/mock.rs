//! Scripted in-memory transport for tests and dry runs

use super::{ReadOutcome, Transport};
use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Event {
    Output(Vec<u8>),
    Close,
}

#[derive(Debug, Clone)]
struct Scheduled {
    at: Duration,
    event: Event,
}

/// One interaction recorded by a [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOp {
    /// Bytes written by the session.
    Write(Vec<u8>),
    /// A read that delivered this many bytes.
    Read(usize),
    /// A read that timed out empty.
    Idle,
    /// A read that reported the stream closed.
    Closed,
}

/// A scripted device.
///
/// Output chunks are scheduled relative to the first interaction (usually
/// the session writing its command) and are delivered one chunk per read,
/// so split deliveries stay split. Reads honour their timeout by sleeping
/// until the next scheduled event or the timeout, whichever comes first.
///
/// ```
/// use serialexpect::MockTransport;
/// use std::time::Duration;
///
/// let device = MockTransport::new()
///     .output("U-Boot 2023.04\r\n")
///     .output_after(Duration::from_millis(200), "Hit any key to stop autoboot")
///     .close_after(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    script: VecDeque<Scheduled>,
    cursor: Duration,
    origin: Option<Instant>,
    pending: VecDeque<u8>,
    closed: bool,
    write_error: Option<io::ErrorKind>,
    journal: Vec<MockOp>,
}

impl MockTransport {
    /// A device that never says anything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `data` at the same instant as the previous event.
    pub fn output(self, data: impl AsRef<[u8]>) -> Self {
        self.output_after(Duration::ZERO, data)
    }

    /// Deliver `data` `delay` after the previous event.
    pub fn output_after(mut self, delay: Duration, data: impl AsRef<[u8]>) -> Self {
        self.cursor += delay;
        self.script.push_back(Scheduled {
            at: self.cursor,
            event: Event::Output(data.as_ref().to_vec()),
        });
        self
    }

    /// Close the stream right after the previous event.
    pub fn close(self) -> Self {
        self.close_after(Duration::ZERO)
    }

    /// Close the stream `delay` after the previous event.
    pub fn close_after(mut self, delay: Duration) -> Self {
        self.cursor += delay;
        self.script.push_back(Scheduled {
            at: self.cursor,
            event: Event::Close,
        });
        self
    }

    /// Make every write fail with `kind`.
    pub fn fail_writes(mut self, kind: io::ErrorKind) -> Self {
        self.write_error = Some(kind);
        self
    }

    /// Everything the session wrote, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.writes().concat()
    }

    /// Individual writes, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.journal
            .iter()
            .filter_map(|op| match op {
                MockOp::Write(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every interaction, in order.
    pub fn journal(&self) -> &[MockOp] {
        &self.journal
    }

    fn origin(&mut self) -> Instant {
        *self.origin.get_or_insert_with(Instant::now)
    }

    /// Release the next event if it is due.
    fn release_due(&mut self, origin: Instant) -> bool {
        match self.script.front() {
            Some(next) if origin + next.at <= Instant::now() => {}
            _ => return false,
        }
        match self.script.pop_front().map(|s| s.event) {
            Some(Event::Output(data)) => self.pending.extend(data),
            Some(Event::Close) => self.closed = true,
            None => return false,
        }
        true
    }

    fn deliver(&mut self, buf: &mut [u8]) -> ReadOutcome {
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        self.journal.push(MockOp::Read(n));
        ReadOutcome::Data(n)
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.origin();
        if let Some(kind) = self.write_error {
            return Err(io::Error::new(kind, "mock write failure"));
        }
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock transport closed"));
        }
        self.journal.push(MockOp::Write(data.to_vec()));
        Ok(())
    }

    fn read_nonblocking(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome> {
        let origin = self.origin();
        let started = Instant::now();

        loop {
            if !self.pending.is_empty() && !buf.is_empty() {
                return Ok(self.deliver(buf));
            }
            if self.closed {
                self.journal.push(MockOp::Closed);
                return Ok(ReadOutcome::Closed);
            }
            if self.release_due(origin) {
                continue;
            }

            let waited = started.elapsed();
            if waited >= timeout {
                self.journal.push(MockOp::Idle);
                return Ok(ReadOutcome::Idle);
            }
            let mut nap = timeout - waited;
            if let Some(next) = self.script.front() {
                let due = (origin + next.at).saturating_duration_since(Instant::now());
                nap = nap.min(due);
            }
            std::thread::sleep(nap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_stay_split() {
        let mut t = MockTransport::new().output("O").output("K");
        let mut buf = [0u8; 16];

        assert_eq!(t.read_nonblocking(&mut buf, Duration::ZERO).unwrap(), ReadOutcome::Data(1));
        assert_eq!(&buf[..1], b"O");
        assert_eq!(t.read_nonblocking(&mut buf, Duration::ZERO).unwrap(), ReadOutcome::Data(1));
        assert_eq!(&buf[..1], b"K");
    }

    #[test]
    fn test_small_buffer_keeps_remainder() {
        let mut t = MockTransport::new().output("hello");
        let mut buf = [0u8; 2];

        assert_eq!(t.read_nonblocking(&mut buf, Duration::ZERO).unwrap(), ReadOutcome::Data(2));
        assert_eq!(t.read_nonblocking(&mut buf, Duration::ZERO).unwrap(), ReadOutcome::Data(2));
        assert_eq!(t.read_nonblocking(&mut buf, Duration::ZERO).unwrap(), ReadOutcome::Data(1));
        assert_eq!(buf[0], b'o');
    }

    #[test]
    fn test_idle_honours_timeout() {
        let mut t = MockTransport::new();
        let mut buf = [0u8; 8];
        let started = Instant::now();

        let outcome = t.read_nonblocking(&mut buf, Duration::from_millis(50)).unwrap();
        assert_eq!(outcome, ReadOutcome::Idle);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_delayed_output_wakes_read_early() {
        let mut t = MockTransport::new().output_after(Duration::from_millis(30), "late");
        let mut buf = [0u8; 8];
        let started = Instant::now();

        let outcome = t.read_nonblocking(&mut buf, Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, ReadOutcome::Data(4));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_close_after_output() {
        let mut t = MockTransport::new().output("bye").close();
        let mut buf = [0u8; 8];

        assert_eq!(t.read_nonblocking(&mut buf, Duration::ZERO).unwrap(), ReadOutcome::Data(3));
        assert_eq!(t.read_nonblocking(&mut buf, Duration::ZERO).unwrap(), ReadOutcome::Closed);
        assert!(t.write(b"x").is_err());
    }

    #[test]
    fn test_journal_records_writes() {
        let mut t = MockTransport::new();
        t.write(b"show version\n").unwrap();
        t.write(b"exit\n").unwrap();

        assert_eq!(t.written(), b"show version\nexit\n");
        assert_eq!(t.writes().len(), 2);
        assert_eq!(t.journal()[0], MockOp::Write(b"show version\n".to_vec()));
    }

    #[test]
    fn test_failing_writes() {
        let mut t = MockTransport::new().fail_writes(io::ErrorKind::BrokenPipe);
        let err = t.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
