//! Duplex byte streams the session talks to

mod mock;
mod serial;

pub use mock::{MockOp, MockTransport};
pub use serial::{open_serial, SerialTransport};

use std::io;
use std::time::Duration;

/// What a single bounded read produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the start of the buffer.
    Data(usize),
    /// Nothing arrived within the timeout. Not an error.
    Idle,
    /// The other side closed or hung up.
    Closed,
}

/// An already-open duplex stream.
///
/// Implementations never own more than the handle they were given: opening
/// and closing the underlying device is up to the caller.
pub trait Transport {
    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever is available into `buf`, blocking for at most `timeout`.
    fn read_nonblocking(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write(data)
    }

    fn read_nonblocking(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome> {
        (**self).read_nonblocking(buf, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write(data)
    }

    fn read_nonblocking(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome> {
        (**self).read_nonblocking(buf, timeout)
    }
}
