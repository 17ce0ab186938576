//! Serial port adapter

use super::{ReadOutcome, Transport};
use serialport::SerialPort;
use std::io::{self, ErrorKind, Read, Write};
use std::ops::DerefMut;
use std::time::Duration;

/// Read timeout the port is opened with.
const OPEN_TIMEOUT: Duration = Duration::from_millis(100);

/// Open `device` at `baud` with the default 8N1 framing.
///
/// The returned port is owned by the caller and closed when dropped.
pub fn open_serial(device: &str, baud: u32) -> serialport::Result<Box<dyn SerialPort>> {
    tracing::debug!(device, baud, "opening serial port");
    serialport::new(device, baud).timeout(OPEN_TIMEOUT).open()
}

/// Presents a serial port as a [`Transport`].
///
/// Accepts anything that dereferences to a port, so the adapter can borrow
/// (`&mut dyn SerialPort`) or own (`Box<dyn SerialPort>`) it.
///
/// ```no_run
/// use serialexpect::{open_serial, SerialTransport};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut port = open_serial("/dev/ttyUSB0", 115_200)?;
/// let transport = SerialTransport::new(port.as_mut());
/// # Ok(())
/// # }
/// ```
pub struct SerialTransport<P> {
    port: P,
    timeout: Option<Duration>,
}

impl<P> SerialTransport<P>
where
    P: DerefMut,
    P::Target: SerialPort,
{
    /// Wrap a port.
    pub fn new(port: P) -> Self {
        Self {
            port,
            timeout: None,
        }
    }

    /// Give the port back.
    pub fn into_inner(self) -> P {
        self.port
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        if self.timeout != Some(timeout) {
            self.port.set_timeout(timeout).map_err(io::Error::from)?;
            self.timeout = Some(timeout);
        }
        Ok(())
    }
}

impl<P> Transport for SerialTransport<P>
where
    P: DerefMut,
    P::Target: SerialPort,
{
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let port = self.port.deref_mut();
        port.write_all(data)?;
        port.flush()
    }

    fn read_nonblocking(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<ReadOutcome> {
        self.set_timeout(timeout)?;

        match self.port.deref_mut().read(buf) {
            // A readable tty that yields nothing has hung up.
            Ok(0) => Ok(ReadOutcome::Closed),
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(e) => classify(e),
        }
    }
}

fn classify(e: io::Error) -> io::Result<ReadOutcome> {
    match e.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted => {
            Ok(ReadOutcome::Idle)
        }
        ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof
        | ErrorKind::NotConnected
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted => {
            tracing::debug!(error = %e, "serial port closed");
            Ok(ReadOutcome::Closed)
        }
        _ => Err(e),
    }
}
