//! Session builder for configuration

use super::echo::{EchoSink, TracingSink};
use super::{ExpectSession, SessionState};
use crate::buffer::ExpectBuffer;
use crate::pattern::Pattern;
use crate::responses::{ResponseSpec, ResponseTable};
use crate::result::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Default timeout per awaited pattern (in seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default length of one bounded read (in milliseconds)
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default maximum buffer size (in bytes)
const DEFAULT_MAX_BUFFER_SIZE: usize = 8192;

/// Terminator appended to the command and to every response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r`
    Cr,
    /// `\r\n`
    #[serde(rename = "crlf")]
    #[cfg_attr(feature = "cli", value(name = "crlf"))]
    CrLf,
}

impl LineEnding {
    /// The terminator bytes.
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Builder for configuring sessions.
///
/// # Defaults
///
/// - Timeout: 30 seconds per awaited pattern
/// - Poll interval: 100 ms per read
/// - Max buffer size: 8192 bytes
/// - ANSI stripping: disabled
/// - Echo: disabled, [`TracingSink`] when enabled
/// - Line ending: `\n`
///
/// # Examples
///
/// ```
/// use serialexpect::{ExpectSession, LineEnding, Pattern};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = ExpectSession::builder("")
///     .respond(Pattern::exact("login:"), "root")
///     .respond(Pattern::regex(r"[Pp]assword:")?, "toor")
///     .respond(Pattern::exact("# "), "uname -a")
///     .timeout(Duration::from_secs(10))
///     .line_ending(LineEnding::Cr)
///     .echo(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    command: String,
    responses: Vec<(Pattern, ResponseSpec)>,
    timeout: Option<Duration>,
    poll_interval: Duration,
    max_buffer_size: usize,
    strip_ansi: bool,
    echo: bool,
    sink: Option<Box<dyn EchoSink>>,
    line_ending: LineEnding,
}

impl SessionBuilder {
    /// Create a builder that will send `command` first.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            responses: Vec::new(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            strip_ansi: false,
            echo: false,
            sink: None,
            line_ending: LineEnding::default(),
        }
    }

    /// Await `pattern` after everything registered so far, then send
    /// `response`.
    ///
    /// A list-valued response makes the pattern awaited once per element.
    pub fn respond(mut self, pattern: Pattern, response: impl Into<ResponseSpec>) -> Self {
        self.responses.push((pattern, response.into()));
        self
    }

    /// Register several pattern/response pairs in order.
    pub fn responses<I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (Pattern, ResponseSpec)>,
    {
        self.responses.extend(pairs);
        self
    }

    /// Set how long each pattern may take to appear.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the timeout (wait indefinitely).
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the timeout from an optional duration; `None` disables it.
    pub fn timeout_opt(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the longest single read.
    ///
    /// The timeout is checked between reads, so this bounds how late a
    /// timeout can be reported.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set maximum buffer size in bytes.
    ///
    /// On overflow the oldest unconsumed output is discarded.
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Enable or disable ANSI escape sequence stripping before matching.
    pub fn strip_ansi(mut self, strip: bool) -> Self {
        self.strip_ansi = strip;
        self
    }

    /// Surface every response to the echo sink as it is sent.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Replace the default [`TracingSink`].
    pub fn echo_sink(mut self, sink: impl EchoSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Set the terminator appended to every send.
    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Validate the configuration and build the session.
    ///
    /// # Errors
    ///
    /// Fails on a malformed or empty pattern, a duplicated pattern, an
    /// empty response list or a zero poll interval. No I/O happens here.
    pub fn build(self) -> Result<ExpectSession, ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        let table = ResponseTable::new(self.responses)?;

        Ok(ExpectSession {
            command: self.command,
            table,
            buffer: ExpectBuffer::new(self.max_buffer_size, self.strip_ansi),
            timeout: self.timeout,
            poll_interval: self.poll_interval,
            line_ending: self.line_ending,
            echo: self.echo,
            sink: self.sink.unwrap_or_else(|| Box::new(TracingSink)),
            state: SessionState::Init,
            matches: 0,
        })
    }
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("command", &self.command)
            .field("responses", &self.responses.len())
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .field("max_buffer_size", &self.max_buffer_size)
            .field("strip_ansi", &self.strip_ansi)
            .field("echo", &self.echo)
            .field("line_ending", &self.line_ending)
            .finish_non_exhaustive()
    }
}
