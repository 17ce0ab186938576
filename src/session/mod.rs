//! Expect sessions over an already-open transport

mod builder;
mod echo;

pub use builder::{LineEnding, SessionBuilder, DEFAULT_TIMEOUT_SECS};
pub use echo::{EchoSink, TracingSink};

use crate::buffer::{BufferError, ExpectBuffer};
use crate::responses::ResponseTable;
use crate::result::{ExpectError, MatchResult, SessionSummary};
use crate::transport::Transport;
use std::time::{Duration, Instant};
use tracing::debug;

/// Where a session is in its walk through the response table.
///
/// Steps are numbered from zero. A list-valued response contributes one
/// step per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing sent yet.
    Init,
    /// Waiting for the pattern of this step.
    AwaitingPattern(usize),
    /// Writing the response of this step.
    Sending(usize),
    /// Every step matched and every response was written.
    Completed,
    /// The pattern of this step did not appear in time.
    TimedOut(usize),
    /// The session stopped on a transport problem.
    Failed(Failure),
}

/// Why a session ended in [`SessionState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The transport closed while this step was awaited.
    EndOfStream(usize),
    /// A read or write failed.
    Transport,
}

/// Sends a command, then answers each expected pattern in turn.
///
/// Only one pattern is live at a time: the session waits for the first
/// registered pattern, sends its response, then moves to the next. Output
/// that arrives after a match stays buffered for the patterns that follow.
///
/// A session is single-use and never closes the transport; the caller
/// owns it.
///
/// # Examples
///
/// ```
/// use serialexpect::{ExpectSession, MockTransport, Pattern, SessionState};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut device = MockTransport::new()
///     .output_after(Duration::from_millis(50), "router login: ")
///     .output_after(Duration::from_millis(50), "Password: ");
///
/// let mut session = ExpectSession::builder("")
///     .respond(Pattern::exact("login:"), "admin")
///     .respond(Pattern::exact("Password:"), "hunter2")
///     .timeout(Duration::from_secs(2))
///     .build()?;
///
/// let summary = session.run(&mut device)?;
/// assert_eq!(summary.matches.len(), 2);
/// assert_eq!(session.state(), SessionState::Completed);
/// assert_eq!(device.written(), b"\nadmin\nhunter2\n");
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct ExpectSession {
    pub(crate) command: String,
    pub(crate) table: ResponseTable,
    pub(crate) buffer: ExpectBuffer,
    pub(crate) timeout: Option<Duration>,
    pub(crate) poll_interval: Duration,
    pub(crate) line_ending: LineEnding,
    pub(crate) echo: bool,
    pub(crate) sink: Box<dyn EchoSink>,
    pub(crate) state: SessionState,
    pub(crate) matches: usize,
}

impl ExpectSession {
    /// Create a session builder that will send `command` first.
    pub fn builder(command: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(command)
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of patterns matched so far.
    pub fn matches_performed(&self) -> usize {
        self.matches
    }

    /// Configured timeout per pattern; `None` waits forever.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The response table, including each pattern's cursor.
    pub fn responses(&self) -> &ResponseTable {
        &self.table
    }

    /// Output received after the last match and not consumed yet.
    pub fn buffer(&self) -> &ExpectBuffer {
        &self.buffer
    }

    /// Run the session to completion.
    ///
    /// Sends the command, then for each step waits for its pattern and
    /// writes the resolved response. Every send is a single write of the
    /// text followed by the line ending.
    ///
    /// # Errors
    ///
    /// - [`ExpectError::Timeout`] if a pattern does not appear in time
    /// - [`ExpectError::EndOfStream`] if the transport closes first
    /// - [`ExpectError::Transport`] if a read or write fails
    /// - [`ExpectError::AlreadyRun`] if the session was run before
    pub fn run<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<SessionSummary, ExpectError> {
        if self.state != SessionState::Init {
            return Err(ExpectError::AlreadyRun);
        }
        let started = Instant::now();

        let command = self.command.clone();
        debug!(command = %command, "sending command");
        self.send(transport, &command, started, || "sending command".to_string())?;

        let steps = self.table.steps();
        let mut matches = Vec::with_capacity(steps.len());

        for (step, &entry) in steps.iter().enumerate() {
            self.state = SessionState::AwaitingPattern(step);
            let found = self.await_step(transport, step, entry)?;
            self.matches += 1;

            self.state = SessionState::Sending(step);
            let response = self.table.next_response_at(entry);
            if self.echo {
                self.sink.echo(&found.key, &response);
            }
            debug!(step, pattern = %found.key, "sending response");
            self.send(transport, &response, started, || {
                format!("sending response for step {step} ({:?})", found.key)
            })?;

            matches.push(found);
        }

        self.state = SessionState::Completed;
        let elapsed = started.elapsed();
        debug!(matches = matches.len(), ?elapsed, "session completed");

        Ok(SessionSummary { matches, elapsed })
    }

    /// Run the session on tokio's blocking pool.
    ///
    /// The session and the transport are dropped when it finishes, which
    /// closes a transport that owns its device. A panic inside the session
    /// resumes on the awaiting task.
    ///
    /// # Errors
    ///
    /// Everything [`run`](Self::run) returns, plus [`ExpectError::Cancelled`]
    /// if the runtime shut down before the session finished.
    pub async fn run_async<T>(mut self, mut transport: T) -> Result<SessionSummary, ExpectError>
    where
        T: Transport + Send + 'static,
    {
        match tokio::task::spawn_blocking(move || self.run(&mut transport)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ExpectError::Cancelled),
        }
    }

    /// Poll until the pattern of `entry` matches, the step times out or the
    /// transport closes.
    fn await_step<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        step: usize,
        entry: usize,
    ) -> Result<MatchResult, ExpectError> {
        let step_started = Instant::now();
        let deadline = self.timeout.map(|t| step_started + t);
        debug!(step, pattern = self.table.matcher_at(entry).key(), "awaiting pattern");

        loop {
            let matcher = self.table.matcher_at(entry);
            if let Some(found) = self.buffer.try_match(matcher) {
                self.buffer.consume_through(&found);
                debug!(step, pattern = %found.key, matched = %found.matched, "pattern matched");
                return Ok(found);
            }
            self.buffer.enforce_limit();

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.state = SessionState::TimedOut(step);
                        return Err(ExpectError::Timeout {
                            step,
                            key: matcher.key().to_owned(),
                            elapsed: step_started.elapsed(),
                        });
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };

            match self.buffer.pull(transport, wait) {
                Ok(_) => {}
                Err(BufferError::EndOfStream) => {
                    self.state = SessionState::Failed(Failure::EndOfStream(step));
                    return Err(ExpectError::EndOfStream {
                        step,
                        key: self.table.matcher_at(entry).key().to_owned(),
                        elapsed: step_started.elapsed(),
                    });
                }
                Err(BufferError::Io(source)) => {
                    self.state = SessionState::Failed(Failure::Transport);
                    return Err(ExpectError::Transport {
                        during: format!(
                            "reading for step {step} ({:?})",
                            self.table.matcher_at(entry).key()
                        ),
                        elapsed: step_started.elapsed(),
                        source,
                    });
                }
            }
        }
    }

    fn send<T, F>(
        &mut self,
        transport: &mut T,
        text: &str,
        started: Instant,
        during: F,
    ) -> Result<(), ExpectError>
    where
        T: Transport + ?Sized,
        F: FnOnce() -> String,
    {
        let mut payload = String::with_capacity(text.len() + 2);
        payload.push_str(text);
        payload.push_str(self.line_ending.as_str());

        transport.write(payload.as_bytes()).map_err(|source| {
            self.state = SessionState::Failed(Failure::Transport);
            ExpectError::Transport {
                during: during(),
                elapsed: started.elapsed(),
                source,
            }
        })
    }
}

impl std::fmt::Debug for ExpectSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpectSession")
            .field("command", &self.command)
            .field("table", &self.table)
            .field("buffer", &self.buffer)
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .field("line_ending", &self.line_ending)
            .field("echo", &self.echo)
            .field("state", &self.state)
            .field("matches", &self.matches)
            .finish_non_exhaustive()
    }
}
