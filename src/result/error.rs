//! Error types for serialexpect

use std::time::Duration;
use thiserror::Error;

/// Errors that can end an expect session.
///
/// Every variant is fatal to the session that produced it. Nothing is
/// retried automatically; a caller that wants another attempt builds a new
/// session against a freshly opened transport.
///
/// # Examples
///
/// ```no_run
/// use serialexpect::{ExpectError, ExpectSession, MockTransport, Pattern};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = ExpectSession::builder("show version")
///     .timeout(Duration::from_secs(5))
///     .respond(Pattern::exact("#"), "exit")
///     .build()?;
///
/// let mut transport = MockTransport::new();
/// match session.run(&mut transport) {
///     Ok(summary) => println!("Matched {} prompts", summary.matches.len()),
///     Err(ExpectError::Timeout { key, elapsed, .. }) => {
///         eprintln!("Gave up on {key:?} after {elapsed:?}");
///     }
///     Err(ExpectError::EndOfStream { .. }) => eprintln!("Device went away"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum ExpectError {
    /// The session could not be configured.
    ///
    /// Raised before any transport I/O takes place.
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// The pattern being awaited did not appear before the deadline.
    #[error("Timeout waiting for pattern {key:?} (step {step}, after {elapsed:?})")]
    Timeout {
        /// Index of the awaited step.
        step: usize,
        /// Key of the awaited pattern.
        key: String,
        /// Time spent waiting for this step.
        elapsed: Duration,
    },

    /// The transport closed before the awaited pattern appeared.
    #[error("End of stream while waiting for pattern {key:?} (step {step}, after {elapsed:?})")]
    EndOfStream {
        /// Index of the awaited step.
        step: usize,
        /// Key of the awaited pattern.
        key: String,
        /// Time spent waiting for this step.
        elapsed: Duration,
    },

    /// Writing to (or reading from) the transport failed.
    #[error("Transport error while {during} (after {elapsed:?}): {source}")]
    Transport {
        /// What the session was doing when the error occurred.
        during: String,
        /// Time since the session started.
        elapsed: Duration,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The session has already been run.
    ///
    /// Sessions are single-use; build a new one for every attempt.
    #[error("Session has already been run")]
    AlreadyRun,

    /// The runtime dropped the session task before it finished.
    #[error("Session task was cancelled")]
    Cancelled,
}

/// Errors detected while building patterns or the response table.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid regex pattern.
    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Invalid glob pattern.
    #[error("Invalid glob: {0}")]
    InvalidGlob(String),

    /// Empty pattern.
    #[error("Pattern cannot be empty")]
    EmptyPattern,

    /// A list-valued response has no elements.
    #[error("Response list for pattern {key:?} is empty")]
    EmptyResponses {
        /// Key of the offending pattern.
        key: String,
    },

    /// The same pattern key was registered twice.
    #[error("Pattern {key:?} is registered more than once")]
    DuplicateKey {
        /// The duplicated key.
        key: String,
    },

    /// The poll slice must be non-zero.
    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,
}
