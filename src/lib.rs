//! serialexpect: Expect-style automation for serial consoles
//!
//! serialexpect drives a device over an already-open serial line the way
//! the Unix `expect` utility drives a terminal: send a command, wait for
//! each expected prompt in turn, and answer it.
//!
//! # Features
//!
//! - **Sequential responses**: Patterns are awaited in registration order, one at a time
//! - **Response lists**: A pattern can answer successive matches with successive responses
//! - **Pattern matching**: Supports exact strings, regex, and glob patterns
//! - **Intelligent buffering**: Handles matches split across reads and keeps trailing output
//! - **Timeout support**: Per-pattern deadline, or none at all
//! - **ANSI stripping**: Optional removal of ANSI escape sequences
//! - **Pluggable transports**: Real serial ports, or a scripted mock for tests
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use serialexpect::{open_serial, ExpectSession, Pattern, SerialTransport};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut port = open_serial("/dev/ttyUSB0", 115200)?;
//!     let mut transport = SerialTransport::new(port.as_mut());
//!
//!     let mut session = ExpectSession::builder("")
//!         .respond(Pattern::exact("login:"), "root")
//!         .respond(Pattern::regex(r"[Pp]assword:")?, "toor")
//!         .timeout(Duration::from_secs(30))
//!         .build()?;
//!
//!     let summary = session.run(&mut transport)?;
//!     println!("{} prompts answered in {:?}", summary.matches.len(), summary.elapsed);
//!     Ok(())
//! }
//! ```
//!
//! # Response Lists
//!
//! A list-valued response makes its pattern awaited once per element. Each
//! match sends the next element:
//!
//! ```rust
//! use serialexpect::{ExpectSession, MockTransport, Pattern};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut device = MockTransport::new()
//!     .output("=> ")
//!     .output_after(Duration::from_millis(20), "=> ");
//!
//! let mut session = ExpectSession::builder("")
//!     .respond(Pattern::exact("=> "), vec!["saveenv", "boot"])
//!     .timeout(Duration::from_secs(1))
//!     .build()?;
//!
//! session.run(&mut device)?;
//! assert_eq!(device.written(), b"\nsaveenv\nboot\n");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Task Files
//!
//! A whole session can be described in TOML and loaded with
//! [`task::TaskFile`]; the `serial-expect` binary (feature `cli`) runs
//! such files against a serial device.

#![warn(missing_docs)]

mod buffer;
mod pattern;
mod responses;
mod result;
mod session;
mod transport;

pub mod task;

// Public API exports
pub use buffer::{strip_ansi, BufferError, ExpectBuffer};
pub use pattern::{Match, Matcher, Pattern, PatternKind, PatternMatcher};
pub use responses::{ResponseCursor, ResponseSpec, ResponseTable};
pub use result::{ConfigError, ExpectError, MatchResult, SessionSummary};
pub use session::{
    EchoSink, ExpectSession, Failure, LineEnding, SessionBuilder, SessionState, TracingSink,
    DEFAULT_TIMEOUT_SECS,
};
pub use transport::{open_serial, MockOp, MockTransport, ReadOutcome, SerialTransport, Transport};
