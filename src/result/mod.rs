//! Result types for expect sessions

mod error;

pub use error::{ConfigError, ExpectError};

use std::time::Duration;

/// Result of a successful pattern match.
///
/// Offsets are relative to the unconsumed buffer at the time of the match,
/// so `start` is also the length of `before`.
///
/// # Regex Captures
///
/// For regex patterns `captures[0]` is the full match and `captures[1..]`
/// are the groups, in order. Groups that did not participate are empty
/// strings. Exact and glob patterns leave `captures` empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Key of the pattern that matched.
    pub key: String,

    /// The matched text.
    pub matched: String,

    /// Start of the match (byte offset into the unconsumed buffer).
    pub start: usize,

    /// End of the match (byte offset into the unconsumed buffer).
    pub end: usize,

    /// Text that arrived before the match since the previous match.
    pub before: String,

    /// Captured groups (for regex patterns).
    pub captures: Vec<String>,
}

/// Outcome of a session that reached `Completed`.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Every match, in the order the steps were awaited.
    pub matches: Vec<MatchResult>,

    /// Wall-clock time from sending the command to completion.
    pub elapsed: Duration,
}
