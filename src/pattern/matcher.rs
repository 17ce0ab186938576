//! Pattern matcher implementations

use crate::result::ConfigError;
use globset::Glob;
use regex::bytes::{Regex, RegexBuilder};

/// A single match inside a byte slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Start position of the match
    pub start: usize,
    /// End position of the match
    pub end: usize,
    /// Captured groups (for regex)
    pub captures: Vec<String>,
}

/// Trait for pattern matching
///
/// Implementations search the whole slice and report the leftmost match.
pub trait Matcher: Send + Sync {
    /// Find a match in the buffer
    fn find(&self, buffer: &[u8]) -> Option<Match>;
}

/// Exact string matcher using Boyer-Moore-Horspool algorithm
pub struct ExactMatcher {
    needle: Vec<u8>,
    skip: [usize; 256],
}

impl ExactMatcher {
    /// Create a new exact matcher
    pub fn new(needle: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let needle = needle.into();
        let last = needle.len().checked_sub(1).ok_or(ConfigError::EmptyPattern)?;

        let mut skip = [needle.len(); 256];
        for (i, &byte) in needle[..last].iter().enumerate() {
            skip[byte as usize] = last - i;
        }

        Ok(Self { needle, skip })
    }
}

impl Matcher for ExactMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        let n = self.needle.len();
        let mut pos = 0;

        while pos + n <= buffer.len() {
            let window = &buffer[pos..pos + n];
            if window == self.needle.as_slice() {
                return Some(Match {
                    start: pos,
                    end: pos + n,
                    captures: vec![],
                });
            }
            pos += self.skip[window[n - 1] as usize];
        }

        None
    }
}

/// Regex matcher over raw bytes
///
/// Works on bytes so that stray non-UTF-8 noise on the line never hides a
/// match elsewhere in the buffer.
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    /// Create a new regex matcher
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Wrap an already compiled regex
    pub fn from_regex(regex: Regex) -> Self {
        Self { regex }
    }
}

impl Matcher for RegexMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        let caps = self.regex.captures(buffer)?;
        let whole = caps.get(0)?;

        let captures = caps
            .iter()
            .map(|group| {
                group
                    .map(|g| String::from_utf8_lossy(g.as_bytes()).into_owned())
                    .unwrap_or_default()
            })
            .collect();

        Some(Match {
            start: whole.start(),
            end: whole.end(),
            captures,
        })
    }
}

/// Glob pattern matcher.
///
/// Globs describe a whole string, so the glob is translated into an
/// unanchored byte regex with lazy wildcards: the match is the leftmost
/// substring the glob accepts, as short as possible. Wildcards match any
/// byte, line breaks included.
pub struct GlobMatcher {
    regex: Regex,
}

impl GlobMatcher {
    /// Create a new glob matcher
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob(e.to_string()))?;
        let source = unanchored(glob.regex())
            .ok_or_else(|| ConfigError::InvalidGlob(format!("cannot translate {pattern:?}")))?;

        let regex = RegexBuilder::new(&source)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| ConfigError::InvalidGlob(e.to_string()))?;

        Ok(Self { regex })
    }
}

/// Turn globset's anchored `(?-u)^...$` translation into a lazy,
/// unanchored search pattern.
///
/// Literal `.` and `*` are escaped by globset, so every `.*` left in the
/// body is a wildcard.
fn unanchored(anchored: &str) -> Option<String> {
    let body = anchored.strip_prefix("(?-u)^")?.strip_suffix('$')?;
    Some(format!("(?-u){}", body.replace(".*", ".*?")))
}

impl Matcher for GlobMatcher {
    fn find(&self, buffer: &[u8]) -> Option<Match> {
        let found = self.regex.find(buffer)?;

        Some(Match {
            start: found.start(),
            end: found.end(),
            captures: vec![],
        })
    }
}
