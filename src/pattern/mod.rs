//! Pattern matching for expect sessions

mod matcher;

pub use matcher::{ExactMatcher, GlobMatcher, Match, Matcher, RegexMatcher};

use crate::result::ConfigError;
use regex::bytes::Regex;
use serde::Deserialize;

/// Pattern awaited in the device output.
///
/// Patterns are tested against everything buffered since the previous
/// match, not line by line, and may match anywhere in that text.
///
/// # Examples
///
/// ```
/// use serialexpect::Pattern;
///
/// // Literal text (fastest)
/// let login = Pattern::exact("login: ");
///
/// // Regular expression
/// let prompt = Pattern::regex(r"[$#] $").unwrap();
///
/// // Glob pattern
/// let autoboot = Pattern::glob("Hit * to stop autoboot");
/// ```
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Literal text, matched with Boyer-Moore-Horspool.
    Exact(String),

    /// Regular expression, matched against raw bytes.
    ///
    /// Capture groups are reported in the `MatchResult`.
    Regex(Regex),

    /// Shell-style wildcard pattern (`*`, `?`, `[...]`).
    ///
    /// The glob is validated when the pattern is registered.
    Glob(String),
}

/// How the text of a configured pattern is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Regular expression.
    #[default]
    Regex,
    /// Literal text.
    Exact,
    /// Shell-style glob.
    Glob,
}

impl Pattern {
    /// Create an exact string pattern.
    pub fn exact(s: impl Into<String>) -> Self {
        Pattern::Exact(s.into())
    }

    /// Create a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns a regex error if the pattern is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Pattern::Regex(Regex::new(pattern)?))
    }

    /// Create a glob pattern.
    pub fn glob(pattern: &str) -> Self {
        Pattern::Glob(pattern.to_string())
    }

    /// Build a pattern of the given kind from configuration text.
    pub fn parse(kind: PatternKind, text: &str) -> Result<Self, ConfigError> {
        Ok(match kind {
            PatternKind::Regex => Pattern::regex(text)?,
            PatternKind::Exact => Pattern::exact(text),
            PatternKind::Glob => Pattern::glob(text),
        })
    }

    /// Source text of the pattern, used as its key in the response table.
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Exact(s) | Pattern::Glob(s) => s.as_str(),
            Pattern::Regex(r) => r.as_str(),
        }
    }

    /// Compile the pattern into a matcher.
    pub fn to_matcher(&self) -> Result<Box<dyn Matcher>, ConfigError> {
        match self {
            Pattern::Exact(s) => Ok(Box::new(ExactMatcher::new(s.as_bytes())?)),
            Pattern::Regex(r) if r.as_str().is_empty() => Err(ConfigError::EmptyPattern),
            Pattern::Regex(r) => Ok(Box::new(RegexMatcher::from_regex(r.clone()))),
            Pattern::Glob(g) if g.is_empty() => Err(ConfigError::EmptyPattern),
            Pattern::Glob(g) => Ok(Box::new(GlobMatcher::new(g)?)),
        }
    }
}

/// A registered pattern: its key plus the compiled matcher.
///
/// Matching is a pure query; consuming the matched bytes is up to the
/// [`ExpectBuffer`](crate::ExpectBuffer).
pub struct PatternMatcher {
    key: String,
    matcher: Box<dyn Matcher>,
}

impl PatternMatcher {
    /// Compile a pattern. Malformed patterns fail here, never while matching.
    pub fn new(pattern: &Pattern) -> Result<Self, ConfigError> {
        Ok(Self {
            key: pattern.as_str().to_owned(),
            matcher: pattern.to_matcher()?,
        })
    }

    /// Key identifying this pattern.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Leftmost match of the pattern anywhere in `buffer`.
    pub fn matches(&self, buffer: &[u8]) -> Option<Match> {
        self.matcher.find(buffer)
    }
}

impl std::fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
