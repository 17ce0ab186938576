//! Response table: which text to send when a pattern matches

use crate::pattern::{Pattern, PatternMatcher};
use crate::result::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;

/// What to send when a pattern matches.
///
/// A sequence answers successive matches of the same pattern with
/// successive elements.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ResponseSpec {
    /// The same text on every match.
    Single(String),
    /// One element per match, in order.
    Sequence(Vec<String>),
}

impl ResponseSpec {
    /// Number of distinct responses; later matches repeat the last one.
    pub fn len(&self) -> usize {
        match self {
            ResponseSpec::Single(_) => 1,
            ResponseSpec::Sequence(items) => items.len(),
        }
    }

    /// True for an empty sequence, which is never valid in a table.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<&str> {
        match self {
            ResponseSpec::Single(text) => Some(text.as_str()),
            ResponseSpec::Sequence(items) => items
                .get(index)
                .or_else(|| items.last())
                .map(String::as_str),
        }
    }
}

impl From<&str> for ResponseSpec {
    fn from(text: &str) -> Self {
        ResponseSpec::Single(text.to_owned())
    }
}

impl From<String> for ResponseSpec {
    fn from(text: String) -> Self {
        ResponseSpec::Single(text)
    }
}

impl<S: Into<String>> From<Vec<S>> for ResponseSpec {
    fn from(items: Vec<S>) -> Self {
        ResponseSpec::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// Index of the next response due for one pattern.
///
/// Starts at zero and moves forward on every match. Once it passes the end
/// of a sequence the final response is reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseCursor(usize);

impl ResponseCursor {
    /// Index of the next response.
    pub fn position(&self) -> usize {
        self.0
    }

    fn advance(&mut self) {
        self.0 = self.0.saturating_add(1);
    }
}

#[derive(Debug)]
struct Entry {
    matcher: PatternMatcher,
    spec: ResponseSpec,
    cursor: ResponseCursor,
}

/// Ordered registry of pattern → response pairs.
///
/// Registration order is the order a session awaits the patterns in.
/// Every pattern is compiled when the table is built, so a malformed
/// pattern never reaches the transport.
///
/// # Examples
///
/// ```
/// use serialexpect::{Pattern, ResponseTable};
///
/// let mut table = ResponseTable::new(vec![
///     (Pattern::exact("login:"), "admin".into()),
///     (Pattern::exact("Password:"), vec!["wrong", "s3cret"].into()),
/// ])
/// .unwrap();
///
/// assert_eq!(table.next_response_for("Password:"), Some("wrong".to_string()));
/// assert_eq!(table.next_response_for("Password:"), Some("s3cret".to_string()));
/// // Exhausted sequences repeat their last element.
/// assert_eq!(table.next_response_for("Password:"), Some("s3cret".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct ResponseTable {
    entries: Vec<Entry>,
}

impl ResponseTable {
    /// Build a table from `(pattern, response)` pairs in caller order.
    ///
    /// # Errors
    ///
    /// Fails on a malformed or empty pattern, a duplicated pattern key, or
    /// an empty response sequence.
    pub fn new(
        pairs: impl IntoIterator<Item = (Pattern, ResponseSpec)>,
    ) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for (pattern, spec) in pairs {
            let matcher = PatternMatcher::new(&pattern)?;
            if !seen.insert(matcher.key().to_owned()) {
                return Err(ConfigError::DuplicateKey {
                    key: matcher.key().to_owned(),
                });
            }
            if spec.is_empty() {
                return Err(ConfigError::EmptyResponses {
                    key: matcher.key().to_owned(),
                });
            }
            entries.push(Entry {
                matcher,
                spec,
                cursor: ResponseCursor::default(),
            });
        }

        Ok(Self { entries })
    }

    /// Number of registered patterns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no pattern is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.matcher.key())
    }

    /// Matcher registered under `key`.
    pub fn matcher(&self, key: &str) -> Option<&PatternMatcher> {
        self.entry(key).map(|e| &e.matcher)
    }

    /// Cursor state for `key`.
    pub fn cursor(&self, key: &str) -> Option<ResponseCursor> {
        self.entry(key).map(|e| e.cursor)
    }

    /// The steps a session walks through: one per response, entry by entry.
    ///
    /// Each step is the index of the entry whose pattern is awaited.
    pub(crate) fn steps(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .flat_map(|(i, e)| std::iter::repeat_n(i, e.spec.len()))
            .collect()
    }

    pub(crate) fn matcher_at(&self, index: usize) -> &PatternMatcher {
        &self.entries[index].matcher
    }

    /// Resolve the response for the entry at `index` and advance its cursor.
    pub(crate) fn next_response_at(&mut self, index: usize) -> String {
        let entry = &mut self.entries[index];
        let position = entry.cursor.position();
        if matches!(entry.spec, ResponseSpec::Sequence(_)) && position >= entry.spec.len() {
            tracing::debug!(
                key = entry.matcher.key(),
                position,
                "response list exhausted, reusing last response"
            );
        }
        let response = entry.spec.get(position).unwrap_or_default().to_owned();
        entry.cursor.advance();
        response
    }

    /// Response to send for a match of `key`; advances that key's cursor.
    ///
    /// Returns `None` if `key` is not registered.
    pub fn next_response_for(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|e| e.matcher.key() == key)?;
        Some(self.next_response_at(index))
    }

    fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.matcher.key() == key)
    }
}
