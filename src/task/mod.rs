//! Task files: a whole session described in TOML
//!
//! ```toml
//! command = "reboot"
//! echo = true
//! timeout = 120          # seconds, or "none" to wait forever
//! line_ending = "cr"     # "lf" (default), "cr" or "crlf"
//! strip_ansi = true
//!
//! [serial]
//! device = "/dev/ttyUSB0"
//! baud = 115200
//!
//! [[responses]]
//! expect = "Hit any key to stop autoboot"
//! kind = "exact"         # "regex" (default), "exact" or "glob"
//! send = " "
//!
//! [[responses]]
//! expect = "=> $"
//! send = ["setenv bootdelay 5", "saveenv", "boot"]
//! ```

use crate::pattern::{Pattern, PatternKind};
use crate::responses::ResponseSpec;
use crate::result::ConfigError;
use crate::session::{LineEnding, SessionBuilder, DEFAULT_TIMEOUT_SECS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors loading a task file.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The file could not be read.
    #[error("Failed to read task file {path}: {source}")]
    Read {
        /// Path of the task file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid task description.
    #[error("Invalid task file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How long each pattern may take to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTimeout")]
pub enum TimeoutSetting {
    /// Give up after this many seconds.
    Seconds(u64),
    /// Wait forever.
    Disabled,
}

impl Default for TimeoutSetting {
    fn default() -> Self {
        TimeoutSetting::Seconds(DEFAULT_TIMEOUT_SECS)
    }
}

impl TimeoutSetting {
    /// The timeout as a duration; `None` when disabled.
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            TimeoutSetting::Seconds(secs) => Some(Duration::from_secs(secs)),
            TimeoutSetting::Disabled => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimeout {
    Seconds(u64),
    Keyword(String),
}

impl TryFrom<RawTimeout> for TimeoutSetting {
    type Error = String;

    fn try_from(raw: RawTimeout) -> Result<Self, Self::Error> {
        match raw {
            RawTimeout::Seconds(secs) => Ok(TimeoutSetting::Seconds(secs)),
            RawTimeout::Keyword(word) if word.eq_ignore_ascii_case("none") => {
                Ok(TimeoutSetting::Disabled)
            }
            RawTimeout::Keyword(word) => Err(format!(
                "invalid timeout {word:?}: expected seconds or \"none\""
            )),
        }
    }
}

/// Serial line settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerialSettings {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub device: Option<String>,
    /// Baud rate.
    pub baud: Option<u32>,
}

/// One expected pattern and what to answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseRule {
    /// Pattern text.
    pub expect: String,
    /// Response, or list of responses for successive matches.
    pub send: ResponseSpec,
    /// How `expect` is interpreted.
    #[serde(default)]
    pub kind: PatternKind,
}

/// A parsed task file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFile {
    /// Command sent before anything is awaited.
    pub command: String,
    /// Echo responses as they are sent.
    #[serde(default)]
    pub echo: bool,
    /// Timeout per pattern.
    #[serde(default)]
    pub timeout: TimeoutSetting,
    /// Terminator appended to every send.
    #[serde(default)]
    pub line_ending: LineEnding,
    /// Remove ANSI escape sequences before matching.
    #[serde(default)]
    pub strip_ansi: bool,
    /// Serial line settings.
    #[serde(default)]
    pub serial: SerialSettings,
    /// Expected patterns, in the order they are awaited.
    #[serde(default)]
    pub responses: Vec<ResponseRule>,
}

impl TaskFile {
    /// Read and parse a task file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TaskError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TaskError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(text.parse()?)
    }

    /// Compile the patterns into `(pattern, response)` pairs.
    pub fn response_pairs(&self) -> Result<Vec<(Pattern, ResponseSpec)>, ConfigError> {
        self.responses
            .iter()
            .map(|rule| Ok((Pattern::parse(rule.kind, &rule.expect)?, rule.send.clone())))
            .collect()
    }

    /// A session builder carrying everything in this file.
    pub fn to_builder(&self) -> Result<SessionBuilder, ConfigError> {
        Ok(SessionBuilder::new(self.command.clone())
            .responses(self.response_pairs()?)
            .timeout_opt(self.timeout.as_duration())
            .line_ending(self.line_ending)
            .strip_ansi(self.strip_ansi)
            .echo(self.echo))
    }
}

impl FromStr for TaskFile {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}
