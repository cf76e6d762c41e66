//! Error taxonomy for a crawl cycle.
//!
//! Errors fall into two groups:
//!
//! * **Cycle-level** ([`ClockSkewError`], [`StorageError`], sink failures)
//!   abort the rest of the cycle.  They are wrapped in [`CycleError`].
//! * **Per-feed / per-entry / per-field** ([`FetchError`], [`ParseFailure`],
//!   [`MalformedEntryError`], [`TranslationError`]) are logged and isolated so
//!   that sibling feeds, entries and fields carry on.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// `now` is earlier than the last recorded fetch for a feed.
///
/// Either the system clock or the fetch-state file cannot be trusted, so the
/// whole cycle is aborted before anything is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("clock skew on feed {feed:?}: current ts {now} is earlier than last fetch ts {last_fetch_ts}")]
pub struct ClockSkewError {
    pub feed: String,
    pub now: i64,
    pub last_fetch_ts: i64,
}

/// Line/column (both 1-based) where the XML reader gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A fetched payload that is not a well-formed feed document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed document ({kind}): {message}{}", at_position(.position))]
pub struct ParseFailure {
    /// Class of the failure, e.g. `XmlError` or `InvalidStartTag`.
    pub kind: &'static str,
    pub message: String,
    pub position: Option<Position>,
}

fn at_position(position: &Option<Position>) -> String {
    position.map(|p| format!(" at {p}")).unwrap_or_default()
}

/// A single entry that cannot be placed in time.  Only that entry is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEntryError {
    #[error("entry {link:?} has no publication date")]
    MissingPublished { link: String },

    #[error("entry {link:?} has unparsable publication date {value:?}")]
    InvalidPublished { link: String, value: String },
}

/// Failure of one field's translation.  Both variants fall back to the
/// untranslated text; they differ only in how they are reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// Rate limit, quota or backend outage.
    #[error("translation unavailable: {0}")]
    Unavailable(String),

    #[error("translation failed: {0}")]
    Failed(String),
}

/// Transport failure for a single feed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("response too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Raised by transports that are not HTTP based.
    #[error("{0}")]
    Other(String),
}

/// The fetch-state file could not be read or replaced.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt fetch-state file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialise fetch state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The feed list could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read feed configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid feed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate feed name {0:?}")]
    DuplicateName(String),

    #[error("feed #{index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
}

/// Fatal outcome of a crawl cycle.  The previously durable fetch state is
/// untouched in every case.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    ClockSkew(#[from] ClockSkewError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("cannot emit items: {0}")]
    Output(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_display_includes_position() {
        let err = ParseFailure {
            kind: "XmlError",
            message: "unexpected end of input".into(),
            position: Some(Position { line: 3, column: 7 }),
        };
        assert_eq!(
            err.to_string(),
            "malformed document (XmlError): unexpected end of input at line 3, column 7"
        );
    }

    #[test]
    fn parse_failure_display_without_position() {
        let err = ParseFailure {
            kind: "UnexpectedEof",
            message: "end of input".into(),
            position: None,
        };
        assert_eq!(err.to_string(), "malformed document (UnexpectedEof): end of input");
    }

    #[test]
    fn clock_skew_names_the_feed() {
        let err = ClockSkewError {
            feed: "lobsters".into(),
            now: 10,
            last_fetch_ts: 20,
        };
        let msg = err.to_string();
        assert!(msg.contains("\"lobsters\""));
        assert!(msg.contains("10") && msg.contains("20"));
    }

    #[test]
    fn cycle_error_is_transparent_for_clock_skew() {
        let skew = ClockSkewError {
            feed: "a".into(),
            now: 1,
            last_fetch_ts: 2,
        };
        let err: CycleError = skew.clone().into();
        assert_eq!(err.to_string(), skew.to_string());
    }
}
