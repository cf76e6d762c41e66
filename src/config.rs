//! Feed configuration.
//!
//! The feed list is a JSON document of the form
//!
//! ```json
//! { "feeds": [ { "name": "lwn", "url": "https://lwn.net/headlines/rss", "recrawl_interval": 3600 } ] }
//! ```
//!
//! It is loaded once per run and never mutated afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One configured feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    /// Unique key, also used as the key in the fetch-state file.
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub disabled: bool,
    /// Seconds that must elapse between two successful fetches.
    /// `0` means the feed is due on every cycle.
    #[serde(default, alias = "recrawl_time")]
    pub recrawl_interval: u64,
}

impl FeedDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            disabled: false,
            recrawl_interval: 0,
        }
    }

    pub fn with_recrawl_interval(mut self, secs: u64) -> Self {
        self.recrawl_interval = secs;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[derive(Deserialize)]
struct FeedsFile {
    feeds: Vec<FeedDescriptor>,
}

/// Read-only, ordered view of the configured feeds.
#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    feeds: Vec<FeedDescriptor>,
}

impl FeedRegistry {
    /// Build a registry, rejecting empty names/URLs and duplicate names.
    pub fn new(feeds: Vec<FeedDescriptor>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for (index, feed) in feeds.iter().enumerate() {
            if feed.name.trim().is_empty() {
                return Err(ConfigError::EmptyField { index, field: "name" });
            }
            if feed.url.trim().is_empty() {
                return Err(ConfigError::EmptyField { index, field: "url" });
            }
            if !seen.insert(feed.name.as_str()) {
                return Err(ConfigError::DuplicateName(feed.name.clone()));
            }
        }
        Ok(Self { feeds })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: FeedsFile = serde_json::from_str(json)?;
        Self::new(file.feeds)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// All feeds in configuration order, disabled ones included.
    pub fn iter(&self) -> impl Iterator<Item = &FeedDescriptor> {
        self.feeds.iter()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &FeedDescriptor> {
        self.feeds.iter().filter(|f| !f.disabled)
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(reg: &'a FeedRegistry, name: &str) -> &'a FeedDescriptor {
        reg.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn parses_defaults() {
        let reg = FeedRegistry::from_json(
            r#"{"feeds": [{"name": "a", "url": "https://example.com/a.xml"}]}"#,
        )
        .unwrap();

        let feed = get(&reg, "a");
        assert!(!feed.disabled);
        assert_eq!(feed.recrawl_interval, 0);
    }

    #[test]
    fn accepts_legacy_recrawl_time_key() {
        let reg = FeedRegistry::from_json(
            r#"{"feeds": [{"name": "a", "url": "u", "recrawl_time": 900, "disabled": true}]}"#,
        )
        .unwrap();

        let feed = get(&reg, "a");
        assert_eq!(feed.recrawl_interval, 900);
        assert!(feed.disabled);
        assert_eq!(reg.enabled().count(), 0);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = FeedRegistry::new(vec![
            FeedDescriptor::new("a", "u1"),
            FeedDescriptor::new("a", "u2"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName(ref n) if n == "a"));
    }

    #[test]
    fn rejects_empty_url() {
        let err = FeedRegistry::new(vec![FeedDescriptor::new("a", " ")]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyField { index: 0, field: "url" }));
    }

    #[test]
    fn preserves_configuration_order() {
        let reg = FeedRegistry::new(vec![
            FeedDescriptor::new("b", "u"),
            FeedDescriptor::new("a", "u").disabled(),
            FeedDescriptor::new("c", "u"),
        ])
        .unwrap();

        let all: Vec<_> = reg.iter().map(|f| f.name.as_str()).collect();
        let enabled: Vec<_> = reg.enabled().map(|f| f.name.as_str()).collect();
        assert_eq!(all, ["b", "a", "c"]);
        assert_eq!(enabled, ["b", "c"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FeedRegistry::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
