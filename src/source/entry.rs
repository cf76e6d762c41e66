//! The raw entry type produced by the document parser.
//!
//! `RawEntry` mirrors an `<item>` as it appeared in the feed: markup is still
//! present and the publication date is the unparsed string.  Everything
//! downstream (filtering, normalisation, translation) works from this type.

use chrono::DateTime;

use crate::error::MalformedEntryError;

/// A single feed entry, in source document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub link: String,
    pub title: String,
    pub description: String,
    /// Full content (`content:encoded`), when the feed provides one.
    pub content: Option<String>,
    /// `pubDate`, or the Dublin Core `dc:date` when `pubDate` is absent.
    pub published: Option<String>,
    /// Dublin Core `dc:type`.
    pub kind: Option<String>,
}

impl RawEntry {
    /// Publication time in seconds since the Unix epoch.  An entry without
    /// any date is malformed; it is never treated as "now".
    pub fn published_at(&self) -> Result<i64, MalformedEntryError> {
        let raw = self
            .published
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MalformedEntryError::MissingPublished {
                link: self.link.clone(),
            })?;

        parse_timestamp(raw).ok_or_else(|| MalformedEntryError::InvalidPublished {
            link: self.link.clone(),
            value: raw.to_string(),
        })
    }
}

/// Parse an RFC 2822 (`pubDate`) or RFC 3339 (`dc:date`) date.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(published: Option<&str>) -> RawEntry {
        RawEntry {
            link: "https://example.com/1".into(),
            published: published.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn parses_rfc2822() {
        let entry = dated(Some("Mon, 01 Jan 2024 00:00:00 +0000"));
        assert_eq!(entry.published_at().unwrap(), 1_704_067_200);
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let entry = dated(Some("2024-01-01T02:00:00+02:00"));
        assert_eq!(entry.published_at().unwrap(), 1_704_067_200);
    }

    #[test]
    fn missing_date_is_malformed() {
        let err = dated(None).published_at().unwrap_err();
        assert_eq!(
            err,
            MalformedEntryError::MissingPublished {
                link: "https://example.com/1".into()
            }
        );
        assert!(matches!(
            dated(Some("  ")).published_at(),
            Err(MalformedEntryError::MissingPublished { .. })
        ));
    }

    #[test]
    fn garbage_date_is_malformed() {
        let err = dated(Some("not-a-real-date")).published_at().unwrap_err();
        assert!(matches!(
            err,
            MalformedEntryError::InvalidPublished { ref value, .. } if value == "not-a-real-date"
        ));
    }
}
