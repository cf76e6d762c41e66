//! The pipeline's output record.

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedEntry;
use crate::translate::Translation;

/// One retained entry, ready for downstream storage.
///
/// `src_*` fields are only present when a translation step ran; without one
/// the plain fields carry the original-language text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub feed_title: String,
    pub link: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_title: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_description: Option<String>,
    pub pub_time: i64,
    pub fetch_time: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_content: Option<String>,
    /// Dublin Core `dc:type` of the entry.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Downstream view counter; always starts at zero.
    pub views: u64,
}

/// Build the output record for `entry`, fetched at `fetch_time`.
pub fn assemble(
    feed_title: &str,
    entry: NormalizedEntry,
    translation: Option<Translation>,
    fetch_time: i64,
) -> Item {
    let base = Item {
        feed_title: feed_title.to_string(),
        link: entry.link,
        title: entry.title,
        src_title: None,
        description: entry.description,
        src_description: None,
        pub_time: entry.published_at,
        fetch_time,
        text: entry.text,
        src_content: None,
        kind: entry.kind,
        views: 0,
    };

    match translation {
        None => base,
        Some(t) => Item {
            title: t.title,
            src_title: Some(t.src_title),
            description: t.description,
            src_description: Some(t.src_description),
            text: t.text,
            src_content: t.src_content,
            ..base
        },
    }
}
