//! Recency window.

use tracing::warn;

use crate::error::MalformedEntryError;
use crate::source::RawEntry;

/// An entry that passed the recency window, with its resolved publication
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedEntry {
    pub entry: RawEntry,
    pub published_at: i64,
}

/// Result of filtering one feed's entries.
#[derive(Debug, Default)]
pub struct Filtered {
    /// Entries with `published_at >= cutoff`, in source order.
    pub retained: Vec<DatedEntry>,
    /// Entries whose date could not be determined.
    pub rejected: Vec<MalformedEntryError>,
}

/// Keep entries published at or after `cutoff_ts`.  Undated entries are
/// rejected individually; the rest of the feed is unaffected.
pub fn filter(entries: Vec<RawEntry>, cutoff_ts: i64) -> Filtered {
    let mut out = Filtered::default();
    for entry in entries {
        match entry.published_at() {
            Ok(published_at) if published_at >= cutoff_ts => {
                out.retained.push(DatedEntry { entry, published_at });
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "dropping malformed entry");
                out.rejected.push(e);
            }
        }
    }
    out
}

/// `now - hours`, the oldest publication time still inside the window.
pub fn cutoff(now: i64, retention_hours: u64) -> i64 {
    let window = i64::try_from(retention_hours.saturating_mul(3_600)).unwrap_or(i64::MAX);
    now.saturating_sub(window)
}
