//! Which feeds are due this cycle.
//!
//! Pure functions over the feed list, a fetch-state snapshot and the cycle's
//! `now`; no I/O happens here.

use tracing::info;

use crate::config::{FeedDescriptor, FeedRegistry};
use crate::error::ClockSkewError;
use crate::state::FetchState;

/// Decide whether `feed` should be fetched at `now`.
///
/// * disabled feeds are never due;
/// * a feed with no recorded fetch is always due;
/// * otherwise it is due once `recrawl_interval` seconds have elapsed.
///
/// A recorded fetch later than `now` is a [`ClockSkewError`].
pub fn is_due(feed: &FeedDescriptor, state: &FetchState, now: i64) -> Result<bool, ClockSkewError> {
    if feed.disabled {
        return Ok(false);
    }
    let Some(&last_fetch_ts) = state.get(&feed.name) else {
        return Ok(true);
    };
    if now < last_fetch_ts {
        return Err(ClockSkewError {
            feed: feed.name.clone(),
            now,
            last_fetch_ts,
        });
    }
    let elapsed = now.abs_diff(last_fetch_ts);
    Ok(elapsed >= feed.recrawl_interval)
}

/// Evaluate every configured feed and return the due ones in configuration
/// order.  Any clock skew aborts the whole evaluation.
pub fn due_feeds<'a>(
    registry: &'a FeedRegistry,
    state: &FetchState,
    now: i64,
) -> Result<Vec<&'a FeedDescriptor>, ClockSkewError> {
    let mut due = Vec::new();
    for feed in registry.iter() {
        if is_due(feed, state, now)? {
            due.push(feed);
        } else if !feed.disabled {
            info!(
                feed = %feed.name,
                current_ts = now,
                last_fetch_ts = state.get(&feed.name).copied().unwrap_or(0),
                recrawl_interval = feed.recrawl_interval,
                "skip, not due yet"
            );
        }
    }
    Ok(due)
}
