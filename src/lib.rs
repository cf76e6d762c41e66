//! feedsweep: incremental RSS ingestion.
//!
//! ## Architecture overview
//!
//! ```text
//!  config ──► schedule ──► crawl ──────────────────────────────► state
//! (feeds)    (due set)    │ per due feed, concurrently:          (commit)
//!                         │  source (fetch + parse)
//!                         │   └► filter ► normalize ► translate ► item ──► output
//! ```
//!
//! * **`config`**: the read-only feed list.
//! * **`state`**: feed name → last successful fetch, committed atomically.
//! * **`schedule`**: pure "is this feed due?" decisions.
//! * **`source`**: the transport seam, the RSS/Atom parser and the raw entry type.
//! * **`filter`**: the recency window.
//! * **`normalize`**: markup stripping and the content → description → title
//!   fallback.
//! * **`translate`**: optional per-field translation with fallback.
//! * **`item`**: the output record.
//! * **`output`**: item sinks.
//! * **`crawl`**: runs one cycle end to end and commits state.
//! * **`error`**: the error taxonomy.

pub mod config;
pub mod crawl;
pub mod error;
pub mod filter;
pub mod item;
pub mod normalize;
pub mod output;
pub mod schedule;
pub mod source;
pub mod state;
pub mod translate;
