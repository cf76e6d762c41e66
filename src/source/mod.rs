//! Everything that touches raw feed documents.
//!
//! * [`Transport`]: the network seam.  The crawl never talks to the network
//!   directly; the host supplies a transport ([`HttpTransport`] in the
//!   binary, in-memory doubles in tests).
//! * [`rss`]: turns an RSS or Atom payload into a [`ParsedDocument`] or a
//!   [`ParseFailure`](crate::error::ParseFailure).
//! * [`RawEntry`]: one item as it appeared in the document.
//!
//! ## Adding another document format
//!
//! 1. Create a new file in this directory (e.g. `jsonfeed.rs`) with a
//!    `parse(&[u8]) -> Result<ParsedDocument, ParseFailure>` function.
//! 2. Map its items into [`RawEntry`] values, keeping document order.
//! 3. Call it from the feed task in `crawl.rs` (`FeedJob::process`).

mod entry;
mod http;
pub mod rss;

pub use self::rss::ParsedDocument;
pub use entry::RawEntry;
pub use http::HttpTransport;

use async_trait::async_trait;

use crate::error::FetchError;

/// Retrieves the raw bytes of a feed document.
///
/// Retries, pooling and concurrency limits belong to the implementation.
/// Called from many tasks at once, hence `Send + Sync`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
