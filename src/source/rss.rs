//! Feed document parser.
//!
//! Turns a fetched payload into a [`ParsedDocument`].  RSS 0.9x/1.0/2.0 goes
//! through the [`rss`] crate; a document whose root is not `<rss>` or
//! `<rdf:RDF>` is retried as Atom with [`feed_rs`].  A payload neither accepts,
//! or one with anything but whitespace after the closing root tag, is
//! reported as a [`ParseFailure`]; the caller must then treat the feed as not
//! fetched.
//!
//! The parser is a pure function over bytes so tests can exercise it without
//! a transport.

use std::io::{self, BufRead, Read};

use crate::error::{ParseFailure, Position};

use super::RawEntry;

/// A successfully parsed feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Channel-level `<title>`.
    pub title: String,
    /// Items in document order.
    pub entries: Vec<RawEntry>,
}

/// Parse a raw RSS or Atom payload.
pub fn parse(raw: &[u8]) -> Result<ParsedDocument, ParseFailure> {
    let mut reader = CountingReader::new(raw);
    match rss::Channel::read_from(&mut reader) {
        Ok(channel) if reader.rest.iter().all(u8::is_ascii_whitespace) => {
            Ok(from_channel(&channel))
        }
        Ok(_) => Err(ParseFailure {
            kind: "TrailingContent",
            message: "unexpected content after the closing root tag".into(),
            position: Some(position_at(raw, reader.consumed)),
        }),
        Err(rss::Error::InvalidStartTag) => {
            let not_rss = failure(rss::Error::InvalidStartTag, raw, reader.consumed);
            feed_rs::parser::parse(raw).map(from_atom).map_err(|_| not_rss)
        }
        Err(err) => Err(failure(err, raw, reader.consumed)),
    }
}

fn from_channel(channel: &rss::Channel) -> ParsedDocument {
    let entries = channel
        .items()
        .iter()
        .map(|item| {
            let dc = item.dublin_core_ext();
            RawEntry {
                link: item.link().unwrap_or_default().to_string(),
                title: item.title().unwrap_or_default().to_string(),
                description: item.description().unwrap_or_default().to_string(),
                content: item.content().map(String::from),
                published: item
                    .pub_date()
                    .map(String::from)
                    .or_else(|| dc.and_then(|dc| dc.dates().first().cloned())),
                kind: dc.and_then(|dc| dc.types().first().cloned()),
            }
        })
        .collect();

    ParsedDocument {
        title: channel.title().to_string(),
        entries,
    }
}

fn from_atom(feed: feed_rs::model::Feed) -> ParsedDocument {
    let entries = feed
        .entries
        .into_iter()
        .map(|entry| RawEntry {
            link: entry.links.first().map(|l| l.href.clone()).unwrap_or_default(),
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            description: entry.summary.map(|t| t.content).unwrap_or_default(),
            content: entry.content.and_then(|c| c.body),
            published: entry.published.or(entry.updated).map(|ts| ts.to_rfc3339()),
            kind: None,
        })
        .collect();

    ParsedDocument {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        entries,
    }
}

fn failure(err: rss::Error, raw: &[u8], consumed: usize) -> ParseFailure {
    let (kind, positioned) = match &err {
        rss::Error::Xml(_) => ("XmlError", true),
        rss::Error::InvalidStartTag => ("InvalidStartTag", true),
        rss::Error::Eof => ("UnexpectedEof", false),
        rss::Error::Utf8(_) => ("Utf8Error", false),
    };
    ParseFailure {
        kind,
        message: err.to_string(),
        position: positioned.then(|| position_at(raw, consumed)),
    }
}

/// 1-based line and column of byte `offset` in `raw`.
fn position_at(raw: &[u8], offset: usize) -> Position {
    let before = &raw[..offset.min(raw.len())];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    let column = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
    Position { line, column }
}

/// Byte-slice reader that remembers how far the XML reader got.
struct CountingReader<'a> {
    rest: &'a [u8],
    consumed: usize,
}

impl<'a> CountingReader<'a> {
    fn new(raw: &'a [u8]) -> Self {
        Self { rest: raw, consumed: 0 }
    }
}

impl Read for CountingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.rest.read(buf)?;
        self.consumed += n;
        Ok(n)
    }
}

impl BufRead for CountingReader<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.rest)
    }

    fn consume(&mut self, amt: usize) {
        let amt = amt.min(self.rest.len());
        self.rest = &self.rest[amt..];
        self.consumed += amt;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
