//! Where produced items go.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::item::Item;

/// Receives each feed's items as soon as the feed completes.
///
/// The crawl flushes the sink before committing fetch state, so anything
/// accepted here is durable (as far as the sink is) before the feed is
/// marked fetched.
pub trait ItemSink {
    fn emit(&mut self, items: &[Item]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLines<W: Write> {
    writer: W,
}

impl<W: Write> JsonLines<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ItemSink for JsonLines<W> {
    fn emit(&mut self, items: &[Item]) -> io::Result<()> {
        for item in items {
            serde_json::to_writer(&mut self.writer, item)?;
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Collects items in memory.
impl ItemSink for Vec<Item> {
    fn emit(&mut self, items: &[Item]) -> io::Result<()> {
        self.extend_from_slice(items);
        Ok(())
    }
}

/// An output file written under `<path>.new` and only moved over `<path>`
/// by [`persist`](Self::persist).  Dropping it without persisting leaves any
/// earlier `<path>` as it was.
pub struct StagedFile {
    path: PathBuf,
    tmp: PathBuf,
    writer: BufWriter<File>,
}

impl StagedFile {
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let mut name = path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("items"));
        name.push(".new");
        let tmp = path.with_file_name(name);
        let writer = BufWriter::new(File::create(&tmp)?);
        Ok(Self { path, tmp, writer })
    }

    /// Flush, sync and rename the staged file into place.
    pub fn persist(mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        fs::rename(&self.tmp, &self.path)
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
