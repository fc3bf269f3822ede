//! A line-oriented writer for dump files.

use crate::encoding::TextEncoding;
use std::io::{self, Write};

/// The primitive output operations a record uses to lay itself out.
///
/// Implemented by `DumpWriter`; object safe so that `DumpSerialize`
/// implementations do not depend on the sink type.
pub trait DumpSink {
    /// Encodes `text` followed by a newline.
    fn write_line(&mut self, text: &str) -> io::Result<()>;

    /// Writes `data` unchanged.
    fn write_raw(&mut self, data: &[u8]) -> io::Result<()>;

    /// Writes a raw buffer or a self-serializing value.
    fn write(&mut self, value: Writable<'_>) -> io::Result<()>;
}

/// A trait for values that own their exact on-wire layout.
///
/// Composite values may call `sink.write(...)` on their parts, nesting freely.
pub trait DumpSerialize {
    fn serialize_to(&self, sink: &mut dyn DumpSink) -> io::Result<()>;
}

/// Something `DumpWriter::write` accepts: bytes already in wire form, or a
/// value that knows how to write itself.
#[derive(Clone, Copy)]
pub enum Writable<'a> {
    Raw(&'a [u8]),
    Serialize(&'a dyn DumpSerialize),
}

impl<'a> From<&'a [u8]> for Writable<'a> {
    fn from(data: &'a [u8]) -> Self {
        Writable::Raw(data)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Writable<'a> {
    fn from(data: &'a [u8; N]) -> Self {
        Writable::Raw(data)
    }
}

impl<'a> From<&'a Vec<u8>> for Writable<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Writable::Raw(data)
    }
}

impl<'a, T: DumpSerialize> From<&'a T> for Writable<'a> {
    fn from(value: &'a T) -> Self {
        Writable::Serialize(value)
    }
}

/// A writer for dump files.
///
/// Write failures come straight from the underlying sink. Text that the
/// configured encoding cannot represent fails with `ErrorKind::InvalidData`
/// before anything is written.
pub struct DumpWriter<W: Write> {
    writer: W,
    encoding: TextEncoding,
}

impl<W: Write> DumpWriter<W> {
    /// Creates a new `DumpWriter` encoding text as ASCII.
    pub fn new(writer: W) -> Self {
        Self::with_encoding(writer, TextEncoding::default())
    }

    pub fn with_encoding(writer: W, encoding: TextEncoding) -> Self {
        Self { writer, encoding }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Writes a raw buffer or a self-serializing value.
    ///
    /// ```rust
    /// # use dumpstream::{DumpRecord, DumpWriter};
    /// let mut out = Vec::new();
    /// let mut writer = DumpWriter::new(&mut out);
    /// writer.write(b"SVN-fs-dump-format-version: 2\n\n")?;
    /// writer.write(&DumpRecord::new().with_header("Revision-number", "0"))?;
    /// assert_eq!(out, b"SVN-fs-dump-format-version: 2\n\nRevision-number: 0\n\n");
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn write<'a>(&mut self, value: impl Into<Writable<'a>>) -> io::Result<()> {
        DumpSink::write(self, value.into())
    }

    pub fn write_line(&mut self, text: &str) -> io::Result<()> {
        DumpSink::write_line(self, text)
    }

    pub fn write_raw(&mut self, data: &[u8]) -> io::Result<()> {
        DumpSink::write_raw(self, data)
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consumes the writer, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: Write> DumpSink for DumpWriter<W> {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        let mut data = self.encoding.encode(text).map_err(|c| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("character {c:?} cannot be encoded as {}", self.encoding),
            )
        })?;
        data.push(b'\n');
        self.writer.write_all(&data)
    }

    fn write_raw(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)
    }

    fn write(&mut self, value: Writable<'_>) -> io::Result<()> {
        match value {
            Writable::Raw(data) => self.write_raw(data),
            Writable::Serialize(value) => value.serialize_to(self),
        }
    }
}
