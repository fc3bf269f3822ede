//! Header-block records: `Key: value` lines, an empty line, then a payload
//! whose length is given by one of the headers.
//!
//! This is the record shape of Subversion-style dump files. Only the length
//! header is interpreted; everything else is carried as opaque text.

use crate::error::{Error, Result};
use crate::framing::RecordCodec;
use crate::stream::{Owner, RawStream};
use crate::writer::{DumpSerialize, DumpSink};
use std::io::{self, BufRead};

/// Payload-length header used by Subversion dumps.
pub const CONTENT_LENGTH: &str = "Content-length";

/// Ordered header list. Keys are case-sensitive and may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, keeping any existing one with the same key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Replaces the first header named `key`, or appends it.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Value of the first header named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Splits `Key: value`. A bare `Key:` yields an empty value.
fn parse_header(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value.strip_prefix(' ').unwrap_or(value)))
}

/// A `RecordCodec` for header-block records.
///
/// Headers are read eagerly. The payload is left in the stream; read it with
/// `HeaderRecord::read_content`, or let the next advance skip over it.
#[derive(Debug, Clone)]
pub struct HeaderCodec {
    owner: Owner,
    length_header: String,
}

impl HeaderCodec {
    pub fn new() -> Self {
        Self::with_length_header(CONTENT_LENGTH)
    }

    /// Uses `name` instead of `Content-length` to find the payload size.
    pub fn with_length_header(name: impl Into<String>) -> Self {
        Self {
            owner: Owner::new(),
            length_header: name.into(),
        }
    }

    /// The lock token this codec reads under.
    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn length_header(&self) -> &str {
        &self.length_header
    }
}

impl Default for HeaderCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordCodec for HeaderCodec {
    type Record = HeaderRecord;

    fn materialize<R: BufRead>(
        &mut self,
        stream: &mut RawStream<R>,
    ) -> Result<Option<HeaderRecord>> {
        let owner = self.owner;
        let length_header = self.length_header.as_str();
        stream.with_lock(owner, |s| {
            let mut line = match s.readline(Some(owner)) {
                Ok(line) => line,
                Err(Error::EndOfStream { .. }) => return Ok(None),
                Err(e) => return Err(e),
            };

            // A malformed line is only reported once the block is known to be
            // complete; a block cut short by EOF is a truncation first.
            let mut headers = Headers::new();
            let mut malformed = None;
            while !line.is_empty() {
                match parse_header(&line) {
                    Some((key, value)) => headers.push(key, value),
                    None if malformed.is_none() => {
                        malformed =
                            Some(s.invalid_record(format!("malformed header line {line:?}")));
                    }
                    None => {}
                }
                line = match s.readline(Some(owner)) {
                    Ok(line) => line,
                    Err(Error::EndOfStream { .. }) => return Err(s.premature_end()),
                    Err(e) => return Err(e),
                };
            }
            if let Some(e) = malformed {
                return Err(e);
            }

            let content_length = match headers.get(length_header) {
                Some(value) => value.trim().parse::<u64>().map_err(|_| {
                    s.invalid_record(format!("bad {length_header} value {value:?}"))
                })?,
                None => 0,
            };

            Ok(Some(HeaderRecord {
                headers,
                content_length,
                remaining: content_length,
                owner,
            }))
        })
    }

    fn discard<R: BufRead>(&mut self, record: HeaderRecord, stream: &mut RawStream<R>) -> Result<()> {
        if record.remaining == 0 {
            return Ok(());
        }
        let owner = record.owner;
        stream.with_lock(owner, |s| {
            let skipped = s.skip(record.remaining, Some(owner))?;
            if skipped < record.remaining {
                return Err(s.premature_end());
            }
            log::trace!("discarded {} unread payload bytes", skipped);
            Ok(())
        })
    }
}

/// A record materialized by `HeaderCodec`.
#[derive(Debug)]
pub struct HeaderRecord {
    headers: Headers,
    content_length: u64,
    remaining: u64,
    owner: Owner,
}

impl HeaderRecord {
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Declared payload size in bytes.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Payload bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Reads up to `max` bytes of the payload.
    ///
    /// Returns an empty buffer once the payload is exhausted, and fails with
    /// `PrematureEnd` if the stream ends before the declared length.
    pub fn read_content<R: BufRead>(
        &mut self,
        stream: &mut RawStream<R>,
        max: usize,
    ) -> Result<Vec<u8>> {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(max);
        if n == 0 {
            return Ok(Vec::new());
        }
        let owner = self.owner;
        let data = stream.with_lock(owner, |s| s.read(n, Some(owner)))?;
        self.remaining -= data.len() as u64;
        if data.len() < n {
            return Err(stream.premature_end());
        }
        Ok(data)
    }

    /// Reads the rest of the payload.
    pub fn read_to_end<R: BufRead>(&mut self, stream: &mut RawStream<R>) -> Result<Vec<u8>> {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        self.read_content(stream, n)
    }

    /// Reads the rest of the payload into an owned, writable record.
    /// Only valid before any payload has been read.
    pub fn to_dump_record<R: BufRead>(&mut self, stream: &mut RawStream<R>) -> Result<DumpRecord> {
        if self.remaining != self.content_length {
            return Err(stream.invalid_record("payload already partially read"));
        }
        let content = self.read_to_end(stream)?;
        Ok(DumpRecord {
            headers: self.headers.clone(),
            content,
        })
    }
}

/// An owned header-block record, as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DumpRecord {
    pub headers: Headers,
    pub content: Vec<u8>,
}

impl DumpRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(key, value);
        self
    }

    /// Sets the payload and its `Content-length` header.
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self.headers
            .set(CONTENT_LENGTH, self.content.len().to_string());
        self
    }
}

impl DumpSerialize for DumpRecord {
    /// Writes the headers, an empty line, then the payload.
    ///
    /// `Content-length` is always written from `content`, replacing a stale
    /// value in place or appended when missing. A record without headers
    /// would be indistinguishable from separator whitespace and is rejected.
    fn serialize_to(&self, sink: &mut dyn DumpSink) -> io::Result<()> {
        if self.headers.is_empty() && self.content.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "record has no headers",
            ));
        }
        let length = self.content.len().to_string();
        let mut wrote_length = false;
        for (key, value) in self.headers.iter() {
            if key == CONTENT_LENGTH {
                if wrote_length {
                    continue;
                }
                wrote_length = true;
                sink.write_line(&format!("{key}: {length}"))?;
            } else {
                sink.write_line(&format!("{key}: {value}"))?;
            }
        }
        if !wrote_length && !self.content.is_empty() {
            sink.write_line(&format!("{CONTENT_LENGTH}: {length}"))?;
        }
        sink.write_line("")?;
        if !self.content.is_empty() {
            sink.write_raw(&self.content)?;
            sink.write_line("")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;
    use crate::writer::DumpWriter;
    use std::io::Cursor;

    fn stream(data: &[u8]) -> RawStream<Cursor<Vec<u8>>> {
        RawStream::new(Cursor::new(data.to_vec()), TextEncoding::Ascii)
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("Node-path: trunk/a b"), Some(("Node-path", "trunk/a b")));
        assert_eq!(parse_header("Prop-delta:"), Some(("Prop-delta", "")));
        assert_eq!(parse_header("no colon"), None);
        assert_eq!(parse_header(": value"), None);
        assert_eq!(parse_header("two words: x"), None);
    }

    #[test]
    fn test_headers_set_and_remove() {
        let mut h: Headers = [("A", "1"), ("B", "2"), ("A", "3")].into_iter().collect();
        assert_eq!(h.get("A"), Some("1"));
        h.set("A", "9");
        assert_eq!(h.iter().collect::<Vec<_>>(), [("A", "9"), ("B", "2"), ("A", "3")]);
        assert_eq!(h.remove("B"), Some("2".to_string()));
        h.set("C", "4");
        assert_eq!(h.len(), 3);
        assert_eq!(h.get("a"), None);
    }

    #[test]
    fn test_materialize_leaves_payload() {
        let mut s = stream(b"Node-path: a\nContent-length: 4\n\nbody");
        let mut codec = HeaderCodec::new();
        let mut record = codec.materialize(&mut s).unwrap().unwrap();
        assert_eq!(s.holder(), None);
        assert_eq!(record.content_length(), 4);
        assert_eq!(s.offset(), 32);
        assert_eq!(record.read_content(&mut s, 2).unwrap(), b"bo");
        assert_eq!(record.remaining(), 2);
        codec.discard(record, &mut s).unwrap();
        assert_eq!(s.offset(), 36);
        assert_eq!(s.holder(), None);
    }

    #[test]
    fn test_materialize_at_eof_is_no_record() {
        let mut s = stream(b"");
        assert!(HeaderCodec::new().materialize(&mut s).unwrap().is_none());
        assert_eq!(s.holder(), None);
    }

    #[test]
    fn test_truncated_header_block() {
        let mut s = stream(b"Node-path: a\nNode-kind: file");
        match HeaderCodec::new().materialize(&mut s) {
            Err(Error::PrematureEnd { at }) => {
                assert_eq!(at.offset, 28);
                assert_eq!(at.last_line, "Node-kind: file");
            }
            other => panic!("expected PrematureEnd, got {other:?}"),
        }
        assert_eq!(s.holder(), None);
    }

    #[test]
    fn test_bad_length_and_bad_header() {
        let mut s = stream(b"Content-length: ten\n\n");
        assert!(matches!(
            HeaderCodec::new().materialize(&mut s),
            Err(Error::InvalidRecord { .. })
        ));

        let mut s = stream(b"garbage line\n\n");
        match HeaderCodec::new().materialize(&mut s) {
            Err(Error::InvalidRecord { at, .. }) => assert_eq!(at.last_line, "garbage line"),
            other => panic!("expected InvalidRecord, got {other:?}"),
        }

        // Without the closing empty line the block is truncated, not malformed.
        let mut s = stream(b"Node-path: a\nCont");
        assert!(matches!(
            HeaderCodec::new().materialize(&mut s),
            Err(Error::PrematureEnd { .. })
        ));
    }

    #[test]
    fn test_custom_length_header() {
        let mut s = stream(b"Text-content-length: 2\nContent-length: 9\n\nhi");
        let mut codec = HeaderCodec::with_length_header("Text-content-length");
        let mut record = codec.materialize(&mut s).unwrap().unwrap();
        assert_eq!(record.read_to_end(&mut s).unwrap(), b"hi");
    }

    #[test]
    fn test_short_payload_read_counts_consumed_bytes() {
        let mut s = stream(b"Content-length: 10\n\nabc");
        let mut record = HeaderCodec::new().materialize(&mut s).unwrap().unwrap();
        assert!(matches!(
            record.read_content(&mut s, 10),
            Err(Error::PrematureEnd { at }) if at.offset == 23
        ));
        assert_eq!(record.remaining(), 7);
        assert_eq!(s.holder(), None);
    }

    #[test]
    fn test_length_header_follows_content() {
        let mut record = DumpRecord::new()
            .with_header("Node-path", "a")
            .with_content(b"abc".to_vec())
            .with_header("Node-kind", "file");
        record.content = b"abcdef".to_vec();

        let mut out = Vec::new();
        DumpWriter::new(&mut out).write(&record).unwrap();
        assert_eq!(
            out,
            b"Node-path: a\nContent-length: 6\nNode-kind: file\n\nabcdef\n"
        );

        let mut s = stream(&out);
        let mut read = HeaderCodec::new().materialize(&mut s).unwrap().unwrap();
        assert_eq!(read.read_to_end(&mut s).unwrap(), b"abcdef");

        // Appended when missing, and zero once the payload is cleared.
        let record = DumpRecord {
            headers: [("Node-path", "b")].into_iter().collect(),
            content: b"xy".to_vec(),
        };
        let mut out = Vec::new();
        DumpWriter::new(&mut out).write(&record).unwrap();
        assert_eq!(out, b"Node-path: b\nContent-length: 2\n\nxy\n");

        let mut record = record.with_content(Vec::new());
        record.headers.push("Node-kind", "dir");
        let mut out = Vec::new();
        DumpWriter::new(&mut out).write(&record).unwrap();
        assert_eq!(out, b"Node-path: b\nContent-length: 0\nNode-kind: dir\n\n");
    }

    #[test]
    fn test_record_without_headers_is_rejected() {
        let mut out = Vec::new();
        let err = DumpWriter::new(&mut out).write(&DumpRecord::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(out.is_empty());

        // A payload alone still gets its length header.
        DumpWriter::new(&mut out)
            .write(&DumpRecord::new().with_content(b"z".to_vec()))
            .unwrap();
        assert_eq!(out, b"Content-length: 1\n\nz\n");
    }

    #[test]
    fn test_to_dump_record_requires_unread_payload() {
        let mut s = stream(b"Content-length: 3\n\nxyz");
        let mut record = HeaderCodec::new().materialize(&mut s).unwrap().unwrap();
        let owned = record.to_dump_record(&mut s).unwrap();
        assert_eq!(owned, DumpRecord::new().with_content(b"xyz".to_vec()));

        let mut s = stream(b"Content-length: 3\n\nxyz");
        let mut record = HeaderCodec::new().materialize(&mut s).unwrap().unwrap();
        record.read_content(&mut s, 1).unwrap();
        assert!(record.to_dump_record(&mut s).is_err());
    }
}
