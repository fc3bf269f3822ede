//! A lazy, forward-only reader of dump records.

use crate::encoding::TextEncoding;
use crate::error::{Position, Result};
use crate::framing::{self, RecordCodec};
use crate::stream::RawStream;
use std::io::BufRead;

/// A reader for streaming records from a dump file.
///
/// The reader is generic over a `RecordCodec`, which owns the structure of
/// a record. The reader only finds where records start, keeps the offset
/// and last decoded line for diagnostics, and makes sure a record's unread
/// tail is consumed before the next record is read.
///
/// Each record stays valid until the next advance. The sequence cannot be
/// restarted: after clean end of stream or after an error, every further
/// advance returns `Ok(None)`.
///
/// ```rust
/// # use dumpstream::{DumpReader, HeaderCodec, Result};
/// # use std::io::Cursor;
/// let data = b"Revision-number: 1\nContent-length: 3\n\nabc\n\nRevision-number: 2\n\n";
/// let mut reader = DumpReader::new(Cursor::new(&data[..]), HeaderCodec::new());
///
/// let mut revisions = Vec::new();
/// reader.process_all(|record| {
///     revisions.push(record.headers().get("Revision-number").unwrap().to_string());
///     Ok(())
/// })?;
/// assert_eq!(revisions, ["1", "2"]);
/// # Ok::<(), dumpstream::Error>(())
/// ```
pub struct DumpReader<R, C: RecordCodec> {
    stream: RawStream<R>,
    codec: C,
    current: Option<C::Record>,
    finished: bool,
}

impl<R: BufRead, C: RecordCodec> DumpReader<R, C> {
    /// Creates a new `DumpReader` decoding text as ASCII.
    pub fn new(source: R, codec: C) -> Self {
        Self::with_encoding(source, codec, TextEncoding::default())
    }

    /// Creates a new `DumpReader` with an explicit text encoding.
    pub fn with_encoding(source: R, codec: C, encoding: TextEncoding) -> Self {
        Self {
            stream: RawStream::new(source, encoding),
            codec,
            current: None,
            finished: false,
        }
    }

    pub fn offset(&self) -> u64 {
        self.stream.offset()
    }

    pub fn last_line(&self) -> &str {
        self.stream.last_line()
    }

    pub fn position(&self) -> Position {
        self.stream.position()
    }

    pub fn encoding(&self) -> TextEncoding {
        self.stream.encoding()
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// The record produced by the last advance, if still current.
    pub fn current(&self) -> Option<&C::Record> {
        self.current.as_ref()
    }

    /// The current record together with the raw stream, for records that
    /// read their payload lazily.
    pub fn current_with_stream(&mut self) -> Option<(&mut C::Record, &mut RawStream<R>)> {
        let record = self.current.as_mut()?;
        Some((record, &mut self.stream))
    }

    /// Direct access to the raw stream. Reads made here move the cursor the
    /// record sequence continues from.
    pub fn stream_mut(&mut self) -> &mut RawStream<R> {
        &mut self.stream
    }

    /// True once the sequence has ended, cleanly or with an error.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advances to the next record.
    ///
    /// # Returns
    /// * `Ok(Some(record))` - A record was materialized
    /// * `Ok(None)` - End of stream reached
    /// * `Err(e)` - Malformed or truncated input; the sequence is over
    pub fn next_record(&mut self) -> Result<Option<&mut C::Record>> {
        if self.finished {
            return Ok(None);
        }
        let previous = self.current.take();
        match framing::advance(&mut self.stream, &mut self.codec, previous) {
            Ok(Some(record)) => {
                self.current = Some(record);
                Ok(self.current.as_mut())
            }
            Ok(None) => {
                log::debug!("end of dump at offset {}", self.stream.offset());
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                log::warn!("dump framing failed: {}", e);
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Processes all remaining records using a closure.
    ///
    /// The closure should return `Ok(())` to continue or an error to stop.
    pub fn process_all<F>(&mut self, mut processor: F) -> Result<()>
    where
        F: FnMut(&mut C::Record) -> Result<()>,
    {
        while let Some(record) = self.next_record()? {
            processor(record)?;
        }
        Ok(())
    }

    /// Like `process_all`, but the closure also gets the raw stream so it can
    /// pull a record's payload.
    pub fn process_all_with_stream<F>(&mut self, mut processor: F) -> Result<()>
    where
        F: FnMut(&mut C::Record, &mut RawStream<R>) -> Result<()>,
    {
        while self.next_record()?.is_some() {
            if let Some((record, stream)) = self.current_with_stream() {
                processor(record, stream)?;
            }
        }
        Ok(())
    }

    /// Returns an iterator-like object for manual record processing.
    pub fn records(&mut self) -> Records<'_, R, C> {
        Records { reader: self }
    }

    /// Discards the current record's tail and ends the sequence.
    pub fn finish(&mut self) -> Result<()> {
        self.finished = true;
        match self.current.take() {
            Some(record) => framing::discard_record(&mut self.stream, &mut self.codec, record),
            None => Ok(()),
        }
    }

    /// Consumes the reader, returning the underlying source. The current
    /// record, if any, is dropped without consuming its tail.
    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }
}

/// An iterator-like object for manual record processing.
///
/// Records borrow the reader, so this cannot be a `std::iter::Iterator`.
pub struct Records<'a, R, C: RecordCodec> {
    reader: &'a mut DumpReader<R, C>,
}

impl<'a, R: BufRead, C: RecordCodec> Records<'a, R, C> {
    /// Returns the next record in the stream.
    pub fn next(&mut self) -> Result<Option<&mut C::Record>> {
        self.reader.next_record()
    }
}
