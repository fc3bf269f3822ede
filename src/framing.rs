//! Locating record boundaries in the raw byte stream.
//!
//! The framing layer never looks inside a record. It skips the whitespace
//! between records, hands the stream to a `RecordCodec` to materialize one
//! record, and hands the previous record back to the codec to discard its
//! unread tail before moving on.

use crate::encoding::TextEncoding;
use crate::error::{LockViolation, Result};
use crate::stream::RawStream;
use std::io::BufRead;

/// A trait that defines how one record is read from, and released back to, a stream.
///
/// Purpose: Keep record structure out of the framing layer. Both methods are
/// called with the reentrancy lock free; an implementation must acquire it
/// (see `RawStream::with_lock`) around its raw reads and release it before
/// returning. A lock still held on return is a `ProtocolViolation`.
pub trait RecordCodec {
    type Record;

    /// Reads exactly one record starting at the current position.
    ///
    /// Returns `Ok(None)` when no record begins here; the framing layer then
    /// decides between clean end of stream and a truncated record.
    fn materialize<R: BufRead>(&mut self, stream: &mut RawStream<R>)
        -> Result<Option<Self::Record>>;

    /// Consumes whatever part of `record` the caller left unread.
    fn discard<R: BufRead>(&mut self, record: Self::Record, stream: &mut RawStream<R>)
        -> Result<()>;
}

/// Consumes whitespace until the first byte of the next record or end of stream.
/// Returns the number of bytes skipped.
pub(crate) fn skip_whitespace<R: BufRead>(stream: &mut RawStream<R>) -> Result<u64> {
    let start = stream.offset();
    while let Some(byte) = stream.peek_byte()? {
        let c = stream
            .encoding()
            .decode_byte(byte)
            .ok_or_else(|| stream.decode_error(byte))?;
        if !TextEncoding::is_whitespace(c) {
            break;
        }
        stream.consume_peeked();
    }
    let skipped = stream.offset() - start;
    if skipped > 0 {
        log::trace!("skipped {} whitespace bytes at offset {}", skipped, start);
    }
    Ok(skipped)
}

/// Fails if a codec returned while still holding the lock.
fn ensure_released<R: BufRead>(stream: &RawStream<R>) -> Result<()> {
    match stream.holder() {
        Some(holder) => Err(stream.violation(LockViolation::Leaked { holder })),
        None => Ok(()),
    }
}

/// Hands `record` back to the codec to release its unread tail.
pub(crate) fn discard_record<R, C>(
    stream: &mut RawStream<R>,
    codec: &mut C,
    record: C::Record,
) -> Result<()>
where
    R: BufRead,
    C: RecordCodec,
{
    codec.discard(record, stream)?;
    ensure_released(stream)
}

/// One step of the record sequence.
///
/// Returns `Ok(None)` on clean end of stream and `PrematureEnd` when bytes
/// remain that the codec could not start a record from.
pub(crate) fn advance<R, C>(
    stream: &mut RawStream<R>,
    codec: &mut C,
    previous: Option<C::Record>,
) -> Result<Option<C::Record>>
where
    R: BufRead,
    C: RecordCodec,
{
    if let Some(record) = previous {
        discard_record(stream, codec, record)?;
    }

    skip_whitespace(stream)?;

    let start = stream.offset();
    let record = codec.materialize(stream)?;
    ensure_released(stream)?;

    match record {
        Some(record) => {
            log::debug!(
                "record at offset {} ({} bytes of header)",
                start,
                stream.offset() - start
            );
            Ok(Some(record))
        }
        None => {
            if stream.read(1, None)?.is_empty() {
                Ok(None)
            } else {
                Err(stream.premature_end())
            }
        }
    }
}
