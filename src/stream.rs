//! Position-tracked raw access to the byte source, gated by a reentrancy lock.

use crate::encoding::TextEncoding;
use crate::error::{Error, LockViolation, Position, Result};
use std::fmt;
use std::io::{self, BufRead, Read};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a consumer allowed to hold the raw-read lock.
///
/// Every call to `Owner::new` yields a distinct token. Record codecs keep one
/// and pass it to `block`, `read`, `readline` and `unblock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner(u64);

impl Owner {
    pub fn new() -> Self {
        Self(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

/// A forward-only byte cursor over a buffered source.
///
/// Tracks how many raw bytes were consumed (`offset`) and the last decoded
/// line (`last_line`) so that failures can say where they happened. At most
/// one `Owner` may hold the lock at a time; while it is held, only the holder
/// may consume bytes.
pub struct RawStream<R> {
    source: R,
    encoding: TextEncoding,
    offset: u64,
    last_line: String,
    holder: Option<Owner>,
}

impl<R: BufRead> RawStream<R> {
    pub fn new(source: R, encoding: TextEncoding) -> Self {
        Self {
            source,
            encoding,
            offset: 0,
            last_line: String::new(),
            holder: None,
        }
    }

    /// Raw bytes consumed since the stream was opened.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn last_line(&self) -> &str {
        &self.last_line
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// The current lock holder, if any.
    pub fn holder(&self) -> Option<Owner> {
        self.holder
    }

    /// Snapshot of the diagnostic state.
    pub fn position(&self) -> Position {
        Position {
            offset: self.offset,
            last_line: self.last_line.clone(),
        }
    }

    /// Acquires exclusive raw-read permission for `owner`.
    ///
    /// Re-acquiring by the current holder is a no-op.
    pub fn block(&mut self, owner: Owner) -> Result<()> {
        match self.holder {
            Some(holder) if holder != owner => Err(self.violation(LockViolation::AlreadyHeld {
                holder,
                requested: owner,
            })),
            _ => {
                self.holder = Some(owner);
                Ok(())
            }
        }
    }

    /// Releases the lock. Fails unless `owner` is the current holder.
    pub fn unblock(&mut self, owner: Owner) -> Result<()> {
        if self.holder != Some(owner) {
            return Err(self.violation(LockViolation::NotHolder {
                holder: self.holder,
                caller: owner,
            }));
        }
        self.holder = None;
        Ok(())
    }

    /// Runs `f` with the lock held by `owner`, releasing it afterwards even
    /// when `f` fails. An error from `f` takes precedence over a release error.
    ///
    /// If `owner` already holds the lock, it is left held: only the call that
    /// acquired the lock releases it.
    pub fn with_lock<T, F>(&mut self, owner: Owner, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let acquired = self.holder != Some(owner);
        self.block(owner)?;
        let result = f(self);
        let released = if acquired { self.unblock(owner) } else { Ok(()) };
        let value = result?;
        released?;
        Ok(value)
    }

    /// Reads up to `length` bytes; fewer only at end of stream.
    pub fn read(&mut self, length: usize, caller: Option<Owner>) -> Result<Vec<u8>> {
        self.check_caller(caller)?;
        let mut data = Vec::with_capacity(length.min(64 * 1024));
        let result = Read::by_ref(&mut self.source)
            .take(length as u64)
            .read_to_end(&mut data);
        // Bytes appended before a failure were consumed all the same.
        self.offset += data.len() as u64;
        match result {
            Ok(_) => Ok(data),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Reads exactly `length` bytes, failing with `PrematureEnd` on a short read.
    pub fn read_exact_len(&mut self, length: usize, caller: Option<Owner>) -> Result<Vec<u8>> {
        let data = self.read(length, caller)?;
        if data.len() < length {
            return Err(self.premature_end());
        }
        Ok(data)
    }

    /// Consumes and drops up to `length` bytes without buffering them.
    /// Returns the number of bytes skipped.
    pub fn skip(&mut self, length: u64, caller: Option<Owner>) -> Result<u64> {
        self.check_caller(caller)?;
        let mut remaining = length;
        while remaining > 0 {
            let available = match self.source.fill_buf().map(|buf| buf.len()) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.io_error(e)),
            };
            let n = available.min(usize::try_from(remaining).unwrap_or(usize::MAX));
            self.source.consume(n);
            self.offset += n as u64;
            remaining -= n as u64;
        }
        Ok(length - remaining)
    }

    /// Reads one newline-terminated line, decodes it and records it as
    /// `last_line`. The final line of the source may lack the newline.
    pub fn readline(&mut self, caller: Option<Owner>) -> Result<String> {
        self.check_caller(caller)?;
        let mut raw = Vec::new();
        let result = self.source.read_until(b'\n', &mut raw);
        self.offset += raw.len() as u64;
        if let Err(e) = result {
            return Err(self.io_error(e));
        }
        if raw.is_empty() {
            return Err(Error::EndOfStream {
                at: self.position(),
            });
        }
        if raw.last() == Some(&b'\n') {
            raw.pop();
        }
        match self.encoding.decode(&raw) {
            Ok(line) => {
                log::trace!("line at offset {}: {:?}", self.offset, line);
                self.last_line.clone_from(&line);
                Ok(line)
            }
            Err(byte) => Err(self.decode_error(byte)),
        }
    }

    /// Looks at the next byte without consuming it. `None` at end of stream.
    pub(crate) fn peek_byte(&mut self) -> Result<Option<u8>> {
        self.check_caller(None)?;
        loop {
            match self.source.fill_buf().map(|buf| buf.first().copied()) {
                Ok(byte) => return Ok(byte),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.io_error(e)),
            }
        }
    }

    /// Consumes the byte most recently returned by `peek_byte`.
    pub(crate) fn consume_peeked(&mut self) {
        self.source.consume(1);
        self.offset += 1;
    }

    /// Consumes the underlying source, returning it.
    pub fn into_inner(self) -> R {
        self.source
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    fn check_caller(&self, caller: Option<Owner>) -> Result<()> {
        match self.holder {
            Some(holder) if caller != Some(holder) => {
                Err(self.violation(LockViolation::LockedByOther { holder, caller }))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn violation(&self, violation: LockViolation) -> Error {
        Error::ProtocolViolation {
            violation,
            at: self.position(),
        }
    }

    pub(crate) fn io_error(&self, source: io::Error) -> Error {
        Error::Io {
            source,
            at: self.position(),
        }
    }

    pub(crate) fn decode_error(&self, byte: u8) -> Error {
        Error::Decode {
            byte,
            encoding: self.encoding,
            at: self.position(),
        }
    }

    /// Builds a `PrematureEnd` error at the current position.
    pub fn premature_end(&self) -> Error {
        Error::PrematureEnd {
            at: self.position(),
        }
    }

    /// Builds an `InvalidRecord` error at the current position.
    pub fn invalid_record(&self, message: impl Into<String>) -> Error {
        Error::invalid_record(message, self.position())
    }
}
