use crate::encoding::TextEncoding;
use crate::stream::Owner;
use std::fmt;
use thiserror::Error;

/// Snapshot of the reader's diagnostic state at the moment of a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Raw bytes consumed from the source before the failure.
    pub offset: u64,
    /// The most recently decoded line, newline stripped.
    pub last_line: String,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line: '{}', offset: {}", self.last_line, self.offset)
    }
}

/// Misuse of the reentrancy lock guarding raw reads.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockViolation {
    /// `block` was called while another owner holds the lock.
    #[error("lock requested by {requested} while held by {holder}")]
    AlreadyHeld { holder: Owner, requested: Owner },

    /// `unblock` was called by someone other than the holder.
    #[error("lock released by {caller} but held by {holder:?}")]
    NotHolder {
        holder: Option<Owner>,
        caller: Owner,
    },

    /// A raw read was attempted by a non-holder while the lock is held.
    #[error("raw read by {caller:?} while locked by {holder}")]
    LockedByOther {
        holder: Owner,
        caller: Option<Owner>,
    },

    /// A record codec returned without releasing the lock.
    #[error("lock still held by {holder} after codec returned")]
    Leaked { holder: Owner },
}

/// Custom error types for the dumpstream library.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O errors from the byte source.
    #[error("I/O error: {source} ({at})")]
    Io {
        #[source]
        source: std::io::Error,
        at: Position,
    },

    /// A raw byte could not be decoded under the configured encoding.
    #[error("cannot decode byte 0x{byte:02x} as {encoding} ({at})")]
    Decode {
        byte: u8,
        encoding: TextEncoding,
        at: Position,
    },

    /// The stream ended in the middle of a record.
    #[error("premature end ({at})")]
    PrematureEnd { at: Position },

    /// A line or exact-length read found no bytes left.
    #[error("end of stream ({at})")]
    EndOfStream { at: Position },

    /// Reentrancy lock misuse. Always a bug in the calling code.
    #[error("protocol violation: {violation} ({at})")]
    ProtocolViolation {
        violation: LockViolation,
        at: Position,
    },

    /// A record codec found malformed record content.
    #[error("invalid record: {message} ({at})")]
    InvalidRecord { message: String, at: Position },

    /// A text encoding name that is not supported.
    #[error("unknown text encoding: {0}")]
    UnknownEncoding(String),
}

impl Error {
    /// Create a new `InvalidRecord` error at the given position.
    pub fn invalid_record(message: impl Into<String>, at: Position) -> Self {
        Self::InvalidRecord {
            message: message.into(),
            at,
        }
    }

    /// The diagnostic snapshot carried by read-side errors.
    pub fn position(&self) -> Option<&Position> {
        match self {
            Self::Io { at, .. }
            | Self::Decode { at, .. }
            | Self::PrematureEnd { at }
            | Self::EndOfStream { at }
            | Self::ProtocolViolation { at, .. }
            | Self::InvalidRecord { at, .. } => Some(at),
            Self::UnknownEncoding(_) => None,
        }
    }

    pub fn offset(&self) -> Option<u64> {
        self.position().map(|p| p.offset)
    }

    pub fn last_line(&self) -> Option<&str> {
        self.position().map(|p| p.last_line.as_str())
    }

    /// True for reentrancy-lock misuse, which indicates a programming error
    /// rather than malformed input.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }
}

/// Result type alias for the library operations.
pub type Result<T> = std::result::Result<T, Error>;
