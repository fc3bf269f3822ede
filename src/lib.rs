//! # dumpstream
//!
//! Streaming framing for record-oriented dump files.
//!
//! ## Overview
//!
//! A dump file is a sequence of self-delimiting records separated by
//! whitespace. `dumpstream` presents such a file as a lazy, forward-only
//! sequence of records without knowing what a record contains: the record
//! layout is supplied by a `RecordCodec`. Every failure carries the byte
//! offset and the last decoded line, so a malformed dump can be diagnosed.
//!
//! ## Key Features
//!
//! * **Pluggable Records**: `RecordCodec` materializes one record and discards its unread tail
//! * **Reentrancy Lock**: Only one consumer reads raw bytes at a time (`RawStream::block`)
//! * **Diagnostics**: `offset` and `last_line` snapshots on every read-side error
//! * **Lazy Payloads**: `HeaderCodec` reads headers eagerly and leaves payloads in the stream
//!
//! ## Quick Start
//!
//! ```rust
//! use dumpstream::*;
//! use std::io::Cursor;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let mut out = Vec::new();
//!     let mut writer = DumpWriter::new(&mut out);
//!     writer.write(&DumpRecord::new().with_header("SVN-fs-dump-format-version", "2"))?;
//!     writer.write(
//!         &DumpRecord::new()
//!             .with_header("Revision-number", "1")
//!             .with_content(b"PROPS-END\n".to_vec()),
//!     )?;
//!
//!     let mut reader = DumpReader::new(Cursor::new(out), HeaderCodec::new());
//!     let mut records = reader.records();
//!     while let Some(record) = records.next()? {
//!         println!("{} headers, {} payload bytes", record.headers().len(), record.content_length());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! * **`RawStream`**: byte cursor with offset tracking and the reentrancy lock
//! * **`RecordCodec`**: defines how one record is read and released
//! * **`DumpReader`**: drives whitespace skipping and the codec, one record per advance
//! * **`DumpWriter`**: encodes lines and writes raw or self-serializing values

pub mod encoding;
pub mod error;
pub mod framing;
pub mod reader;
pub mod record;
pub mod stream;
pub mod writer;

// Re-export the main public API for user convenience.
pub use encoding::TextEncoding;
pub use error::{Error, LockViolation, Position, Result};
pub use framing::RecordCodec;
pub use reader::{DumpReader, Records};
pub use record::{DumpRecord, HeaderCodec, HeaderRecord, Headers, CONTENT_LENGTH};
pub use stream::{Owner, RawStream};
pub use writer::{DumpSerialize, DumpSink, DumpWriter, Writable};
