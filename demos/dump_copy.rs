//! Copies a dump from stdin to stdout record by record, dropping the nodes
//! whose path starts with a given prefix.
//!
//! Usage: cargo run --example dump_copy -- <path-prefix> < in.dump > out.dump

use dumpstream::{DumpReader, DumpWriter, HeaderCodec};
use std::io::{self, BufWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let prefix = std::env::args()
        .nth(1)
        .ok_or("usage: dump_copy <path-prefix>")?;

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    let mut reader = DumpReader::new(stdin, HeaderCodec::new());
    let mut writer = DumpWriter::new(BufWriter::new(stdout));

    let mut dropped = 0usize;
    reader.process_all_with_stream(|record, stream| {
        let skip = record
            .headers()
            .get("Node-path")
            .is_some_and(|path| path.starts_with(prefix.as_str()));
        if skip {
            // Leave the payload; the next advance discards it.
            dropped += 1;
            return Ok(());
        }
        let owned = record.to_dump_record(stream)?;
        writer
            .write(&owned)
            .map_err(|e| dumpstream::Error::Io {
                source: e,
                at: stream.position(),
            })
    })?;
    writer.flush()?;
    log::info!("dropped {} node records", dropped);
    Ok(())
}
