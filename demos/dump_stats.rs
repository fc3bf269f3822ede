//! Prints record counts for a dump file.
//!
//! Usage: cargo run --example dump_stats -- <dump-file> [encoding]
//! Set RUST_LOG=debug to see record boundaries.

use dumpstream::{DumpReader, HeaderCodec, TextEncoding};
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: dump_stats <dump-file> [encoding]")?;
    let encoding: TextEncoding = match args.next() {
        Some(name) => name.parse()?,
        None => TextEncoding::default(),
    };

    let file = File::open(&path)?;
    let mut reader = DumpReader::with_encoding(BufReader::new(file), HeaderCodec::new(), encoding);

    let (mut revisions, mut nodes, mut other, mut payload) = (0u64, 0u64, 0u64, 0u64);
    reader.process_all(|record| {
        let headers = record.headers();
        if headers.get("Revision-number").is_some() {
            revisions += 1;
        } else if headers.get("Node-path").is_some() {
            nodes += 1;
        } else {
            other += 1;
        }
        payload += record.content_length();
        Ok(())
    })?;

    println!("{path}: {} bytes", reader.offset());
    println!("  revisions: {revisions}");
    println!("  nodes:     {nodes}");
    println!("  other:     {other}");
    println!("  payload:   {payload} bytes");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
