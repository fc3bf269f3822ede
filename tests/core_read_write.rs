use dumpstream::*;
use std::io::Cursor;
use test_harness::DumpFixture;

#[test]
fn table_driven_basic_cycles() {
    // Purpose: Validate write+read cycles over a variety of record counts/payload sizes using
    // both the processor API (process_all_with_stream) and the expert iterator (records()).
    let mut h = DumpFixture::new();
    let cases: &[(&str, Vec<usize>)] = &[
        ("empty", vec![]),
        ("one", vec![8]),
        ("no_payload", vec![0, 0]),
        ("few", vec![4, 0, 32]),
        ("many_small", vec![8; 100]),
    ];

    for (name, sizes) in cases.iter() {
        let records = h.gen_records(sizes);
        {
            let mut w = h.writer();
            for r in &records {
                w.write(r).unwrap();
            }
            w.flush().unwrap();
        }

        // read back fully, payloads included
        {
            let mut r = h.reader(HeaderCodec::new());
            let mut seen = Vec::new();
            r.process_all_with_stream(|record, stream| {
                seen.push(record.to_dump_record(stream)?);
                Ok(())
            })
            .unwrap();
            assert_eq!(seen, records, "case {name}");
            assert_eq!(r.offset(), h.len(), "case {name}");
        }

        // headers only; payloads are skipped by the next advance
        {
            let mut r = h.reader(HeaderCodec::new());
            let mut count = 0usize;
            let mut it = r.records();
            while let Some(record) = it.next().unwrap() {
                assert_eq!(
                    record.headers().get("Node-index"),
                    Some(count.to_string().as_str())
                );
                count += 1;
            }
            assert_eq!(count, records.len(), "case {name}");
        }
    }
}

#[test]
fn records_separated_by_arbitrary_whitespace() {
    // Purpose: Any run of whitespace (or none, when a record ends in a newline) between
    // records is skipped, and each record comes back in order.
    let data = b"\n\n  A: 1\n\n\t\r\nB: 2\nContent-length: 2\n\nxy\x0c \n\nC: 3\n\n   ";
    let mut reader = DumpReader::new(Cursor::new(&data[..]), HeaderCodec::new());
    let mut keys = Vec::new();
    reader
        .process_all(|record| {
            let (key, _) = record.headers().iter().next().unwrap();
            keys.push(key.to_string());
            Ok(())
        })
        .unwrap();
    assert_eq!(keys, ["A", "B", "C"]);
    assert_eq!(reader.offset(), data.len() as u64);
}

#[test]
fn written_lines_read_back_under_lock() {
    // Purpose: Lines written with DumpWriter come back verbatim from readline, with offset
    // equal to the bytes consumed and last_line tracking the most recent line.
    let lines = ["SVN-fs-dump-format-version: 2", "", "UUID: 0b8e8e0c", "  indented"];
    let mut out = Vec::new();
    {
        let mut w = DumpWriter::new(&mut out);
        for line in lines {
            w.write_line(line).unwrap();
        }
    }

    let mut stream = RawStream::new(Cursor::new(out.clone()), TextEncoding::Ascii);
    let owner = Owner::new();
    stream.block(owner).unwrap();
    let mut consumed = 0u64;
    for line in lines {
        assert_eq!(stream.readline(Some(owner)).unwrap(), line);
        consumed += line.len() as u64 + 1;
        assert_eq!(stream.offset(), consumed);
        assert_eq!(stream.last_line(), line);
    }
    assert!(matches!(
        stream.readline(Some(owner)),
        Err(Error::EndOfStream { .. })
    ));
    stream.unblock(owner).unwrap();
    assert_eq!(consumed, out.len() as u64);
}

#[test]
fn latin1_round_trip() {
    // Purpose: A non-default encoding is used consistently on both sides.
    let mut out = Vec::new();
    {
        let mut w = DumpWriter::with_encoding(&mut out, TextEncoding::Latin1);
        w.write(&DumpRecord::new().with_header("Node-path", "trunk/caf\u{e9}"))
            .unwrap();
    }
    assert_eq!(out, b"Node-path: trunk/caf\xe9\n\n");

    let encoding: TextEncoding = "latin-1".parse().unwrap();
    let mut reader = DumpReader::with_encoding(Cursor::new(out), HeaderCodec::new(), encoding);
    let record = reader.next_record().unwrap().unwrap();
    assert_eq!(record.headers().get("Node-path"), Some("trunk/caf\u{e9}"));
    assert_eq!(reader.last_line(), "");
}

#[test]
fn partial_payload_read_then_advance() {
    // Purpose: Reading part of a payload leaves the rest to be discarded on advance.
    let data = b"Content-length: 6\n\nabcdef\nNext: yes\n\n";
    let mut reader = DumpReader::new(Cursor::new(&data[..]), HeaderCodec::new());
    reader.next_record().unwrap();
    {
        let (record, stream) = reader.current_with_stream().unwrap();
        assert_eq!(record.read_content(stream, 4).unwrap(), b"abcd");
        assert_eq!(record.remaining(), 2);
    }
    let next = reader.next_record().unwrap().unwrap();
    assert_eq!(next.headers().get("Next"), Some("yes"));
    assert!(reader.next_record().unwrap().is_none());
}
