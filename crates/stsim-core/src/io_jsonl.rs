// crates/stsim-core/src/io_jsonl.rs

//! JSON Lines support: traces store the version tag and header on the first
//! line and one packet per line; profile files store one record per line.
//!
//! JSONL keeps long synthetic traces appendable without rewriting a single
//! JSON document.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::trace::{Packet, TraceFile, TraceHeader};

/// The first line of a JSONL trace: the version tag plus the header fields.
#[derive(Serialize, Deserialize)]
struct Prelude {
    version: u16,
    #[serde(flatten)]
    header: TraceHeader,
}

/// Read a trace stored as JSONL: prelude line, then one packet per line.
pub fn read_trace_jsonl(path: &Path) -> Result<TraceFile> {
    let f = File::open(path)
        .map_err(|e| Error::TraceDecode(format!("open {}: {e}", path.display())))?;
    let rdr = BufReader::new(f);
    let mut lines = rdr.lines().enumerate();

    let prelude: Prelude = match lines.next() {
        Some((_, line)) => {
            let s = line.map_err(|e| Error::TraceDecode(format!("read header line: {e}")))?;
            serde_json::from_str(&s)
                .map_err(|e| Error::TraceDecode(format!("parse header line: {e}")))?
        }
        None => return Err(Error::TraceDecode("empty jsonl trace".to_owned())),
    };

    let mut packets = Vec::new();
    for (i, line) in lines {
        let s = line.map_err(|e| Error::TraceDecode(format!("read line {}: {e}", i + 1)))?;
        if s.is_empty() {
            continue;
        }
        let p: Packet = serde_json::from_str(&s)
            .map_err(|e| Error::TraceDecode(format!("parse jsonl line {}: {e}", i + 1)))?;
        packets.push(p);
    }

    Ok(TraceFile { version: prelude.version, header: prelude.header, packets })
}

/// Write a trace as JSONL: prelude line, then one packet per line.
pub fn write_trace_jsonl(path: &Path, trace: &TraceFile) -> Result<()> {
    crate::io::ensure_parent_dir(path)?;
    let f = File::create(path)
        .map_err(|e| Error::TraceDecode(format!("create {}: {e}", path.display())))?;
    let mut w = BufWriter::new(f);

    let prelude = Prelude { version: trace.version, header: trace.header.clone() };
    let header = serde_json::to_string(&prelude)
        .map_err(|e| Error::TraceDecode(format!("serialize header: {e}")))?;
    writeln!(w, "{header}").map_err(|e| Error::TraceDecode(format!("write header: {e}")))?;

    for p in &trace.packets {
        let line = serde_json::to_string(p)
            .map_err(|e| Error::TraceDecode(format!("serialize packet: {e}")))?;
        writeln!(w, "{line}").map_err(|e| Error::TraceDecode(format!("write packet: {e}")))?;
    }
    w.flush().map_err(|e| Error::TraceDecode(format!("flush: {e}")))?;
    Ok(())
}

/// Read one record per line.
pub fn read_records_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let f = File::open(path)
        .map_err(|e| Error::ProfileDecode(format!("open {}: {e}", path.display())))?;
    let rdr = BufReader::new(f);

    let mut out = Vec::new();
    for (i, line) in rdr.lines().enumerate() {
        let s = line.map_err(|e| Error::ProfileDecode(format!("read line {}: {e}", i + 1)))?;
        if s.is_empty() {
            continue;
        }
        let record: T = serde_json::from_str(&s)
            .map_err(|e| Error::ProfileDecode(format!("parse jsonl line {}: {e}", i + 1)))?;
        out.push(record);
    }
    Ok(out)
}

/// Write one record per line.
pub fn write_records_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    crate::io::ensure_parent_dir(path)?;
    let f = File::create(path)
        .map_err(|e| Error::ProfileDecode(format!("create {}: {e}", path.display())))?;
    let mut w = BufWriter::new(f);
    for r in records {
        let line = serde_json::to_string(r)
            .map_err(|e| Error::ProfileDecode(format!("serialize record: {e}")))?;
        writeln!(w, "{line}").map_err(|e| Error::ProfileDecode(format!("write record: {e}")))?;
    }
    w.flush().map_err(|e| Error::ProfileDecode(format!("flush: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Operation, Request};

    #[test]
    fn trace_jsonl_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let trace = TraceFile::from_requests(
            (0..3).map(|i| Request::new(i, Operation::Read, i * 8, 8)),
        );
        write_trace_jsonl(&path, &trace).unwrap();
        let got = read_trace_jsonl(&path).unwrap();
        assert_eq!(got, trace);
    }

    #[test]
    fn records_jsonl_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let records = vec![1u64, 2, 3];
        write_records_jsonl(&path, &records).unwrap();
        let got: Vec<u64> = read_records_jsonl(&path).unwrap();
        assert_eq!(got, records);
    }
}
