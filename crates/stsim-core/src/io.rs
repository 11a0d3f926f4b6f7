// crates/stsim-core/src/io.rs

//! Serialization helpers for trace envelopes and profile files.
//!
//! JSON and CBOR read/write with extension-based auto-detection. Unknown or
//! missing extensions are rejected for reads and default to JSON for writes.
//! `.jsonl` is handled by [`crate::io_jsonl`] and accepted here for profile
//! vectors (one record per line).

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{Error, Result};
use crate::trace::TraceFile;

/// Ensure the parent directory for a file exists (no-op if none).
///
/// # Errors
/// Propagates the underlying filesystem error as [`Error::TraceDecode`]'s
/// write-side sibling text.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| {
                Error::Configuration(format!("creating parent directory {}: {e}", dir.display()))
            })?;
        }
    }
    Ok(())
}

/// Return the lowercase extension (without dot) if present.
fn ext_lower(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

fn read_json<T: DeserializeOwned>(path: &Path, what: fn(String) -> Error) -> Result<T> {
    let f = File::open(path).map_err(|e| what(format!("open {}: {e}", path.display())))?;
    let rdr = BufReader::new(f);
    serde_json::from_reader(rdr).map_err(|e| what(format!("{}: {e}", path.display())))
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: fn(String) -> Error) -> Result<()> {
    ensure_parent_dir(path)?;
    let f = File::create(path).map_err(|e| what(format!("create {}: {e}", path.display())))?;
    let w = BufWriter::new(f);
    serde_json::to_writer_pretty(w, value).map_err(|e| what(format!("{}: {e}", path.display())))
}

fn read_cbor<T: DeserializeOwned>(path: &Path, what: fn(String) -> Error) -> Result<T> {
    let f = File::open(path).map_err(|e| what(format!("open {}: {e}", path.display())))?;
    let mut rdr = BufReader::new(f);
    ciborium::de::from_reader(&mut rdr).map_err(|e| what(format!("{}: {e}", path.display())))
}

fn write_cbor<T: Serialize>(path: &Path, value: &T, what: fn(String) -> Error) -> Result<()> {
    ensure_parent_dir(path)?;
    let f = File::create(path).map_err(|e| what(format!("create {}: {e}", path.display())))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(value, &mut w).map_err(|e| what(format!("{}: {e}", path.display())))
}

/// Read a [`TraceFile`] by extension (`.json`, `.cbor`, `.jsonl`).
///
/// # Errors
/// [`Error::TraceDecode`] on I/O or deserialization failure, or on an
/// unsupported extension.
pub fn read_trace_auto<P: AsRef<Path>>(path: P) -> Result<TraceFile> {
    let path = path.as_ref();
    match ext_lower(path).as_deref() {
        Some("json") => read_json(path, Error::TraceDecode),
        Some("cbor") => read_cbor(path, Error::TraceDecode),
        Some("jsonl") | Some("ndjson") => crate::io_jsonl::read_trace_jsonl(path),
        Some(other) => Err(Error::TraceDecode(format!(
            "unsupported trace extension: {other} (supported: .json, .cbor, .jsonl)"
        ))),
        None => Err(Error::TraceDecode(
            "trace path has no extension (expected .json, .cbor, or .jsonl)".to_owned(),
        )),
    }
}

/// Write a [`TraceFile`] by extension (defaults to JSON if unknown).
///
/// # Errors
/// [`Error::TraceDecode`] on I/O or serialization failure.
pub fn write_trace_auto<P: AsRef<Path>>(path: P, trace: &TraceFile) -> Result<()> {
    let path = path.as_ref();
    match ext_lower(path).as_deref() {
        Some("cbor") => write_cbor(path, trace, Error::TraceDecode),
        Some("jsonl") | Some("ndjson") => crate::io_jsonl::write_trace_jsonl(path, trace),
        _ => write_json(path, trace, Error::TraceDecode),
    }
}

/// Read a profile file: a vector of records, one per execution phase.
///
/// # Errors
/// [`Error::ProfileDecode`] on I/O or deserialization failure, or on an
/// unsupported extension.
pub fn read_profiles_auto<T, P>(path: P) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    match ext_lower(path).as_deref() {
        Some("json") => read_json(path, Error::ProfileDecode),
        Some("cbor") => read_cbor(path, Error::ProfileDecode),
        Some("jsonl") | Some("ndjson") => crate::io_jsonl::read_records_jsonl(path),
        Some(other) => Err(Error::ProfileDecode(format!(
            "unsupported profile extension: {other} (supported: .json, .cbor, .jsonl)"
        ))),
        None => Err(Error::ProfileDecode(
            "profile path has no extension (expected .json, .cbor, or .jsonl)".to_owned(),
        )),
    }
}

/// Write a profile file (defaults to JSON if the extension is unknown).
///
/// # Errors
/// [`Error::ProfileDecode`] on I/O or serialization failure.
pub fn write_profiles_auto<T, P>(path: P, profiles: &[T]) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    match ext_lower(path).as_deref() {
        Some("cbor") => write_cbor(path, &profiles, Error::ProfileDecode),
        Some("jsonl") | Some("ndjson") => crate::io_jsonl::write_records_jsonl(path, profiles),
        _ => write_json(path, &profiles, Error::ProfileDecode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{Packet, TraceHeader, TRACE_VERSION};

    fn sample_trace() -> TraceFile {
        TraceFile {
            version: TRACE_VERSION,
            header: TraceHeader::default(),
            packets: (0..4)
                .map(|i| Packet {
                    tick: i,
                    command: if i % 2 == 0 { 1 } else { 4 },
                    address: i * 64,
                    size: 64,
                    flags: 0,
                    packet_id: 0,
                    pc: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn trace_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");
        let trace = sample_trace();
        write_trace_auto(&path, &trace).unwrap();
        let got = read_trace_auto(&path).unwrap();
        assert_eq!(got, trace);
    }

    #[test]
    fn trace_cbor_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.cbor");
        let trace = sample_trace();
        write_trace_auto(&path, &trace).unwrap();
        let got = read_trace_auto(&path).unwrap();
        assert_eq!(got, trace);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(read_trace_auto("trace.txt").is_err());
        assert!(read_profiles_auto::<u32, _>("profiles.txt").is_err());
    }
}
