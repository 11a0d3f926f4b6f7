// crates/stsim-core/src/trace.rs

//! Trace envelope: a header the engine propagates but never interprets,
//! followed by packet records.
//!
//! Packets carry the raw wire command code; [`Packet::decode`] maps it to an
//! [`Operation`] and rejects unknown codes.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Operation, Request};

/// Tick frequency written to synthetic traces (one tick per picosecond).
pub const DEFAULT_TICK_FREQ: u64 = 1_000_000_000_000;

/// Format/version tag written to trace envelopes, for forward-compat.
pub const TRACE_VERSION: u16 = 1;

/// Trace header, carried through from input to output verbatim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceHeader {
    /// The frequency of a single tick in the trace.
    pub tick_freq: u64,
    /// The identifier associated with the trace.
    pub obj_id: String,
}

impl Default for TraceHeader {
    fn default() -> Self {
        Self { tick_freq: DEFAULT_TICK_FREQ, obj_id: "stsim".to_owned() }
    }
}

/// A single trace record as stored on disk.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Packet {
    /// The time the request occurred.
    pub tick: u64,
    /// Wire command code: 1 = read, 4 = write.
    pub command: u32,
    /// The byte address.
    pub address: u64,
    /// The number of bytes requested.
    pub size: u32,
    /// Optional flags, carried through.
    #[serde(default)]
    pub flags: u32,
    /// Optional packet identifier, carried through.
    #[serde(default)]
    pub packet_id: u64,
    /// Optional program counter, carried through.
    #[serde(default)]
    pub pc: u64,
}

impl Packet {
    /// Decode this packet into a [`Request`].
    ///
    /// # Errors
    /// [`crate::Error::TraceSchema`] on an unknown command code.
    pub fn decode(&self) -> Result<Request> {
        let op = Operation::from_command(self.command)?;
        Ok(Request::new(self.tick, op, self.address, self.size))
    }
}

impl From<Request> for Packet {
    fn from(r: Request) -> Self {
        Self {
            tick: r.tick,
            command: r.op.command(),
            address: r.address,
            size: r.size,
            flags: 0,
            packet_id: 0,
            pc: 0,
        }
    }
}

/// Trace envelope.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceFile {
    /// Format/version tag for forward-compat.
    pub version: u16,
    /// Header propagated from the recorded trace.
    pub header: TraceHeader,
    /// Packet sequence with non-decreasing ticks.
    pub packets: Vec<Packet>,
}

impl TraceFile {
    /// Build a synthetic trace envelope from requests, with the default header.
    #[must_use]
    pub fn from_requests(requests: impl IntoIterator<Item = Request>) -> Self {
        Self {
            version: TRACE_VERSION,
            header: TraceHeader::default(),
            packets: requests.into_iter().map(Packet::from).collect(),
        }
    }

    /// Decode every packet into a request.
    ///
    /// # Errors
    /// Fails on the first unknown command code; the engine refuses to proceed.
    pub fn decode_requests(&self) -> Result<Vec<Request>> {
        self.packets.iter().map(Packet::decode).collect()
    }

    /// Number of packets.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Whether the trace is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_decode_rejects_unknown_command() {
        let p = Packet { tick: 0, command: 7, address: 0, size: 4, flags: 0, packet_id: 0, pc: 0 };
        assert!(p.decode().is_err());
    }

    #[test]
    fn request_packet_roundtrip() {
        let r = Request::new(12, Operation::Write, 0x40, 64);
        let p = Packet::from(r);
        assert_eq!(p.command, 4);
        assert_eq!(p.decode().unwrap(), r);
    }
}
