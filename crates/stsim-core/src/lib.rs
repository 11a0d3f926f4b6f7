// crates/stsim-core/src/lib.rs

//! Canonical types, trace envelope, file I/O, and error kinds shared by the
//! stsim workspace.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod error;
pub mod io;
pub mod io_jsonl;
pub mod trace;
pub mod types;

pub use error::{Error, Result};
pub use trace::{Packet, TraceFile, TraceHeader, DEFAULT_TICK_FREQ, TRACE_VERSION};
pub use types::{AddressRange, Distance, MemoryState, Operation, Request};
