// crates/stsim-hrd/src/lib.rs

//! Hierarchical Reuse Distance (HRD) modeling.
//!
//! An HRD profile keeps one reuse-distance histogram per block-size layer
//! plus a Markov read/write model over per-address memory states. The
//! synthesizer inverts the profile: it samples reuse distances, walks the
//! per-layer access history to pick blocks, and draws fresh unique addresses
//! when every layer misses.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod metadata;
pub mod profile;
pub mod synthesis;

pub use metadata::ProfileRecord;
pub use profile::{OpsModel, Profile, ReuseHistogram};
pub use synthesis::Synthesizer;
