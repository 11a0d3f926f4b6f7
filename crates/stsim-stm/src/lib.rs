// crates/stsim-stm/src/lib.rs

//! Spatial-Temporal Memory (STM) access modeling.
//!
//! An STM profile pairs a Stack Distance Count (SDC) table, a tagged
//! cache-like structure that captures tight reuse, with a Stride Pattern
//! Count (SPC) table, a history-hash-indexed Markov model over strides.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod hash;
pub mod metadata;
pub mod profile;
pub mod stack_distance;
pub mod stride_pattern;
pub mod synthesis;

pub use metadata::ProfileRecord;
pub use profile::{Parameters, Profile};
pub use stack_distance::SdcTable;
pub use stride_pattern::{HistorySequence, HistoryTable, SpcTable};
pub use synthesis::Synthesizer;
