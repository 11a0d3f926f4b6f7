// crates/stsim-mocktails/src/lib.rs

//! Mocktails: recursive partitioning of a request stream into temporal or
//! spatial sub-streams, a model per leaf partition, and a time-ordered merge
//! at synthesis.
//!
//! Leaves carry one of three underlying models: a simple sequence-based
//! model, an STM profile, or an HRD profile. The common wrapper models
//! request sizes and inter-arrival deltas as Markov chains.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod builder;
pub mod config;
pub mod hierarchy;
pub mod metadata;
pub mod model;
pub mod partition;
pub mod profile;
pub mod sequence;
pub mod synthesis;

pub use builder::generate_profile;
pub use hierarchy::{Hierarchy, HierarchyConfig};
pub use metadata::ProfileRecord;
pub use model::{Leaf, Model, SimpleModel};
pub use partition::{Partition, Scheme, Separator, SplitConfig};
pub use profile::{ModelType, Profile};
pub use sequence::{SequenceBuilder, SequenceModel, SequenceValue};
pub use synthesis::Synthesizer;
