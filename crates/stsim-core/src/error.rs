// crates/stsim-core/src/error.rs

//! Workspace error kinds.
//!
//! Library crates return [`Result`]; the CLI wraps these in `anyhow` with
//! path context. `Exhausted` is the only retryable kind: the HRD address
//! generator raises it when every targeted block is already in use and no
//! amount of resampling can make progress.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

/// Errors surfaced by the modeling and synthesis engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input trace could not be decoded.
    #[error("trace decode: {0}")]
    TraceDecode(String),

    /// The input trace carried an unknown operation code.
    #[error("unknown operation code {0} in trace (expected 1 = read, 4 = write)")]
    TraceSchema(u32),

    /// A profile file could not be decoded.
    #[error("profile decode: {0}")]
    ProfileDecode(String),

    /// A profile file decoded but its contents are inconsistent.
    #[error("profile schema: {0}")]
    ProfileSchema(String),

    /// A model or partitioning configuration is invalid.
    #[error("configuration: {0}")]
    Configuration(String),

    /// The HRD generator ran out of fresh blocks.
    #[error("address generator exhausted: {0}")]
    Exhausted(String),

    /// A programming-error condition (empty distribution, missing node).
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;
