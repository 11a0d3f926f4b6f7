// crates/stsim-core/src/types.rs

//! Canonical core types used across the stsim workspace.
//!
//! These live in `stsim-core` and are re-exported at the crate root so other
//! crates can import via `stsim_core::Request`, `stsim_core::Distance`, etc.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A memory request: the unit both the profile builders consume and the
/// synthesizers produce.
///
/// `tick` is monotonically non-decreasing within any stream handed to a
/// profile builder.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    /// The time the request occurred.
    pub tick: u64,
    /// Read or write.
    pub op: Operation,
    /// The byte address.
    pub address: u64,
    /// The number of bytes requested.
    pub size: u32,
}

impl Request {
    /// Construct a request.
    #[inline]
    #[must_use]
    pub const fn new(tick: u64, op: Operation, address: u64, size: u32) -> Self {
        Self { tick, op, address, size }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.tick, self.op, self.address, self.size)
    }
}

/// The type of a memory request.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// A load.
    Read,
    /// A store.
    Write,
}

/// Number of operations supported.
pub const OPERATION_COUNT: usize = 2;

impl Operation {
    /// Decode a wire command code (1 = read, 4 = write).
    ///
    /// # Errors
    /// Any other code is [`Error::TraceSchema`] and fatal to the caller.
    pub fn from_command(command: u32) -> Result<Self> {
        match command {
            1 => Ok(Self::Read),
            4 => Ok(Self::Write),
            other => Err(Error::TraceSchema(other)),
        }
    }

    /// The wire command code for this operation.
    #[inline]
    #[must_use]
    pub const fn command(self) -> u32 {
        match self {
            Self::Read => 1,
            Self::Write => 4,
        }
    }

    /// Index into `[read, write]`-shaped count tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Read => 0,
            Self::Write => 1,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "R"),
            Self::Write => write!(f, "W"),
        }
    }
}

/// Per-address memory state tracked by the HRD operation model.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MemoryState {
    /// The location has never been touched.
    #[default]
    Invalid,
    /// The location has been read, but never written to.
    Clean,
    /// The location has been written to.
    Dirty,
}

/// Number of memory states supported.
pub const MEMORY_STATE_COUNT: usize = 3;

impl MemoryState {
    /// Index into `[invalid, clean, dirty]`-shaped count tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Invalid => 0,
            Self::Clean => 1,
            Self::Dirty => 2,
        }
    }

    /// Advance the state for one operation: `invalid + read -> clean`, any
    /// state `+ write -> dirty`, otherwise unchanged.
    #[inline]
    pub fn apply(&mut self, op: Operation) {
        if *self == Self::Invalid && op == Operation::Read {
            *self = Self::Clean;
        } else if op == Operation::Write {
            *self = Self::Dirty;
        }
    }
}

/// A reuse (stack) distance: the number of unique references between two
/// references to the same object, or `Infinite` on first-ever touch.
///
/// The derived ordering places every finite distance below `Infinite`, so
/// histograms keyed by `Distance` iterate finite buckets in ascending order
/// with the cold-miss bucket last.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// An observed stack distance.
    Finite(u64),
    /// First-ever touch (cold miss).
    Infinite,
}

impl Distance {
    /// Whether this is a finite distance.
    #[inline]
    #[must_use]
    pub const fn is_finite(self) -> bool {
        matches!(self, Self::Finite(_))
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(d) => write!(f, "{d}"),
            Self::Infinite => write!(f, "inf"),
        }
    }
}

/// A range of byte addresses with the number of requests it covers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressRange {
    /// The start of the address range.
    pub start: u64,
    /// The end of the address range.
    pub end: u64,
    /// Number of requests that belong to this address range.
    pub count: u64,
}

impl Default for AddressRange {
    fn default() -> Self {
        Self { start: u64::MAX, end: u64::MIN, count: 0 }
    }
}

impl AddressRange {
    /// Check if the address is within this range (inclusive at both ends).
    #[inline]
    #[must_use]
    pub const fn contains(&self, address: u64) -> bool {
        address >= self.start && address <= self.end
    }

    /// Check if another address range intersects with this one.
    #[inline]
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Expand this address range to encompass another.
    #[inline]
    pub fn expand(&mut self, other: &Self) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }
}
