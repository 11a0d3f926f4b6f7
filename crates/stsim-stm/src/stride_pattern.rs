// crates/stsim-stm/src/stride_pattern.rs

//! The Stride Pattern Count (SPC) table: a Markov model over strides,
//! indexed by a hash of the last `M` strides.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use std::collections::{BTreeMap, VecDeque};

use crate::hash;

/// A fixed-length history of observations, newest first.
///
/// New sequences are zero-filled so the depth never changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistorySequence {
    sequence: VecDeque<i64>,
}

impl HistorySequence {
    /// Create a zero-filled sequence of the given depth.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self { sequence: VecDeque::from(vec![0; depth]) }
    }

    /// Add an observation at the front, dropping the oldest.
    pub fn push(&mut self, observation: i64) {
        self.sequence.push_front(observation);
        self.sequence.pop_back();
    }

    /// The depth of the sequence.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the sequence has zero depth.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Iterate the observations, newest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = i64> + '_ {
        self.sequence.iter().copied()
    }

    /// The stable hash used to index SPC rows.
    #[must_use]
    pub fn index(&self) -> u64 {
        hash::combine(self.iter())
    }

    /// The Hamming distance to another sequence of the same depth.
    #[must_use]
    pub fn hamming_distance(&self, other: &Self) -> usize {
        debug_assert_eq!(self.len(), other.len());
        self.sequence.iter().zip(&other.sequence).filter(|(a, b)| a != b).count()
    }
}

/// One SPC row: a representative stride pattern plus the frequency of each
/// next stride observed under that pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRow {
    /// The pattern stored when the row was created. Hash collisions keep the
    /// first pattern and accumulate counts.
    pub pattern: HistorySequence,
    /// Next-stride frequencies.
    pub counts: BTreeMap<i64, u64>,
}

/// Rows keyed by the pattern hash. A map is used in case indices are sparse.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryTable {
    /// The rows of the table.
    pub rows: BTreeMap<u64, HistoryRow>,
}

impl HistoryTable {
    /// Whether there are no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Count an observation under `index`, creating the row with `pattern`
    /// if it does not exist yet.
    pub fn increment(&mut self, index: u64, observation: i64, pattern: &HistorySequence) {
        let row = self
            .rows
            .entry(index)
            .or_insert_with(|| HistoryRow { pattern: pattern.clone(), counts: BTreeMap::new() });
        *row.counts.entry(observation).or_insert(0) += 1;
    }

    /// Set an observation count under the row for `pattern`, creating the
    /// row if needed. Used when loading serialized profiles.
    pub fn set(&mut self, pattern: HistorySequence, observation: i64, count: u64) {
        let index = pattern.index();
        let row = self
            .rows
            .entry(index)
            .or_insert_with(|| HistoryRow { pattern, counts: BTreeMap::new() });
        row.counts.insert(observation, count);
    }
}

/// Stride Pattern Count table.
#[derive(Clone, Debug)]
pub struct SpcTable {
    /// True until the first address arrives.
    pub first_request: bool,
    /// The first address observed.
    pub start_address: u64,
    /// The most recent address observed.
    pub last_address: u64,
    /// The pattern rows.
    pub patterns: HistoryTable,

    last_strides: HistorySequence,
}

impl SpcTable {
    /// Create a table tracking the last `stride_depth` strides.
    #[must_use]
    pub fn new(stride_depth: usize) -> Self {
        Self {
            first_request: true,
            start_address: 0,
            last_address: 0,
            patterns: HistoryTable::default(),
            last_strides: HistorySequence::new(stride_depth),
        }
    }

    /// The number of strides considered in the stride history.
    #[inline]
    #[must_use]
    pub fn stride_depth(&self) -> usize {
        self.last_strides.len()
    }

    /// Record an accessed address.
    pub fn update(&mut self, address: u64) {
        if self.first_request {
            self.first_request = false;
            self.start_address = address;
            self.last_address = address;
            return;
        }

        let stride = address.wrapping_sub(self.last_address) as i64;
        self.last_address = address;

        // The last M strides index the row; the new stride is counted there,
        // then pushed onto the history.
        let index = self.last_strides.index();
        self.patterns.increment(index, stride, &self.last_strides);
        self.last_strides.push(stride);
    }
}
