// crates/stsim-mocktails/src/sequence.rs

//! Sequence models: a Markov transition matrix with a constant-sequence
//! shortcut, parameterized over any ordered value type.

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

use std::collections::{BTreeMap, BTreeSet};

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution as _;
use rand::rngs::StdRng;

use stsim_core::{Error, Operation, Result};

/// A value a sequence model can range over, with an `i64` wire encoding for
/// serialization.
pub trait SequenceValue: Copy + Ord {
    /// The value an empty sequence model emits.
    const ZERO: Self;

    /// Encode for the wire.
    fn to_wire(self) -> i64;

    /// Decode from the wire.
    fn from_wire(value: i64) -> Self;
}

impl SequenceValue for u64 {
    const ZERO: Self = 0;

    fn to_wire(self) -> i64 {
        self as i64
    }

    fn from_wire(value: i64) -> Self {
        value as Self
    }
}

impl SequenceValue for u32 {
    const ZERO: Self = 0;

    fn to_wire(self) -> i64 {
        i64::from(self)
    }

    fn from_wire(value: i64) -> Self {
        value as Self
    }
}

impl SequenceValue for i64 {
    const ZERO: Self = 0;

    fn to_wire(self) -> i64 {
        self
    }

    fn from_wire(value: i64) -> Self {
        value
    }
}

impl SequenceValue for Operation {
    const ZERO: Self = Self::Read;

    fn to_wire(self) -> i64 {
        match self {
            Self::Read => 0,
            Self::Write => 1,
        }
    }

    fn from_wire(value: i64) -> Self {
        if value == 0 {
            Self::Read
        } else {
            Self::Write
        }
    }
}

/// A sequence is modelled either as a constant value (empty transition
/// matrix) or as a Markov chain of observed transition frequencies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceModel<T: SequenceValue> {
    /// The first value of the source sequence.
    pub initial_state: T,
    /// The state the next draw transitions from.
    pub current_state: T,
    /// `transitions[s][t]` counts observed `s -> t` transitions.
    pub transitions: BTreeMap<T, BTreeMap<T, u64>>,
}

impl<T: SequenceValue> SequenceModel<T> {
    /// A constant model that always emits `value`.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self { initial_state: value, current_state: value, transitions: BTreeMap::new() }
    }

    /// Draw the next value.
    ///
    /// A constant model returns its initial state. Otherwise the draw is
    /// weighted by the counts out of the current state (re-seeded from row
    /// sums when the current state has no row), the drawn count converges
    /// toward zero, and exhausted transitions and rows are erased.
    ///
    /// # Errors
    /// [`Error::Invariant`] when drawn from an exhausted matrix.
    pub fn draw(&mut self, rng: &mut StdRng) -> Result<T> {
        if self.transitions.is_empty() {
            return Ok(self.initial_state);
        }

        if !self.transitions.contains_key(&self.current_state) {
            // The current state left the Markov chain; pick a replacement
            // weighted by each row's remaining mass.
            let states: Vec<T> = self.transitions.keys().copied().collect();
            let sums: Vec<u64> =
                self.transitions.values().map(|row| row.values().sum()).collect();
            let index = WeightedIndex::new(&sums)
                .map_err(|_| Error::Invariant("sequence model rows are exhausted".to_owned()))?
                .sample(rng);
            self.current_state = states[index];
        }

        let row = self
            .transitions
            .get_mut(&self.current_state)
            .ok_or_else(|| Error::Invariant("sequence model lost its current row".to_owned()))?;

        let states: Vec<T> = row.keys().copied().collect();
        let counts: Vec<u64> = row.values().copied().collect();
        let index = WeightedIndex::new(&counts)
            .map_err(|_| Error::Invariant("sequence model row is exhausted".to_owned()))?
            .sample(rng);
        let next = states[index];

        if let Some(count) = row.get_mut(&next) {
            *count -= 1;
            if *count == 0 {
                row.remove(&next);
            }
        }
        if row.is_empty() {
            self.transitions.remove(&self.current_state);
        }

        self.current_state = next;
        Ok(next)
    }
}

/// Accumulates a sequence of observations and builds a [`SequenceModel`].
#[derive(Clone, Debug)]
pub struct SequenceBuilder<T: SequenceValue> {
    trace: Vec<T>,
    distinct: BTreeSet<T>,
}

impl<T: SequenceValue> Default for SequenceBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SequenceValue> SequenceBuilder<T> {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { trace: Vec::new(), distinct: BTreeSet::new() }
    }

    /// Record the next observation.
    pub fn add(&mut self, value: T) {
        self.trace.push(value);
        self.distinct.insert(value);
    }

    /// Whether every observation so far had the same value.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.distinct.len() == 1
    }

    /// Build the model: constant sequences get an empty transition matrix.
    #[must_use]
    pub fn build(self) -> SequenceModel<T> {
        let Some(&first) = self.trace.first() else {
            return SequenceModel::constant(T::ZERO);
        };

        let mut model = SequenceModel::constant(first);
        if !self.is_constant() {
            for pair in self.trace.windows(2) {
                *model
                    .transitions
                    .entry(pair[0])
                    .or_default()
                    .entry(pair[1])
                    .or_insert(0) += 1;
            }
        }
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng as _;

    fn model_of<T: SequenceValue>(values: &[T]) -> SequenceModel<T> {
        let mut b = SequenceBuilder::new();
        for &v in values {
            b.add(v);
        }
        b.build()
    }

    #[test]
    fn constant_sequence_has_no_transitions() {
        let mut m = model_of(&[7u64, 7, 7]);
        assert_eq!(m.initial_state, 7);
        assert!(m.transitions.is_empty());

        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10 {
            assert_eq!(m.draw(&mut rng).unwrap(), 7);
        }
    }

    #[test]
    fn alternating_sequence_counts_transitions() {
        let (a, b) = (1u64, 2u64);
        let m = model_of(&[a, b, a, b, a]);
        assert_eq!(m.transitions[&a][&b], 2);
        assert_eq!(m.transitions[&b][&a], 2);
    }

    #[test]
    fn draws_converge_and_erase_rows() {
        let (a, b) = (1u64, 2u64);
        let mut m = model_of(&[a, b, a, b, a]);
        let mut rng = StdRng::seed_from_u64(0);

        // From a the only transition is to b, and vice versa; four draws
        // exhaust the matrix, erasing the row for a first.
        assert_eq!(m.draw(&mut rng).unwrap(), b);
        assert_eq!(m.draw(&mut rng).unwrap(), a);
        assert_eq!(m.draw(&mut rng).unwrap(), b);
        assert!(!m.transitions.contains_key(&a));
        assert!(m.transitions.contains_key(&b));
        assert_eq!(m.draw(&mut rng).unwrap(), a);
        assert!(m.transitions.is_empty());

        // Exhausted matrix degenerates to the constant behavior.
        assert_eq!(m.draw(&mut rng).unwrap(), a);
    }

    #[test]
    fn missing_current_state_reseeds_from_row_sums() {
        let mut m = model_of(&[5u64, 6, 5, 6]);
        // Force a current state outside the chain.
        m.current_state = 99;
        let mut rng = StdRng::seed_from_u64(1);
        let next = m.draw(&mut rng).unwrap();
        assert!(next == 5 || next == 6);
    }

    #[test]
    fn operations_encode_on_the_wire() {
        assert_eq!(Operation::Read.to_wire(), 0);
        assert_eq!(Operation::Write.to_wire(), 1);
        assert_eq!(Operation::from_wire(0), Operation::Read);
        assert_eq!(Operation::from_wire(1), Operation::Write);
    }

    #[test]
    fn empty_builder_yields_zero_constant() {
        let mut m = model_of::<u64>(&[]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(m.draw(&mut rng).unwrap(), 0);
    }
}
