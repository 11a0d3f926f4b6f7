// crates/stsim-stm/src/synthesis.rs

//! The STM synthesizer: draws addresses from the SDC and SPC tables with
//! decrement-on-draw convergence so the output distribution terminates with
//! the same marginal counts the profile was built from.

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

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution as _;
use rand::rngs::StdRng;
use rand::SeedableRng as _;

use stsim_core::{Error, Operation, Result};

use crate::profile::Profile;
use crate::stack_distance::SdcTable;
use crate::stride_pattern::{HistorySequence, HistoryTable};

/// Saturating decrement used for every convergence counter.
pub(crate) fn converge(value: &mut u64) {
    *value = value.saturating_sub(1);
}

/// Fold an address back into `[min, max)` when it escaped the range.
pub(crate) fn keep_in_range(address: u64, min: u64, max: u64) -> u64 {
    if address > max || address < min {
        let size = max - min;
        if size == 0 {
            return min;
        }
        return address.wrapping_sub(size) % size + min;
    }
    address
}

fn generate_operation(rng: &mut StdRng, reads: &mut u64, writes: &mut u64) -> Operation {
    let index = WeightedIndex::new([*reads, *writes])
        .map_or(0, |dist| dist.sample(rng));

    if index == 0 {
        converge(reads);
        Operation::Read
    } else {
        converge(writes);
        Operation::Write
    }
}

fn generate_sdc_address(rng: &mut StdRng, table: &mut SdcTable) -> Result<u64> {
    // Select a row weighted by its total count.
    let row_counts: Vec<u64> =
        table.rows().iter().map(|row| row.iter().map(|c| c.count).sum()).collect();
    let row_index = WeightedIndex::new(&row_counts)
        .map_err(|_| Error::Invariant("SDC table has no remaining counts".to_owned()))?
        .sample(rng);

    // Select a column within the row.
    let col_counts: Vec<u64> = table.rows()[row_index].iter().map(|c| c.count).collect();
    let col_index = WeightedIndex::new(&col_counts)
        .map_err(|_| Error::Invariant("SDC row has no remaining counts".to_owned()))?
        .sample(rng);

    let row_count = table.row_count() as u64;
    let cell = &mut table.rows_mut()[row_index][col_index];
    let address = cell.tag * row_count + row_index as u64;
    converge(&mut cell.count);

    Ok(address)
}

fn generate_spc_stride(
    rng: &mut StdRng,
    table: &mut HistoryTable,
    history: &mut HistorySequence,
) -> Result<i64> {
    let index = history.index();

    let key = if table.rows.contains_key(&index) {
        index
    } else {
        // No row for this history: fall back to the stored pattern with the
        // minimum Hamming distance and adopt it as the new history.
        let (&key, row) = table
            .rows
            .iter()
            .min_by_key(|(_, row)| history.hamming_distance(&row.pattern))
            .ok_or_else(|| Error::Invariant("SPC table is empty".to_owned()))?;
        *history = row.pattern.clone();
        key
    };

    let row = table
        .rows
        .get_mut(&key)
        .ok_or_else(|| Error::Invariant("SPC row disappeared".to_owned()))?;

    let stride = if row.counts.len() == 1 {
        row.counts.keys().next().copied()
            .ok_or_else(|| Error::Invariant("SPC row is empty".to_owned()))?
    } else {
        let strides: Vec<i64> = row.counts.keys().copied().collect();
        let counts: Vec<u64> = row.counts.values().copied().collect();
        let index = WeightedIndex::new(&counts)
            .map_err(|_| Error::Invariant("SPC row has no remaining counts".to_owned()))?
            .sample(rng);
        strides[index]
    };

    history.push(stride);
    if let Some(count) = row.counts.get_mut(&stride) {
        converge(count);
    }
    if row.counts.values().all(|&c| c == 0) {
        table.rows.remove(&key);
    }

    Ok(stride)
}

fn generate_address(
    rng: &mut StdRng,
    profile: &mut Profile,
    history: &mut HistorySequence,
) -> Result<u64> {
    let sdc_count = profile.sdc_update_count;
    let spc_count = profile.count().saturating_sub(profile.sdc_update_count);

    let index = WeightedIndex::new([sdc_count, spc_count])
        .map_err(|_| Error::Invariant("profile has no remaining requests".to_owned()))?
        .sample(rng);

    if index == 0 {
        converge(&mut profile.sdc_update_count);
        return generate_sdc_address(rng, &mut profile.sdc);
    }

    if profile.spc.first_request {
        profile.spc.first_request = false;
        return Ok(profile.spc.start_address);
    }

    let stride = generate_spc_stride(rng, &mut profile.spc.patterns, history)?;
    let address = profile.spc.last_address.wrapping_add(stride as u64);
    profile.spc.last_address = address;
    Ok(address)
}

/// Generates synthetic requests from an STM [`Profile`].
///
/// Consumes the profile: every draw decrements the sampled counters.
pub struct Synthesizer {
    rng: StdRng,
    profile: Profile,
    history: HistorySequence,
    first_request: bool,
}

impl Synthesizer {
    /// Consume a profile and seed the generator.
    ///
    /// The SPC cursor is rewound to its start address: the first SPC draw
    /// re-emits it, and the remaining draws consume exactly the recorded
    /// stride counts.
    #[must_use]
    pub fn new(mut profile: Profile, seed: u64) -> Self {
        let history = HistorySequence::new(profile.spc.stride_depth());
        profile.spc.first_request = true;
        profile.spc.last_address = profile.spc.start_address;
        Self { rng: StdRng::seed_from_u64(seed), profile, history, first_request: true }
    }

    /// Synthesize the next request.
    ///
    /// # Errors
    /// [`Error::Invariant`] when drawn past the profile's request count.
    pub fn generate_next_request(&mut self) -> Result<(u64, Operation)> {
        let address = if self.first_request && self.profile.sdc.row_count() > 0 {
            self.first_request = false;
            converge(&mut self.profile.sdc_update_count);
            generate_sdc_address(&mut self.rng, &mut self.profile.sdc)?
        } else {
            generate_address(&mut self.rng, &mut self.profile, &mut self.history)?
        };

        let address =
            keep_in_range(address, self.profile.min_address, self.profile.max_address);
        let op = generate_operation(
            &mut self.rng,
            &mut self.profile.read_count,
            &mut self.profile.write_count,
        );

        Ok((address, op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Parameters;

    #[test]
    fn converge_saturates_at_zero() {
        let mut v = 1;
        converge(&mut v);
        assert_eq!(v, 0);
        converge(&mut v);
        assert_eq!(v, 0);
    }

    #[test]
    fn keep_in_range_folds_escaped_addresses() {
        assert_eq!(keep_in_range(50, 0, 100), 50);
        assert!(keep_in_range(250, 100, 200) >= 100);
        assert!(keep_in_range(250, 100, 200) < 200);
        assert_eq!(keep_in_range(7, 3, 3), 3);
    }

    #[test]
    fn spc_stride_falls_back_to_nearest_pattern() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut table = HistoryTable::default();

        let mut pattern = HistorySequence::new(2);
        pattern.push(64);
        table.set(pattern.clone(), 64, 2);

        // A history that hashes to no stored row adopts the closest pattern.
        let mut history = HistorySequence::new(2);
        history.push(64);
        history.push(64);
        assert!(!table.rows.contains_key(&history.index()));

        let stride = generate_spc_stride(&mut rng, &mut table, &mut history).unwrap();
        assert_eq!(stride, 64);
        // The adopted pattern had 64 pushed onto it.
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![64, 64]);
    }

    #[test]
    fn spc_rows_are_removed_once_converged() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut table = HistoryTable::default();
        let pattern = HistorySequence::new(2);
        table.set(pattern.clone(), 8, 1);

        let mut history = HistorySequence::new(2);
        let stride = generate_spc_stride(&mut rng, &mut table, &mut history).unwrap();
        assert_eq!(stride, 8);
        assert!(table.is_empty());
    }

    #[test]
    fn single_address_profile_synthesizes_in_range() {
        let mut p = Profile::new(Parameters { num_rows: 4, num_cols: 2, stride_depth: 2 }).unwrap();
        for _ in 0..100 {
            p.update(64, Operation::Read);
        }

        let count = p.count();
        let mut synth = Synthesizer::new(p, 11);
        for _ in 0..count {
            let (address, op) = synth.generate_next_request().unwrap();
            assert_eq!(address, 64);
            assert_eq!(op, Operation::Read);
        }
    }

    #[test]
    fn fixed_seed_is_bit_reproducible() {
        let build = || {
            let mut p =
                Profile::new(Parameters { num_rows: 8, num_cols: 2, stride_depth: 4 }).unwrap();
            for i in 0..300u64 {
                let op = if i % 3 == 0 { Operation::Write } else { Operation::Read };
                p.update((i * 24) % 512, op);
            }
            p
        };

        let mut a = Synthesizer::new(build(), 77);
        let mut b = Synthesizer::new(build(), 77);
        for _ in 0..300 {
            assert_eq!(a.generate_next_request().unwrap(), b.generate_next_request().unwrap());
        }
    }
}
