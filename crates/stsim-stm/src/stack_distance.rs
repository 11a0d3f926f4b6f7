// crates/stsim-stm/src/stack_distance.rs

//! The Stack Distance Count (SDC) table.

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

use serde::{Deserialize, Serialize};

use stsim_core::{Distance, Error, Result};
use stsim_reuse::{compute_distance, update, OlkenTree};

/// One cell of the SDC table.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdcCell {
    /// The tag of the most recent address counted here.
    pub tag: u64,
    /// All tags start off invalid.
    pub valid: bool,
    /// How often this (row, stack distance) cell was hit.
    pub count: u64,
}

/// Tagged table of `R` rows by `C` stack-distance columns.
///
/// `R` must be a power of two: the low bits of an address select the row and
/// the high bits form the tag. A private Olken tree is maintained only to
/// compute the stack distance that selects the column.
#[derive(Clone, Debug)]
pub struct SdcTable {
    rows: Vec<Vec<SdcCell>>,
    tree: OlkenTree,
    time: u64,
}

impl SdcTable {
    /// Create a table of `num_rows` by `num_cols` invalid cells.
    ///
    /// # Errors
    /// [`Error::Configuration`] unless `num_rows` is a power of two and
    /// `num_cols` is positive.
    pub fn new(num_rows: usize, num_cols: usize) -> Result<Self> {
        if !num_rows.is_power_of_two() {
            return Err(Error::Configuration(format!(
                "SDC row count must be a power of two, got {num_rows}"
            )));
        }
        if num_cols == 0 {
            return Err(Error::Configuration("SDC needs at least one column".to_owned()));
        }
        Ok(Self {
            rows: vec![vec![SdcCell::default(); num_cols]; num_rows],
            tree: OlkenTree::new(),
            time: 0,
        })
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of stack-distance columns.
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// All the rows in the table.
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Vec<SdcCell>] {
        &self.rows
    }

    /// Mutable access for the synthesizer's convergence decrements.
    #[inline]
    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<SdcCell>] {
        &mut self.rows
    }

    pub(crate) fn set_cell(&mut self, row: usize, col: usize, tag: u64, count: u64) {
        let cell = &mut self.rows[row][col];
        cell.tag = tag;
        cell.count = count;
        cell.valid = true;
    }

    /// Update the table for an accessed address and report a tag match.
    ///
    /// On a match (or a fill of an invalid cell) the count is incremented.
    /// On a mismatch the newer tag replaces the stored one and the count is
    /// deliberately preserved, so the column keeps the eviction history.
    pub fn update(&mut self, address: u64) -> bool {
        if self.rows.is_empty() {
            return false;
        }

        let row_count = self.rows.len() as u64;
        let tag = address / row_count;
        let row = (address % row_count) as usize;

        let stack_distance = compute_distance(&self.tree, address);
        update(&mut self.tree, address, self.time);
        self.time += 1;

        let max_col = self.column_count() - 1;
        let col = match stack_distance {
            Distance::Finite(d) => usize::try_from(d).map_or(max_col, |d| d.min(max_col)),
            Distance::Infinite => max_col,
        };

        let cell = &mut self.rows[row][col];
        if !cell.valid {
            // First time counting in this cell.
            cell.valid = true;
            cell.tag = tag;
            cell.count += 1;
            true
        } else if cell.tag == tag {
            cell.count += 1;
            true
        } else {
            // Tag miss: keep the most recently used tag.
            cell.tag = tag;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_must_be_a_power_of_two() {
        assert!(SdcTable::new(3, 2).is_err());
        assert!(SdcTable::new(4, 0).is_err());
        assert!(SdcTable::new(4, 2).is_ok());
    }

    #[test]
    fn fills_hits_and_evictions() {
        let mut t = SdcTable::new(4, 2).unwrap();

        // Cold miss lands in the last column; the fill counts as a match.
        assert!(t.update(0));
        assert_eq!(t.rows()[0][1], SdcCell { tag: 0, valid: true, count: 1 });

        // Immediate reuse has stack distance 0 and fills column 0.
        assert!(t.update(0));
        assert_eq!(t.rows()[0][0], SdcCell { tag: 0, valid: true, count: 1 });

        // Another immediate reuse hits the same cell.
        assert!(t.update(0));
        assert_eq!(t.rows()[0][0].count, 2);

        // Address 8 shares row 0 but carries tag 2; its cold miss evicts the
        // tag in column 1 while the prior count is preserved.
        assert!(!t.update(8));
        assert_eq!(t.rows()[0][1], SdcCell { tag: 2, valid: true, count: 1 });
    }

    #[test]
    fn distinct_rows_do_not_interfere() {
        let mut t = SdcTable::new(4, 2).unwrap();
        assert!(t.update(1));
        assert!(t.update(2));
        assert_eq!(t.rows()[1][1].count, 1);
        assert_eq!(t.rows()[2][1].count, 1);
    }
}
