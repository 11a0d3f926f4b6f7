// crates/stsim-stm/src/profile.rs

//! The STM profile builder.

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

use stsim_core::{Operation, Result};

use crate::stack_distance::SdcTable;
use crate::stride_pattern::SpcTable;

/// Parameters that configure the stack distance and stride pattern tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parameters {
    /// Number of rows in the stack distance profile. Must be a power of two.
    pub num_rows: usize,
    /// Number of stack-distance columns, starting from distance 0.
    pub num_cols: usize,
    /// Depth of history to capture for stride patterns.
    pub stride_depth: usize,
}

impl Default for Parameters {
    /// The defaults used in the STM paper.
    fn default() -> Self {
        Self { num_rows: 128, num_cols: 2, stride_depth: 80 }
    }
}

/// Spatial-Temporal Memory access model.
#[derive(Clone, Debug)]
pub struct Profile {
    /// The stack distance profile.
    pub sdc: SdcTable,
    /// The stride pattern profile.
    pub spc: SpcTable,

    /// The number of times the SDC table matched.
    pub sdc_update_count: u64,
    /// The number of reads profiled.
    pub read_count: u64,
    /// The number of writes profiled.
    pub write_count: u64,

    /// The start of the address range profiled.
    pub min_address: u64,
    /// The end of the address range profiled.
    pub max_address: u64,
}

impl Profile {
    /// Create a profile with the given table parameters.
    ///
    /// # Errors
    /// [`stsim_core::Error::Configuration`] for invalid table shapes.
    pub fn new(params: Parameters) -> Result<Self> {
        Ok(Self {
            sdc: SdcTable::new(params.num_rows, params.num_cols)?,
            spc: SpcTable::new(params.stride_depth),
            sdc_update_count: 0,
            read_count: 0,
            write_count: 0,
            min_address: u64::MAX,
            max_address: 0,
        })
    }

    /// The table parameters this profile was built with.
    #[must_use]
    pub fn parameters(&self) -> Parameters {
        Parameters {
            num_rows: self.sdc.row_count(),
            num_cols: self.sdc.column_count(),
            stride_depth: self.spc.stride_depth(),
        }
    }

    /// Update the tables for one request.
    pub fn update(&mut self, address: u64, op: Operation) {
        self.min_address = self.min_address.min(address);
        self.max_address = self.max_address.max(address);

        let tag_match = self.sdc.update(address);
        if tag_match {
            self.sdc_update_count += 1;
        } else {
            self.spc.update(address);
        }

        match op {
            Operation::Read => self.read_count += 1,
            Operation::Write => self.write_count += 1,
        }
    }

    /// The total number of requests modelled.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.read_count + self.write_count
    }
}
