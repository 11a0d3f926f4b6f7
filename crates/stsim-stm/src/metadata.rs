// crates/stsim-stm/src/metadata.rs

//! Wire records for STM profiles.
//!
//! The SDC's private reuse tracker is not serialized; a loaded profile is
//! only good for synthesis, which never consults it. The read count is
//! derived as `total_requests - write_count`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

use serde::{Deserialize, Serialize};

use stsim_core::{Error, Result};

use crate::profile::{Parameters, Profile};
use crate::stride_pattern::HistorySequence;

/// Format/version tag written to STM profile records, for forward-compat.
pub const PROFILE_VERSION: u16 = 1;

/// One SDC cell on the wire. Invalid cells serialize with their zero tag and
/// count, which restores to the same sampling behavior.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdcCellRecord {
    /// Stored tag.
    pub tag: u64,
    /// Accumulated count.
    pub count: u64,
}

/// One SPC row on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpcRowRecord {
    /// The stored pattern, newest stride first, length = stride depth.
    pub stride_history: Vec<i64>,
    /// Next strides observed under the pattern.
    pub next_strides: Vec<i64>,
    /// Frequency of each next stride, parallel to `next_strides`.
    pub counts: Vec<u64>,
}

/// Serialized STM profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRecord {
    /// Format/version tag for forward-compat.
    pub version: u16,
    /// Number of SDC rows.
    pub sdc_rows: u64,
    /// Number of SDC columns.
    pub sdc_cols: u64,
    /// SPC stride history depth.
    pub stride_depth: u64,
    /// Total number of requests modelled.
    pub total_requests: u64,
    /// Number of SDC tag matches.
    pub sdc_updates: u64,
    /// Number of writes profiled.
    pub write_count: u64,
    /// First address the SPC observed.
    pub spc_start_address: u64,
    /// Start of the address range profiled.
    pub min_address: u64,
    /// End of the address range profiled.
    pub max_address: u64,
    /// SDC cells, row-major.
    pub sdc: Vec<Vec<SdcCellRecord>>,
    /// SPC rows.
    pub spc: Vec<SpcRowRecord>,
}

impl ProfileRecord {
    /// Capture a profile into its wire form.
    #[must_use]
    pub fn from_profile(p: &Profile) -> Self {
        let sdc = p
            .sdc
            .rows()
            .iter()
            .map(|row| {
                row.iter().map(|c| SdcCellRecord { tag: c.tag, count: c.count }).collect()
            })
            .collect();

        let spc = p
            .spc
            .patterns
            .rows
            .values()
            .map(|row| SpcRowRecord {
                stride_history: row.pattern.iter().collect(),
                next_strides: row.counts.keys().copied().collect(),
                counts: row.counts.values().copied().collect(),
            })
            .collect();

        Self {
            version: PROFILE_VERSION,
            sdc_rows: p.sdc.row_count() as u64,
            sdc_cols: p.sdc.column_count() as u64,
            stride_depth: p.spc.stride_depth() as u64,
            total_requests: p.count(),
            sdc_updates: p.sdc_update_count,
            write_count: p.write_count,
            spc_start_address: p.spc.start_address,
            min_address: p.min_address,
            max_address: p.max_address,
            sdc,
            spc,
        }
    }

    /// Rebuild a profile from its wire form.
    ///
    /// # Errors
    /// [`Error::ProfileSchema`] on inconsistent counts or table shapes.
    pub fn into_profile(self) -> Result<Profile> {
        let params = Parameters {
            num_rows: usize::try_from(self.sdc_rows)
                .map_err(|_| Error::ProfileSchema("SDC row count overflows".to_owned()))?,
            num_cols: usize::try_from(self.sdc_cols)
                .map_err(|_| Error::ProfileSchema("SDC column count overflows".to_owned()))?,
            stride_depth: usize::try_from(self.stride_depth)
                .map_err(|_| Error::ProfileSchema("stride depth overflows".to_owned()))?,
        };
        let mut profile = Profile::new(params)?;

        profile.write_count = self.write_count;
        profile.read_count = self.total_requests.checked_sub(self.write_count).ok_or_else(|| {
            Error::ProfileSchema(format!(
                "write count {} exceeds total requests {}",
                self.write_count, self.total_requests
            ))
        })?;
        profile.sdc_update_count = self.sdc_updates;
        profile.min_address = self.min_address;
        profile.max_address = self.max_address;
        profile.spc.first_request = true;
        profile.spc.start_address = self.spc_start_address;
        profile.spc.last_address = self.spc_start_address;

        if self.sdc.len() != params.num_rows {
            return Err(Error::ProfileSchema(format!(
                "expected {} SDC rows, found {}",
                params.num_rows,
                self.sdc.len()
            )));
        }
        for (i, row) in self.sdc.iter().enumerate() {
            if row.len() != params.num_cols {
                return Err(Error::ProfileSchema(format!(
                    "expected {} SDC columns in row {i}, found {}",
                    params.num_cols,
                    row.len()
                )));
            }
            for (j, cell) in row.iter().enumerate() {
                profile.sdc.set_cell(i, j, cell.tag, cell.count);
            }
        }

        for row in self.spc {
            if row.next_strides.len() != row.counts.len() {
                return Err(Error::ProfileSchema(
                    "SPC row strides and counts differ in length".to_owned(),
                ));
            }
            let mut pattern = HistorySequence::new(params.stride_depth);
            for &stride in row.stride_history.iter().rev() {
                pattern.push(stride);
            }
            for (&stride, &count) in row.next_strides.iter().zip(&row.counts) {
                profile.spc.patterns.set(pattern.clone(), stride, count);
            }
        }

        Ok(profile)
    }
}
