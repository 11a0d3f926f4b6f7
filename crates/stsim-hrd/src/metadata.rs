// crates/stsim-hrd/src/metadata.rs

//! Wire records for HRD profiles.
//!
//! A record carries only the distributions; the reuse trackers and state
//! map are rebuilt from scratch when a profile is loaded for synthesis.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

use serde::{Deserialize, Serialize};

use stsim_core::{Distance, Error, Result};

use crate::profile::{OpsModel, Profile, ReuseHistogram};

/// Format/version tag written to HRD profile records, for forward-compat.
pub const PROFILE_VERSION: u16 = 1;

/// One bucket of a reuse-distance histogram.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistogramEntry {
    /// The reuse distance.
    pub distance: Distance,
    /// How often it was observed.
    pub count: u64,
}

/// Serialized HRD profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRecord {
    /// Format/version tag for forward-compat.
    pub version: u16,
    /// Block sizes per layer, ascending.
    pub layers: Vec<u64>,
    /// Total number of requests modelled.
    pub total_requests: u64,
    /// Start of the address range profiled.
    pub min_address: u64,
    /// End of the address range profiled.
    pub max_address: u64,
    /// Read/write counts indexed by `[memory_state][operation]`.
    pub ops_model: OpsModel,
    /// One histogram per layer.
    pub reuse_model: Vec<Vec<HistogramEntry>>,
}

impl ProfileRecord {
    /// Capture a profile into its wire form.
    #[must_use]
    pub fn from_profile(p: &Profile) -> Self {
        Self {
            version: PROFILE_VERSION,
            layers: p.layers.clone(),
            total_requests: p.count(),
            min_address: p.min_address,
            max_address: p.max_address,
            ops_model: p.ops_model,
            reuse_model: p
                .reuse_model
                .iter()
                .map(|hist| {
                    hist.iter()
                        .map(|(&distance, &count)| HistogramEntry { distance, count })
                        .collect()
                })
                .collect(),
        }
    }

    /// Rebuild a profile from its wire form.
    ///
    /// # Errors
    /// [`Error::ProfileSchema`] when the histogram count does not match the
    /// layer count; [`Error::Configuration`] for invalid layers.
    pub fn into_profile(self) -> Result<Profile> {
        if self.layers.len() != self.reuse_model.len() {
            return Err(Error::ProfileSchema(format!(
                "{} layers but {} reuse histograms",
                self.layers.len(),
                self.reuse_model.len()
            )));
        }

        let mut profile = Profile::new(self.layers)?;
        profile.min_address = self.min_address;
        profile.max_address = self.max_address;
        profile.ops_model = self.ops_model;
        profile.time = self.total_requests;
        profile.reuse_model = self
            .reuse_model
            .into_iter()
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|e| (e.distance, e.count))
                    .collect::<ReuseHistogram>()
            })
            .collect();

        Ok(profile)
    }
}
