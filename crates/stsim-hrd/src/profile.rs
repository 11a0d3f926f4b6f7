// crates/stsim-hrd/src/profile.rs

//! The HRD profile builder.

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

use std::collections::{BTreeMap, HashMap};

use stsim_core::types::{MEMORY_STATE_COUNT, OPERATION_COUNT};
use stsim_core::{Distance, Error, MemoryState, Operation, Result};
use stsim_reuse::{compute_distance, update, OlkenTree};

/// Captures the distribution of reuse distances at one layer.
pub type ReuseHistogram = BTreeMap<Distance, u64>;

/// Read/write counts indexed by `[memory_state][operation]`.
pub type OpsModel = [[u64; OPERATION_COUNT]; MEMORY_STATE_COUNT];

#[inline]
const fn calculate_block(address: u64, block_size: u64) -> u64 {
    address / block_size
}

/// A Hierarchical Reuse Distance model under construction.
#[derive(Clone, Debug)]
pub struct Profile {
    /// The block sizes per layer of the hierarchy, ascending.
    pub layers: Vec<u64>,
    /// The reuse distance distribution per layer of the hierarchy.
    pub reuse_model: Vec<ReuseHistogram>,
    /// The read/write distribution per memory state.
    pub ops_model: OpsModel,
    /// The start of the address range profiled.
    pub min_address: u64,
    /// The end of the address range profiled.
    pub max_address: u64,

    // Logical time counter; doubles as the request count.
    pub(crate) time: u64,
    // One reuse-distance tracker per layer.
    pub(crate) trees: Vec<OlkenTree>,
    // The current state of each unique address.
    pub(crate) states: HashMap<u64, MemoryState>,
}

impl Profile {
    /// Create a profile for the given block sizes.
    ///
    /// The sizes are sorted ascending and deduplicated.
    ///
    /// # Errors
    /// [`Error::Configuration`] when no layer or a zero block size is given.
    pub fn new(mut layers: Vec<u64>) -> Result<Self> {
        layers.sort_unstable();
        layers.dedup();
        if layers.is_empty() {
            return Err(Error::Configuration("HRD needs at least one block size".to_owned()));
        }
        if layers[0] == 0 {
            return Err(Error::Configuration("HRD block sizes must be positive".to_owned()));
        }

        let count = layers.len();
        Ok(Self {
            layers,
            reuse_model: vec![ReuseHistogram::new(); count],
            ops_model: [[0; OPERATION_COUNT]; MEMORY_STATE_COUNT],
            min_address: u64::MAX,
            max_address: 0,
            time: 0,
            trees: vec![OlkenTree::new(); count],
            states: HashMap::new(),
        })
    }

    /// Update the reuse-distance model and the read/write model.
    pub fn update(&mut self, address: u64, op: Operation) {
        self.min_address = self.min_address.min(address);
        self.max_address = self.max_address.max(address);

        self.model_reuse(address);
        self.model_operation(address, op);
    }

    /// The total number of requests modelled, equivalent to the logical time.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.time
    }

    /// The number of unique addresses modelled by the profile.
    #[inline]
    #[must_use]
    pub fn unique_addresses(&self) -> usize {
        self.states.len()
    }

    fn model_reuse(&mut self, address: u64) {
        // Scan layers in ascending block-size order; the first finite
        // distance is credited to the layer where it was found. When every
        // layer misses, the cold miss is credited to the finest layer.
        let mut credited = (0, Distance::Infinite);
        for (layer, &block_size) in self.layers.iter().enumerate() {
            let block = calculate_block(address, block_size);
            let distance = compute_distance(&self.trees[layer], block);
            if distance.is_finite() {
                credited = (layer, distance);
                break;
            }
        }

        let (layer, distance) = credited;
        *self.reuse_model[layer].entry(distance).or_insert(0) += 1;

        // Update every layer's history, regardless of where the hit landed.
        for (layer, &block_size) in self.layers.iter().enumerate() {
            let block = calculate_block(address, block_size);
            update(&mut self.trees[layer], block, self.time);
        }

        self.time += 1;
    }

    fn model_operation(&mut self, address: u64, op: Operation) {
        let state = self.states.entry(address).or_default();
        self.ops_model[state.index()][op.index()] += 1;
        state.apply(op);
    }
}
