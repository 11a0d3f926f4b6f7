// crates/stsim-hrd/src/synthesis.rs

//! The HRD synthesizer: inverts a profile into a stream of requests.

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

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution as _;
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

use stsim_core::{Distance, Error, MemoryState, Operation, Result};
use stsim_reuse::{update, OlkenTree};

use crate::profile::{OpsModel, Profile};

/// Reuse histogram re-ordered for sampling: index 0 carries the cold-miss
/// bucket, indices `1..` the finite distances in ascending order.
struct Histogram {
    distances: Vec<Distance>,
    counts: Vec<u64>,
}

/// Per-layer synthesis state.
struct Layer {
    block_size: u64,
    hist: Histogram,
    tree: OlkenTree,
    time: u64,
    /// Addresses generated so far, grouped by the block they fall in.
    generated: BTreeMap<u64, BTreeSet<u64>>,
}

/// Generates synthetic requests from an HRD [`Profile`].
pub struct Synthesizer {
    rng: StdRng,
    min_address: u64,
    max_address: u64,
    layers: Vec<Layer>,
    ops_model: OpsModel,
    states: HashMap<u64, MemoryState>,
}

impl Synthesizer {
    /// Consume a profile and seed the generator.
    #[must_use]
    pub fn new(profile: Profile, seed: u64) -> Self {
        let layers = profile
            .layers
            .iter()
            .zip(&profile.reuse_model)
            .map(|(&block_size, hist)| {
                let mut distances = vec![Distance::Infinite];
                let mut counts = vec![hist.get(&Distance::Infinite).copied().unwrap_or(0)];
                for (&distance, &count) in hist {
                    if distance.is_finite() {
                        distances.push(distance);
                        counts.push(count);
                    }
                }
                Layer {
                    block_size,
                    hist: Histogram { distances, counts },
                    tree: OlkenTree::new(),
                    time: 0,
                    generated: BTreeMap::new(),
                }
            })
            .collect();

        Self {
            rng: StdRng::seed_from_u64(seed),
            min_address: profile.min_address,
            max_address: profile.max_address,
            layers,
            ops_model: profile.ops_model,
            states: HashMap::new(),
        }
    }

    /// Synthesize the next request.
    ///
    /// # Errors
    /// [`Error::Exhausted`] when no layer holds history and every coarsest
    /// block has been used, so no fresh address can make progress.
    pub fn generate_next_request(&mut self) -> Result<(u64, Operation)> {
        let address = self.generate_address()?;

        let state = self.states.entry(address).or_default();
        let reads = self.ops_model[state.index()][Operation::Read.index()];
        let writes = self.ops_model[state.index()][Operation::Write.index()];
        let op = generate_operation(&mut self.rng, reads, writes);
        state.apply(op);

        Ok((address, op))
    }

    fn generate_address(&mut self) -> Result<u64> {
        // Transient failures (a full block) are retried with a fresh sample;
        // the bound turns a stream that can no longer make progress into an
        // error instead of a livelock.
        const MAX_ATTEMPTS: u32 = 1 << 16;

        for _ in 0..MAX_ATTEMPTS {
            if let Some(address) = self.try_generate_address()? {
                for layer in &mut self.layers {
                    let block = address / layer.block_size;
                    update(&mut layer.tree, block, layer.time);
                    layer.time += 1;
                    layer.generated.entry(block).or_default().insert(address);
                }
                return Ok(address);
            }
        }

        Err(Error::Exhausted("no fresh block found after repeated resampling".to_owned()))
    }

    /// One attempt at drawing an address. `Ok(None)` is a transient failure:
    /// the targeted block was full and resampling may pick another.
    fn try_generate_address(&mut self) -> Result<Option<u64>> {
        let mut distance = Distance::Infinite;
        let mut sampled_any = false;
        let mut l = 0;
        while distance == Distance::Infinite && l < self.layers.len() {
            let layer = &self.layers[l];
            if !layer.tree.is_empty() {
                sampled_any = true;
                distance = random_reuse(&mut self.rng, &layer.hist, layer.tree.len());
            }
            l += 1;
        }

        match distance {
            Distance::Infinite => {
                // Every layer missed: generate a fresh address, aligned to
                // the finest block size, whose coarsest block is unused.
                let coarsest = match self.layers.last() {
                    Some(layer) => layer,
                    None => return Err(Error::Invariant("synthesizer has no layers".to_owned())),
                };
                let finest_block = self.layers[0].block_size;
                let span = self.max_address - self.min_address;
                let max_blocks = (span / coarsest.block_size).max(1);
                if coarsest.generated.len() as u64 >= max_blocks {
                    if sampled_any {
                        return Ok(None);
                    }
                    return Err(Error::Exhausted(format!(
                        "all {max_blocks} coarsest blocks are in use"
                    )));
                }
                loop {
                    let address =
                        uniform(&mut self.rng, self.min_address, self.max_address, finest_block);
                    let block = address / coarsest.block_size;
                    if !coarsest.generated.contains_key(&block) {
                        return Ok(Some(address));
                    }
                }
            }
            Distance::Finite(d) => {
                // One of the layers is reusing a block.
                let layer = &self.layers[l - 1];
                let block = read_history(layer, d);

                if l - 1 == 0 {
                    // The finest layer is reusing; no finer address needed.
                    return Ok(Some(block * layer.block_size));
                }

                let Some(generated) = layer.generated.get(&block) else {
                    return Err(Error::Invariant(format!(
                        "reused block {block} has no generated addresses"
                    )));
                };
                let target_block_size = self.layers[l - 2].block_size;
                Ok(new_unique_in_block(
                    &mut self.rng,
                    block,
                    layer.block_size,
                    target_block_size,
                    generated,
                ))
            }
        }
    }
}

/// Draw uniformly from `[min, max)` aligned to `multiple`; degenerates to
/// `min` when the range holds no aligned slot.
fn uniform(rng: &mut StdRng, min: u64, max: u64, multiple: u64) -> u64 {
    let span = (max - min) / multiple;
    if span == 0 {
        return min;
    }
    min + rng.random_range(0..span) * multiple
}

/// Sample a distance from the histogram, truncated to distances strictly
/// below the current stack size. The cold-miss bucket at index 0 always
/// remains eligible.
fn random_reuse(rng: &mut StdRng, hist: &Histogram, stack_size: usize) -> Distance {
    let max_distance = Distance::Finite(stack_size as u64);
    let mut max_index = 1;
    while max_index < hist.distances.len() && hist.distances[max_index] < max_distance {
        max_index += 1;
    }

    WeightedIndex::new(&hist.counts[..max_index])
        .map_or(Distance::Infinite, |dist| hist.distances[dist.sample(rng)])
}

/// Walk `distance` positions back from the most recently used block.
fn read_history(layer: &Layer, distance: u64) -> u64 {
    let tree = &layer.tree;
    let offset = usize::try_from(distance).unwrap_or(usize::MAX);

    if offset < tree.len() {
        if let Some(mut node) = tree.most_recently_used() {
            for _ in 0..offset {
                match tree.predecessor(node) {
                    Some(previous) => node = previous,
                    None => break,
                }
            }
            return tree.address(node);
        }
    }

    // The requested distance exceeded the stack size: take the LRU block.
    tree.least_recently_used().map_or(0, |n| tree.address(n))
}

/// Pick an unused address inside `block`, aligned to `target_block_size`.
/// `None` when the block already holds every aligned slot.
fn new_unique_in_block(
    rng: &mut StdRng,
    block: u64,
    parent_block_size: u64,
    target_block_size: u64,
    generated: &BTreeSet<u64>,
) -> Option<u64> {
    let min = block * parent_block_size;
    let max = min + parent_block_size;

    let max_blocks = (parent_block_size / target_block_size).max(1);
    if generated.len() as u64 >= max_blocks {
        return None;
    }

    loop {
        let address = uniform(rng, min, max, target_block_size);
        if !generated.contains(&address) {
            return Some(address);
        }
    }
}

fn generate_operation(rng: &mut StdRng, reads: u64, writes: u64) -> Operation {
    WeightedIndex::new([reads, writes]).map_or(Operation::Read, |dist| {
        if dist.sample(rng) == 0 {
            Operation::Read
        } else {
            Operation::Write
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_respects_alignment_and_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let a = uniform(&mut rng, 128, 1152, 64);
            assert!(a >= 128 && a < 1152);
            assert_eq!(a % 64, 0);
        }
    }

    #[test]
    fn uniform_degenerates_to_min_on_empty_span() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(uniform(&mut rng, 0, 0, 64), 0);
        assert_eq!(uniform(&mut rng, 32, 48, 64), 32);
    }

    #[test]
    fn random_reuse_truncates_to_stack_size() {
        let mut rng = StdRng::seed_from_u64(7);
        let hist = Histogram {
            distances: vec![Distance::Infinite, Distance::Finite(0), Distance::Finite(5)],
            counts: vec![0, 10, 10],
        };
        // Stack of 3: distance 5 must never be drawn; infinity has weight 0.
        for _ in 0..50 {
            assert_eq!(random_reuse(&mut rng, &hist, 3), Distance::Finite(0));
        }
    }

    #[test]
    fn read_history_walks_back_from_the_top_of_the_stack() {
        let mut layer = Layer {
            block_size: 1,
            hist: Histogram { distances: vec![Distance::Infinite], counts: vec![0] },
            tree: OlkenTree::new(),
            time: 0,
            generated: BTreeMap::new(),
        };
        for (t, block) in [(0, 10), (1, 20), (2, 30)] {
            update(&mut layer.tree, block, t);
        }
        assert_eq!(read_history(&layer, 0), 30);
        assert_eq!(read_history(&layer, 1), 20);
        assert_eq!(read_history(&layer, 2), 10);
        // Beyond the stack: least recently used.
        assert_eq!(read_history(&layer, 9), 10);
    }
}
