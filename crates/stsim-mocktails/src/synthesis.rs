// crates/stsim-mocktails/src/synthesis.rs

//! Per-leaf request generation merged by time.
//!
//! Every leaf synthesizes its `request_count` requests up front; the merge
//! is a min-heap ordered by `(tick, leaf, sequence)` so equal ticks resolve
//! deterministically.

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

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

use stsim_core::{Operation, Request, Result};

use crate::model::{Leaf, Model, SimpleModel};
use crate::profile::Profile;
use crate::sequence::SequenceModel;

#[derive(PartialEq, Eq)]
struct HeapItem {
    tick: u64,
    leaf: u32,
    sequence: u64,
    request: Request,
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.tick, self.leaf, self.sequence).cmp(&(other.tick, other.leaf, other.sequence))
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Fold an address back into `[min, max)` when it escaped the range.
fn keep_in_range(address: u64, min: u64, max: u64) -> u64 {
    if address > max || address < min {
        let size = max - min;
        if size == 0 {
            return min;
        }
        return address.wrapping_sub(size) % size + min;
    }
    address
}

/// Generates the time-ordered request stream of one profile.
///
/// Borrows the profile mutably: sequence-model draws decrement its
/// convergence counters in place.
pub struct Synthesizer {
    queue: BinaryHeap<Reverse<HeapItem>>,
}

impl Synthesizer {
    /// Populate the merge queue from every leaf of the profile.
    ///
    /// # Errors
    /// Propagates draw failures from the leaf models.
    pub fn new(profile: &mut Profile, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut queue = BinaryHeap::new();

        for (&leaf_id, leaf) in &mut profile.leaves {
            match leaf.underlying {
                Leaf::Simple(_) => populate_simple(&mut queue, leaf_id, leaf, &mut rng)?,
                Leaf::Stm(_) => populate_stm(&mut queue, leaf_id, leaf, &mut rng)?,
                Leaf::Hrd(_) => populate_hrd(&mut queue, leaf_id, leaf, &mut rng)?,
            }
        }

        Ok(Self { queue })
    }

    /// Whether any requests remain.
    #[inline]
    #[must_use]
    pub fn has_more_requests(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Remaining request count.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop the next request in time order.
    pub fn generate_next_request(&mut self) -> Option<Request> {
        self.queue.pop().map(|Reverse(item)| item.request)
    }
}

fn draw_size(model: &mut SequenceModel<u64>, rng: &mut StdRng) -> Result<u32> {
    Ok(u32::try_from(model.draw(rng)?).unwrap_or(u32::MAX))
}

fn push(queue: &mut BinaryHeap<Reverse<HeapItem>>, leaf: u32, request: Request) {
    let sequence = queue.len() as u64;
    queue.push(Reverse(HeapItem { tick: request.tick, leaf, sequence, request }));
}

fn populate_simple(
    queue: &mut BinaryHeap<Reverse<HeapItem>>,
    leaf_id: u32,
    leaf: &mut Model<Leaf>,
    rng: &mut StdRng,
) -> Result<()> {
    let Model { request_count, start_time, size_model, time_model, underlying } = leaf;
    let Leaf::Simple(simple) = underlying else {
        return Ok(());
    };
    let SimpleModel { start_address, footprint, operation_model, stride_model } = simple;

    if *request_count == 0 {
        return Ok(());
    }

    let mut tick = *start_time;
    let mut address = *start_address;
    let mut size = draw_size(size_model, rng)?;
    let mut op = operation_model.draw(rng)?;
    push(queue, leaf_id, Request::new(tick, op, address, size));

    for _ in 1..*request_count {
        tick += time_model.draw(rng)?;

        let stride = stride_model.draw(rng)?;
        address = address.wrapping_add(stride as u64);
        address = keep_in_range(address, footprint.start, footprint.end);

        size = draw_size(size_model, rng)?;
        op = operation_model.draw(rng)?;
        push(queue, leaf_id, Request::new(tick, op, address, size));
    }

    Ok(())
}

fn populate_stm(
    queue: &mut BinaryHeap<Reverse<HeapItem>>,
    leaf_id: u32,
    leaf: &mut Model<Leaf>,
    rng: &mut StdRng,
) -> Result<()> {
    let Model { start_time, size_model, time_model, underlying, .. } = leaf;
    let Leaf::Stm(profile) = underlying else {
        return Ok(());
    };

    let request_count = profile.count();
    if request_count == 0 {
        return Ok(());
    }

    let mut synth = stsim_stm::Synthesizer::new(profile.clone(), rng.random());

    let mut tick = *start_time;
    let mut size = draw_size(size_model, rng)?;
    let (mut address, mut op): (u64, Operation) = synth.generate_next_request()?;
    push(queue, leaf_id, Request::new(tick, op, address, size));

    for _ in 1..request_count {
        tick += time_model.draw(rng)?;
        size = draw_size(size_model, rng)?;
        (address, op) = synth.generate_next_request()?;
        push(queue, leaf_id, Request::new(tick, op, address, size));
    }

    Ok(())
}

fn populate_hrd(
    queue: &mut BinaryHeap<Reverse<HeapItem>>,
    leaf_id: u32,
    leaf: &mut Model<Leaf>,
    rng: &mut StdRng,
) -> Result<()> {
    let Model { request_count, start_time, size_model, time_model, underlying } = leaf;
    let Leaf::Hrd(profile) = underlying else {
        return Ok(());
    };

    if *request_count == 0 {
        return Ok(());
    }

    let mut synth = stsim_hrd::Synthesizer::new(profile.clone(), rng.random());

    let mut tick = *start_time;
    let mut size = draw_size(size_model, rng)?;
    let (mut address, mut op): (u64, Operation) = synth.generate_next_request()?;
    push(queue, leaf_id, Request::new(tick, op, address, size));

    for _ in 1..*request_count {
        tick += time_model.draw(rng)?;
        size = draw_size(size_model, rng)?;
        (address, op) = synth.generate_next_request()?;
        push(queue, leaf_id, Request::new(tick, op, address, size));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::generate_profile;
    use crate::hierarchy::HierarchyConfig;
    use crate::partition::Partition;
    use crate::profile::ModelType;

    fn ascending_read_root(n: u64) -> Partition {
        let requests: Vec<Request> =
            (0..n).map(|i| Request::new(i, Operation::Read, i * 64, 64)).collect();
        Partition { start_time: 0, duration: n.saturating_sub(1), requests }
    }

    #[test]
    fn simple_leaf_reproduces_a_uniform_strided_stream() {
        let mut profile = generate_profile(
            0,
            ascending_read_root(32),
            &HierarchyConfig::default(),
            ModelType::Mocktails,
        )
        .unwrap();

        let mut synth = Synthesizer::new(&mut profile, 42).unwrap();
        assert_eq!(synth.len(), 32);

        let mut last_tick = 0;
        let mut last_address = 0;
        let mut first = true;
        while let Some(req) = synth.generate_next_request() {
            assert_eq!(req.op, Operation::Read);
            assert_eq!(req.size, 64);
            if first {
                assert_eq!(req.tick, 0);
                assert_eq!(req.address, 0);
                first = false;
            } else {
                assert_eq!(req.tick, last_tick + 1);
                assert_eq!(req.address.wrapping_sub(last_address), 64);
            }
            last_tick = req.tick;
            last_address = req.address;
        }
    }

    #[test]
    fn merge_orders_requests_by_tick_across_leaves() {
        let config = HierarchyConfig {
            levels: vec![crate::partition::SplitConfig {
                scheme: crate::partition::Scheme::Temporal,
                separator: crate::partition::Separator::Requests,
                value: 8,
            }],
        };
        let mut profile =
            generate_profile(0, ascending_read_root(24), &config, ModelType::Mocktails).unwrap();
        assert_eq!(profile.model_count(), 3);

        let mut synth = Synthesizer::new(&mut profile, 7).unwrap();
        let mut last_tick = 0;
        while let Some(req) = synth.generate_next_request() {
            assert!(req.tick >= last_tick, "ticks must be non-decreasing");
            last_tick = req.tick;
        }
    }

    #[test]
    fn fixed_seed_is_bit_reproducible() {
        let build = || {
            generate_profile(
                0,
                ascending_read_root(64),
                &HierarchyConfig::default(),
                ModelType::Stm,
            )
            .unwrap()
        };

        let collect = |mut p: Profile| {
            let mut synth = Synthesizer::new(&mut p, 99).unwrap();
            let mut out = Vec::new();
            while let Some(r) = synth.generate_next_request() {
                out.push(r);
            }
            out
        };

        assert_eq!(collect(build()), collect(build()));
    }
}
