// crates/stsim-mocktails/src/model.rs

//! Leaf models: the common size/time wrapper plus one of three underlying
//! model kinds (simple, STM, HRD).

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

use stsim_core::{AddressRange, Error, Operation, Request, Result};

use crate::profile::ModelType;
use crate::sequence::{SequenceBuilder, SequenceModel};

/// SDC shape used for STM leaves.
const LEAF_STM_ROWS: usize = 32;
const LEAF_STM_COLS: usize = 2;
const LEAF_STM_DEPTH: usize = 8;

/// Block size for the single-layer HRD leaves.
const LEAF_HRD_BLOCK_SIZE: u64 = 64;

/// The wrapper that models common characteristics, with an underlying model
/// for the rest.
#[derive(Clone, Debug)]
pub struct Model<U> {
    /// The number of requests modelled.
    pub request_count: u64,
    /// The time of the first request.
    pub start_time: u64,
    /// Models the number of bytes requested.
    pub size_model: SequenceModel<u64>,
    /// Models the deltas between consecutive timestamps.
    pub time_model: SequenceModel<u64>,
    /// Models the remaining characteristics.
    pub underlying: U,
}

/// The sequence-based underlying model.
#[derive(Clone, Debug)]
pub struct SimpleModel {
    /// The address of the first request.
    pub start_address: u64,
    /// The address range modelled.
    pub footprint: AddressRange,
    /// Models whether a request reads or writes.
    pub operation_model: SequenceModel<Operation>,
    /// Models the deltas between consecutive addresses; strides are signed.
    pub stride_model: SequenceModel<i64>,
}

/// The underlying model attached to a leaf partition.
#[derive(Clone, Debug)]
pub enum Leaf {
    /// Sequence-based model.
    Simple(SimpleModel),
    /// Spatial-temporal memory profile.
    Stm(stsim_stm::Profile),
    /// Single-layer hierarchical reuse-distance profile.
    Hrd(stsim_hrd::Profile),
}

fn base_model(requests: &[Request]) -> Result<(u64, u64, SequenceModel<u64>, SequenceModel<u64>)> {
    let first = requests
        .first()
        .ok_or_else(|| Error::Invariant("cannot model an empty partition".to_owned()))?;

    let mut sizes = SequenceBuilder::new();
    let mut deltas = SequenceBuilder::new();
    let mut last_time = first.tick;

    for (i, req) in requests.iter().enumerate() {
        sizes.add(u64::from(req.size));
        if i > 0 {
            deltas.add(req.tick - last_time);
        }
        last_time = req.tick;
    }

    Ok((requests.len() as u64, first.tick, sizes.build(), deltas.build()))
}

fn simple_model(requests: &[Request]) -> Result<SimpleModel> {
    let first = requests
        .first()
        .ok_or_else(|| Error::Invariant("cannot model an empty partition".to_owned()))?;

    let mut ops = SequenceBuilder::new();
    let mut strides = SequenceBuilder::new();
    let mut footprint = AddressRange::default();
    let mut last_address = first.address;

    for (i, req) in requests.iter().enumerate() {
        ops.add(req.op);
        if i > 0 {
            strides.add(req.address.wrapping_sub(last_address) as i64);
        }
        footprint.start = footprint.start.min(req.address);
        footprint.end = footprint.end.max(req.address + u64::from(req.size));
        last_address = req.address;
    }

    Ok(SimpleModel {
        start_address: first.address,
        footprint,
        operation_model: ops.build(),
        stride_model: strides.build(),
    })
}

/// Build the leaf model for a partition's requests.
///
/// STM leaves use a 32x2 SDC with stride depth 8; HRD leaves use a flat
/// 64-byte layer.
///
/// # Errors
/// [`Error::Invariant`] for an empty request slice.
pub fn build_leaf(requests: &[Request], model_type: ModelType) -> Result<Model<Leaf>> {
    let (request_count, start_time, size_model, time_model) = base_model(requests)?;

    let underlying = match model_type {
        ModelType::Mocktails => Leaf::Simple(simple_model(requests)?),
        ModelType::Stm => {
            let mut profile = stsim_stm::Profile::new(stsim_stm::Parameters {
                num_rows: LEAF_STM_ROWS,
                num_cols: LEAF_STM_COLS,
                stride_depth: LEAF_STM_DEPTH,
            })?;
            for req in requests {
                profile.update(req.address, req.op);
            }
            Leaf::Stm(profile)
        }
        ModelType::Hrd => {
            let mut profile = stsim_hrd::Profile::new(vec![LEAF_HRD_BLOCK_SIZE])?;
            for req in requests {
                profile.update(req.address, req.op);
            }
            Leaf::Hrd(profile)
        }
    };

    Ok(Model { request_count, start_time, size_model, time_model, underlying })
}
