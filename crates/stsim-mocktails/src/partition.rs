// crates/stsim-mocktails/src/partition.rs

//! Partitions of a request stream and the temporal/spatial split policies.

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

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use stsim_core::{AddressRange, Error, Request, Result};

/// Supported partitioning schemes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Partition based on when a request occurred.
    Temporal,
    /// Partition based on the addresses of requests.
    Spatial,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporal => write!(f, "temporal"),
            Self::Spatial => write!(f, "spatial"),
        }
    }
}

/// Supported delimiters for the partitioning schemes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    /// A fixed cycle count (temporal).
    Cycles,
    /// A fixed number of requests per child (temporal).
    Requests,
    /// A fixed number of children (temporal).
    Count,
    /// Contiguous address ranges (spatial).
    Contiguous,
    /// Fixed-size address ranges (spatial).
    Bytes,
}

/// The configuration of one split level.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplitConfig {
    /// Which dimension to split in.
    pub scheme: Scheme,
    /// How the dimension is delimited.
    pub separator: Separator,
    /// The delimiter value (cycles, requests, children, or bytes).
    pub value: u32,
}

impl Default for SplitConfig {
    /// The default configuration is a monolithic temporal partition.
    fn default() -> Self {
        Self { scheme: Scheme::Temporal, separator: Separator::Count, value: 1 }
    }
}

impl SplitConfig {
    /// Reject unknown scheme/separator pairings and non-positive values.
    ///
    /// # Errors
    /// [`Error::Configuration`] describing the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.value == 0 {
            return Err(Error::Configuration(
                "partition 'value' must be greater than 0".to_owned(),
            ));
        }
        match (self.scheme, self.separator) {
            (Scheme::Temporal, Separator::Cycles | Separator::Count | Separator::Requests)
            | (Scheme::Spatial, Separator::Contiguous | Separator::Bytes) => Ok(()),
            (scheme, separator) => Err(Error::Configuration(format!(
                "separator {separator:?} does not apply to the {scheme} scheme"
            ))),
        }
    }
}

/// A collection of memory requests, contiguous in some dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// The requests, in input order.
    pub requests: Vec<Request>,
    /// The time of the first request.
    pub start_time: u64,
    /// Cycles spanned by the requests.
    pub duration: u64,
}

/// Split the partition in the temporal or spatial dimension.
///
/// The parent's requests are moved into the children and the parent is left
/// empty; callers never touch a parent's request vector again.
///
/// # Errors
/// [`Error::Configuration`] for an invalid scheme/separator combination.
pub fn split(parent: &mut Partition, config: SplitConfig) -> Result<BTreeMap<u32, Partition>> {
    config.validate()?;

    if parent.requests.is_empty() {
        return Ok(BTreeMap::new());
    }

    let requests = std::mem::take(&mut parent.requests);
    let result = match (config.scheme, config.separator) {
        (Scheme::Temporal, Separator::Cycles) => {
            fixed_time(requests, parent.start_time, u64::from(config.value))
        }
        (Scheme::Temporal, Separator::Count) => {
            // Rewrite the child count into a cycle resolution.
            let count = u64::from(config.value);
            let resolution = (parent.duration + count) / count;
            fixed_time(requests, parent.start_time, resolution)
        }
        (Scheme::Temporal, Separator::Requests) => {
            fixed_requests(requests, config.value as usize)
        }
        (Scheme::Spatial, Separator::Bytes) => fixed_bytes(requests, u64::from(config.value)),
        (Scheme::Spatial, Separator::Contiguous) => contiguous(requests),
        _ => unreachable!("validated above"),
    };

    Ok(result)
}

/// Child id = `(tick - parent start) / resolution`; children inherit fixed
/// windows of `resolution` cycles.
fn fixed_time(
    requests: Vec<Request>,
    parent_start: u64,
    resolution: u64,
) -> BTreeMap<u32, Partition> {
    let mut result = BTreeMap::new();

    for req in requests {
        let id = ((req.tick - parent_start) / resolution) as u32;
        let child = result.entry(id).or_insert_with(|| Partition {
            requests: Vec::new(),
            start_time: parent_start + u64::from(id) * resolution,
            duration: resolution,
        });
        child.requests.push(req);
    }

    result
}

/// Contiguous chunks of exactly `value` requests; the last may be shorter.
fn fixed_requests(requests: Vec<Request>, value: usize) -> BTreeMap<u32, Partition> {
    let mut result = BTreeMap::new();
    let mut iter = requests.into_iter().peekable();
    let mut id = 0u32;

    while iter.peek().is_some() {
        let chunk: Vec<Request> = iter.by_ref().take(value).collect();
        let start_time = chunk[0].tick;
        let duration = chunk[chunk.len() - 1].tick - start_time;
        result.insert(id, Partition { requests: chunk, start_time, duration });
        id += 1;
    }

    result
}

/// Child id = `address / block`.
fn fixed_bytes(requests: Vec<Request>, block: u64) -> BTreeMap<u32, Partition> {
    let mut result = BTreeMap::new();

    for req in requests {
        let id = (req.address / block) as u32;
        let child = result.entry(id).or_insert_with(|| Partition {
            requests: Vec::new(),
            start_time: req.tick,
            duration: 0,
        });
        child.duration = req.tick - child.start_time;
        child.requests.push(req);
    }

    result
}

/// Turn every request into `[address, address + size)`, merge ranges that
/// touch, then collapse runs of single-request ranges with a uniform stride.
/// Each request joins the first range that contains its address.
fn contiguous(requests: Vec<Request>) -> BTreeMap<u32, Partition> {
    let ranges = contiguous_ranges(&requests);

    let mut result: BTreeMap<u32, Partition> = BTreeMap::new();
    for req in requests {
        let Some(id) = ranges.iter().position(|r| r.contains(req.address)) else {
            continue;
        };
        let id = id as u32;
        let child = result.entry(id).or_insert_with(|| Partition {
            requests: Vec::new(),
            start_time: req.tick,
            duration: 0,
        });
        child.duration = req.tick - child.start_time;
        child.requests.push(req);
    }

    result
}

fn contiguous_ranges(requests: &[Request]) -> Vec<AddressRange> {
    // One range per distinct start address; the first request at an address
    // decides the range extent.
    let mut by_start: BTreeMap<u64, AddressRange> = BTreeMap::new();
    for req in requests {
        by_start.entry(req.address).or_insert(AddressRange {
            start: req.address,
            end: req.address + u64::from(req.size),
            count: 1,
        });
    }

    // First pass: merge neighbors that touch.
    let mut merged: Vec<AddressRange> = Vec::new();
    let mut iter = by_start.into_values();
    let Some(mut grouped) = iter.next() else {
        return merged;
    };
    for range in iter {
        if range.intersects(&grouped) {
            grouped.expand(&range);
            grouped.count += 1;
        } else {
            merged.push(grouped);
            grouped = range;
        }
    }
    merged.push(grouped);

    // Second pass: greedily combine runs of singleton ranges whose starts
    // keep a uniform stride from the previous end, so strided accesses
    // collapse into a single range.
    let mut combined: Vec<AddressRange> = Vec::with_capacity(merged.len());
    let mut i = 0;
    while i < merged.len() {
        let mut current = merged[i];
        i += 1;

        if current.count == 1 && i < merged.len() && merged[i].count == 1 {
            let stride = merged[i].start.wrapping_sub(current.end) as i64;
            while i < merged.len() && merged[i].count == 1 {
                let next_stride = merged[i].start.wrapping_sub(current.end) as i64;
                if next_stride != stride {
                    break;
                }
                current.expand(&merged[i]);
                current.count += 1;
                i += 1;
            }
        }

        combined.push(current);
    }

    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use stsim_core::Operation;

    fn req(tick: u64, address: u64, size: u32) -> Request {
        Request::new(tick, Operation::Read, address, size)
    }

    fn root(requests: Vec<Request>) -> Partition {
        let start_time = requests.first().map_or(0, |r| r.tick);
        let duration = requests.last().map_or(0, |r| r.tick) - start_time;
        Partition { requests, start_time, duration }
    }

    #[test]
    fn fixed_requests_makes_even_chunks_with_a_short_tail() {
        let mut parent = root((10..15).map(|t| req(t, t * 8, 8)).collect());
        let children = split(
            &mut parent,
            SplitConfig { scheme: Scheme::Temporal, separator: Separator::Requests, value: 2 },
        )
        .unwrap();

        assert!(parent.requests.is_empty());
        let sizes: Vec<usize> = children.values().map(|p| p.requests.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        let starts: Vec<u64> = children.values().map(|p| p.start_time).collect();
        assert_eq!(starts, vec![10, 12, 14]);
    }

    #[test]
    fn fixed_requests_never_makes_an_empty_tail() {
        let mut parent = root((0..4).map(|t| req(t, t, 1)).collect());
        let children = split(
            &mut parent,
            SplitConfig { scheme: Scheme::Temporal, separator: Separator::Requests, value: 2 },
        )
        .unwrap();
        let sizes: Vec<usize> = children.values().map(|p| p.requests.len()).collect();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn fixed_time_buckets_by_cycle_window() {
        let mut parent = root(vec![req(0, 0, 4), req(5, 4, 4), req(10, 8, 4), req(29, 12, 4)]);
        let children = split(
            &mut parent,
            SplitConfig { scheme: Scheme::Temporal, separator: Separator::Cycles, value: 10 },
        )
        .unwrap();

        assert_eq!(children.len(), 3);
        assert_eq!(children[&0].requests.len(), 2);
        assert_eq!(children[&1].requests.len(), 1);
        assert_eq!(children[&2].requests.len(), 1);
        assert_eq!(children[&1].start_time, 10);
        assert_eq!(children[&1].duration, 10);
    }

    #[test]
    fn count_separator_rewrites_to_cycles() {
        // Duration 9, count 2 -> resolution ceil(10 / 2) = 5.
        let mut parent = root((0..10).map(|t| req(t, t, 1)).collect());
        let children = split(
            &mut parent,
            SplitConfig { scheme: Scheme::Temporal, separator: Separator::Count, value: 2 },
        )
        .unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children[&0].requests.len(), 5);
        assert_eq!(children[&1].requests.len(), 5);
    }

    #[test]
    fn bytes_separator_buckets_by_block() {
        let mut parent = root(vec![req(0, 0, 4), req(1, 64, 4), req(2, 65, 4), req(3, 4096, 4)]);
        let children = split(
            &mut parent,
            SplitConfig { scheme: Scheme::Spatial, separator: Separator::Bytes, value: 64 },
        )
        .unwrap();

        assert_eq!(children.len(), 3);
        assert_eq!(children[&0].requests.len(), 1);
        assert_eq!(children[&1].requests.len(), 2);
        assert_eq!(children[&64].requests.len(), 1);
    }

    #[test]
    fn contiguous_separates_disjoint_ranges() {
        let mut parent = root(vec![req(0, 0, 4), req(1, 4, 4), req(2, 100, 4)]);
        let children = split(
            &mut parent,
            SplitConfig { scheme: Scheme::Spatial, separator: Separator::Contiguous, value: 1 },
        )
        .unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children[&0].requests.len(), 2);
        assert_eq!(children[&1].requests.len(), 1);
    }

    #[test]
    fn contiguous_collapses_uniform_strides() {
        // Singleton ranges at 0, 8, 16 with a uniform stride of 4 from each
        // previous end collapse into one range.
        let mut parent = root(vec![req(0, 0, 4), req(1, 8, 4), req(2, 16, 4)]);
        let children = split(
            &mut parent,
            SplitConfig { scheme: Scheme::Spatial, separator: Separator::Contiguous, value: 1 },
        )
        .unwrap();

        assert_eq!(children.len(), 1);
        assert_eq!(children[&0].requests.len(), 3);
    }

    #[test]
    fn contiguous_breaks_on_stride_change() {
        let mut parent = root(vec![req(0, 0, 4), req(1, 8, 4), req(2, 40, 4)]);
        let children = split(
            &mut parent,
            SplitConfig { scheme: Scheme::Spatial, separator: Separator::Contiguous, value: 1 },
        )
        .unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children[&0].requests.len(), 2);
        assert_eq!(children[&1].requests.len(), 1);
    }

    #[test]
    fn invalid_combinations_are_rejected() {
        let mut parent = root(vec![req(0, 0, 4)]);
        assert!(split(
            &mut parent,
            SplitConfig { scheme: Scheme::Temporal, separator: Separator::Bytes, value: 64 },
        )
        .is_err());
        assert!(split(
            &mut parent,
            SplitConfig { scheme: Scheme::Spatial, separator: Separator::Bytes, value: 0 },
        )
        .is_err());
    }
}
