// crates/stsim-mocktails/src/builder.rs

//! Drive the recursive partitioning and build a profile per phase.

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

use tracing::debug;

use stsim_core::Result;

use crate::hierarchy::{Hierarchy, HierarchyConfig};
use crate::partition::{split, Partition, SplitConfig};
use crate::profile::{ModelType, Profile};

/// Apply the configured split policy at `level_id` to the node, recursing
/// into every child. Recursion stops when the level list is exhausted or a
/// partition holds at most one request.
fn populate_hierarchy(
    h: &mut Hierarchy,
    node_id: u32,
    levels: &[SplitConfig],
    level_id: usize,
) -> Result<()> {
    let partition = h.partition_mut(node_id)?;
    let event_count = partition.requests.len();

    if level_id == levels.len() || event_count <= 1 {
        debug!(node_id, level = level_id - 1, events = event_count, "leaf node");
        return Ok(());
    }

    let config = levels[level_id];
    let children = split(partition, config)?;
    debug!(
        node_id,
        level = level_id - 1,
        children = children.len(),
        scheme = %config.scheme,
        "split node"
    );

    for (_, child) in children {
        let child_id = h.add_partition(node_id, child)?;
        populate_hierarchy(h, child_id, levels, level_id + 1)?;
    }

    Ok(())
}

/// Partition the root's requests into a hierarchy and model every leaf.
///
/// `config.levels` holds the policies below the implicit monolithic root.
///
/// # Errors
/// Configuration errors from the split policies, or leaf-model failures.
pub fn generate_profile(
    id: u32,
    root: Partition,
    config: &HierarchyConfig,
    model_type: ModelType,
) -> Result<Profile> {
    debug!(requests = root.requests.len(), "partitioning requests into a hierarchy");

    // Level 0 is the root itself; the configured policies start at level 1.
    let mut levels = vec![SplitConfig::default()];
    levels.extend(config.levels.iter().copied());

    let mut h = Hierarchy::new(root);
    let root_id = h.root_id();
    populate_hierarchy(&mut h, root_id, &levels, 1)?;

    Profile::from_hierarchy(id, model_type, &h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{Scheme, Separator};
    use stsim_core::{Operation, Request};

    fn root(n: u64) -> Partition {
        let requests: Vec<Request> =
            (0..n).map(|i| Request::new(i, Operation::Read, i * 64, 64)).collect();
        Partition { start_time: 0, duration: n.saturating_sub(1), requests }
    }

    #[test]
    fn monolithic_config_yields_one_leaf() {
        let profile =
            generate_profile(0, root(10), &HierarchyConfig::default(), ModelType::Mocktails)
                .unwrap();
        assert_eq!(profile.model_count(), 1);
        assert_eq!(profile.request_count(), 10);
    }

    #[test]
    fn temporal_requests_level_splits_into_chunks() {
        let config = HierarchyConfig {
            levels: vec![SplitConfig {
                scheme: Scheme::Temporal,
                separator: Separator::Requests,
                value: 4,
            }],
        };
        let profile = generate_profile(0, root(10), &config, ModelType::Mocktails).unwrap();
        assert_eq!(profile.model_count(), 3);
        assert_eq!(profile.request_count(), 10);
    }

    #[test]
    fn two_level_hierarchy_keeps_every_request() {
        let config = HierarchyConfig {
            levels: vec![
                SplitConfig { scheme: Scheme::Temporal, separator: Separator::Count, value: 2 },
                SplitConfig { scheme: Scheme::Spatial, separator: Separator::Bytes, value: 256 },
            ],
        };
        let profile = generate_profile(0, root(32), &config, ModelType::Mocktails).unwrap();
        assert!(profile.model_count() > 1);
        assert_eq!(profile.request_count(), 32);
    }
}
