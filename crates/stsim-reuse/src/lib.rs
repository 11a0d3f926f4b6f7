// crates/stsim-reuse/src/lib.rs

//! Reuse-distance tracking in `O(log n)` per access.
//!
//! The data structure follows Olken's description in "Efficient methods for
//! calculating the success function of fixed space replacement policies":
//! an order-statistics red-black tree keyed by logical access time, paired
//! with an address index for `O(1)` node lookup.

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

pub mod tree;

pub use tree::{NodeId, OlkenTree};

use stsim_core::Distance;

/// Compute the stack distance for the given address.
///
/// Returns [`Distance::Infinite`] when the address has never been seen,
/// otherwise the number of nodes referenced since it was last accessed.
///
/// Complexity: `O(log n)`.
#[must_use]
pub fn compute_distance(tree: &OlkenTree, address: u64) -> Distance {
    tree.find_address(address)
        .map_or(Distance::Infinite, |node| Distance::Finite(tree.stack_position(node)))
}

/// Make `address` the most recent reference at logical time `time`.
///
/// Erases any pre-existing node for the address before inserting; callers
/// must advance `time` monotonically.
///
/// Complexity: `O(log n)`.
pub fn update(tree: &mut OlkenTree, address: u64, time: u64) {
    if let Some(node) = tree.find_address(address) {
        tree.erase(node);
    }
    tree.insert(time, address);
}
