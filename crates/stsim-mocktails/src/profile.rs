// crates/stsim-mocktails/src/profile.rs

//! The statistical profile: one model per leaf of a hierarchy.

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

use stsim_core::Result;

use crate::hierarchy::Hierarchy;
use crate::model::{build_leaf, Leaf, Model};

/// Which underlying model kind every leaf of a profile carries.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Simple sequence-based leaves.
    Mocktails,
    /// STM leaves.
    Stm,
    /// HRD leaves.
    Hrd,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mocktails => write!(f, "mocktails"),
            Self::Stm => write!(f, "stm"),
            Self::Hrd => write!(f, "hrd"),
        }
    }
}

/// The statistical profile for one execution phase.
#[derive(Clone, Debug)]
pub struct Profile {
    /// Phase identifier, in file order.
    pub id: u32,
    /// The leaf model kind.
    pub model_type: ModelType,
    /// Models of the requests of leaf nodes, keyed by node id.
    pub leaves: BTreeMap<u32, Model<Leaf>>,
}

impl Profile {
    /// Create an empty profile.
    #[must_use]
    pub const fn new(id: u32, model_type: ModelType) -> Self {
        Self { id, model_type, leaves: BTreeMap::new() }
    }

    /// Create a model for each leaf node of the hierarchy.
    ///
    /// # Errors
    /// Propagates leaf-model construction failures.
    pub fn from_hierarchy(id: u32, model_type: ModelType, h: &Hierarchy) -> Result<Self> {
        let mut profile = Self::new(id, model_type);

        let mut stack = vec![h.root_id()];
        while let Some(node_id) = stack.pop() {
            let children = h.children(node_id)?;
            if children.is_empty() {
                let partition = h.partition(node_id)?;
                profile.leaves.insert(node_id, build_leaf(&partition.requests, model_type)?);
            } else {
                stack.extend(children.iter().copied());
            }
        }

        Ok(profile)
    }

    /// The number of leaf models.
    #[inline]
    #[must_use]
    pub fn model_count(&self) -> u64 {
        self.leaves.len() as u64
    }

    /// Total request count across all leaves.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.leaves.values().map(|m| m.request_count).sum()
    }
}
