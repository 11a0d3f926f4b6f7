// crates/stsim-mocktails/src/metadata.rs

//! Wire records for Mocktails profiles.
//!
//! Every leaf serializes a common prefix (node id, start time, request
//! count, size and delta-time sequence models) followed by a payload tagged
//! with the leaf kind. Sequence models encode their values as `i64` through
//! [`SequenceValue`]; an absent transition matrix means a constant sequence.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

use serde::{Deserialize, Serialize};

use stsim_core::{AddressRange, Error, Result};

use crate::model::{Leaf, Model, SimpleModel};
use crate::profile::{ModelType, Profile};
use crate::sequence::{SequenceModel, SequenceValue};

/// Format/version tag written to Mocktails profile records, for forward-compat.
pub const PROFILE_VERSION: u16 = 1;

/// One observed transition.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Source state, wire-encoded.
    pub from: i64,
    /// Destination state, wire-encoded.
    pub to: i64,
    /// Observed count.
    pub count: u64,
}

/// A sequence model on the wire. `transitions: None` means the source
/// sequence was constant.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SequenceModelRecord {
    /// The first value of the source sequence.
    pub initial_state: i64,
    /// The transition matrix, absent for constant sequences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<Vec<TransitionRecord>>,
}

impl SequenceModelRecord {
    /// Capture a sequence model.
    #[must_use]
    pub fn from_model<T: SequenceValue>(model: &SequenceModel<T>) -> Self {
        let transitions = if model.transitions.is_empty() {
            None
        } else {
            Some(
                model
                    .transitions
                    .iter()
                    .flat_map(|(from, row)| {
                        let from = from.to_wire();
                        row.iter().map(move |(to, &count)| TransitionRecord {
                            from,
                            to: to.to_wire(),
                            count,
                        })
                    })
                    .collect(),
            )
        };
        Self { initial_state: model.initial_state.to_wire(), transitions }
    }

    /// Rebuild a sequence model; the current state starts at the initial one.
    #[must_use]
    pub fn into_model<T: SequenceValue>(&self) -> SequenceModel<T> {
        let mut model = SequenceModel::constant(T::from_wire(self.initial_state));
        if let Some(transitions) = &self.transitions {
            for t in transitions {
                model
                    .transitions
                    .entry(T::from_wire(t.from))
                    .or_default()
                    .insert(T::from_wire(t.to), t.count);
            }
        }
        model
    }
}

/// Simple-leaf payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimpleModelRecord {
    /// The address of the first request.
    pub start_address: u64,
    /// Footprint start (inclusive).
    pub min_address: u64,
    /// Footprint end (exclusive).
    pub max_address: u64,
    /// Read/write sequence model.
    pub operations: SequenceModelRecord,
    /// Stride sequence model.
    pub strides: SequenceModelRecord,
}

/// Leaf payload, tagged by model kind.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeafPayload {
    /// Simple sequence-based leaf.
    Simple(SimpleModelRecord),
    /// STM leaf.
    Stm(stsim_stm::ProfileRecord),
    /// HRD leaf.
    Hrd(stsim_hrd::ProfileRecord),
}

/// One leaf on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeafRecord {
    /// Hierarchy node id.
    pub node_id: u32,
    /// Time of the leaf's first request.
    pub start_time: u64,
    /// Number of requests to synthesize for this leaf.
    pub request_count: u64,
    /// Request-size sequence model.
    pub sizes: SequenceModelRecord,
    /// Inter-arrival-delta sequence model.
    pub delta_times: SequenceModelRecord,
    /// Kind-specific payload.
    pub payload: LeafPayload,
}

/// Serialized profile for one execution phase.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileRecord {
    /// Format/version tag for forward-compat.
    pub version: u16,
    /// The leaf model kind.
    pub model_type: ModelType,
    /// Number of leaves.
    pub model_count: u64,
    /// The leaves, in node-id order.
    pub leaves: Vec<LeafRecord>,
}

impl ProfileRecord {
    /// Capture a profile into its wire form.
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        let leaves = profile
            .leaves
            .iter()
            .map(|(&node_id, leaf)| {
                let payload = match &leaf.underlying {
                    Leaf::Simple(simple) => LeafPayload::Simple(SimpleModelRecord {
                        start_address: simple.start_address,
                        min_address: simple.footprint.start,
                        max_address: simple.footprint.end,
                        operations: SequenceModelRecord::from_model(&simple.operation_model),
                        strides: SequenceModelRecord::from_model(&simple.stride_model),
                    }),
                    Leaf::Stm(p) => LeafPayload::Stm(stsim_stm::ProfileRecord::from_profile(p)),
                    Leaf::Hrd(p) => LeafPayload::Hrd(stsim_hrd::ProfileRecord::from_profile(p)),
                };
                LeafRecord {
                    node_id,
                    start_time: leaf.start_time,
                    request_count: leaf.request_count,
                    sizes: SequenceModelRecord::from_model(&leaf.size_model),
                    delta_times: SequenceModelRecord::from_model(&leaf.time_model),
                    payload,
                }
            })
            .collect();

        Self {
            version: PROFILE_VERSION,
            model_type: profile.model_type,
            model_count: profile.model_count(),
            leaves,
        }
    }

    /// Rebuild a profile from its wire form.
    ///
    /// # Errors
    /// [`Error::ProfileSchema`] when a leaf payload does not match the
    /// declared model type, plus payload-specific decode failures.
    pub fn into_profile(self, id: u32) -> Result<Profile> {
        let mut profile = Profile::new(id, self.model_type);

        for leaf in self.leaves {
            let underlying = match (self.model_type, leaf.payload) {
                (ModelType::Mocktails, LeafPayload::Simple(record)) => Leaf::Simple(SimpleModel {
                    start_address: record.start_address,
                    footprint: AddressRange {
                        start: record.min_address,
                        end: record.max_address,
                        count: 0,
                    },
                    operation_model: record.operations.into_model(),
                    stride_model: record.strides.into_model(),
                }),
                (ModelType::Stm, LeafPayload::Stm(record)) => Leaf::Stm(record.into_profile()?),
                (ModelType::Hrd, LeafPayload::Hrd(record)) => Leaf::Hrd(record.into_profile()?),
                (model_type, _) => {
                    return Err(Error::ProfileSchema(format!(
                        "leaf {} payload does not match model type {model_type}",
                        leaf.node_id
                    )));
                }
            };

            profile.leaves.insert(
                leaf.node_id,
                Model {
                    request_count: leaf.request_count,
                    start_time: leaf.start_time,
                    size_model: leaf.sizes.into_model(),
                    time_model: leaf.delta_times.into_model(),
                    underlying,
                },
            );
        }

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::generate_profile;
    use crate::hierarchy::HierarchyConfig;
    use crate::partition::{Partition, Scheme, Separator, SplitConfig};
    use stsim_core::{Operation, Request};

    fn sample_root() -> Partition {
        let requests: Vec<Request> = (0..40)
            .map(|i| {
                let op = if i % 5 == 0 { Operation::Write } else { Operation::Read };
                Request::new(i, op, (i * 72) % 1024, 8)
            })
            .collect();
        Partition { start_time: 0, duration: 39, requests }
    }

    fn split_config() -> HierarchyConfig {
        HierarchyConfig {
            levels: vec![SplitConfig {
                scheme: Scheme::Temporal,
                separator: Separator::Requests,
                value: 16,
            }],
        }
    }

    #[test]
    fn sequence_record_roundtrip() {
        let mut model = SequenceModel::constant(0u64);
        model.transitions.entry(1).or_default().insert(2, 3);
        model.transitions.entry(2).or_default().insert(1, 3);

        let record = SequenceModelRecord::from_model(&model);
        let back: SequenceModel<u64> = record.into_model();
        assert_eq!(back.transitions, model.transitions);

        let constant = SequenceModelRecord::from_model(&SequenceModel::constant(7u64));
        assert!(constant.transitions.is_none());
        let back: SequenceModel<u64> = constant.into_model();
        assert!(back.transitions.is_empty());
        assert_eq!(back.initial_state, 7);
    }

    #[test]
    fn profile_roundtrip_for_each_model_type() {
        for model_type in [ModelType::Mocktails, ModelType::Stm, ModelType::Hrd] {
            let profile =
                generate_profile(0, sample_root(), &split_config(), model_type).unwrap();
            let record = ProfileRecord::from_profile(&profile);
            assert_eq!(record.model_count, profile.model_count());

            let restored = record.clone().into_profile(0).unwrap();
            assert_eq!(restored.model_count(), profile.model_count());
            assert_eq!(ProfileRecord::from_profile(&restored), record);
        }
    }

    #[test]
    fn mismatched_payload_is_a_schema_error() {
        let profile =
            generate_profile(0, sample_root(), &split_config(), ModelType::Mocktails).unwrap();
        let mut record = ProfileRecord::from_profile(&profile);
        record.model_type = ModelType::Stm;
        assert!(matches!(record.into_profile(0), Err(Error::ProfileSchema(_))));
    }
}
