//! Full pipeline: partition a trace, model it, round-trip the profile
//! through a file, and synthesize a trace with matching shape.

use stsim_core::io::{read_profiles_auto, write_profiles_auto};
use stsim_core::{Operation, Request};
use stsim_mocktails::config::parse_config;
use stsim_mocktails::{generate_profile, ModelType, Partition, ProfileRecord, Synthesizer};

fn ascending_reads(n: u64) -> Partition {
    let requests: Vec<Request> =
        (0..n).map(|i| Request::new(i, Operation::Read, i * 64, 64)).collect();
    Partition { start_time: 0, duration: n - 1, requests }
}

#[test]
fn modeled_trace_roundtrips_and_synthesizes() {
    let config = parse_config(
        r#"{
          "hierarchy": [
            { "partition": { "scheme": "temporal", "separator": "requests", "value": 32 } }
          ]
        }"#,
    )
    .unwrap();

    let profile = generate_profile(0, ascending_reads(96), &config, ModelType::Mocktails).unwrap();
    assert_eq!(profile.model_count(), 3);

    let records = vec![ProfileRecord::from_profile(&profile)];
    let dir = tempfile::tempdir().unwrap();
    for name in ["profiles.json", "profiles.cbor", "profiles.jsonl"] {
        let path = dir.path().join(name);
        write_profiles_auto(&path, &records).unwrap();
        let got: Vec<ProfileRecord> = read_profiles_auto(&path).unwrap();
        assert_eq!(got, records);
    }

    let mut restored = records[0].clone().into_profile(0).unwrap();
    let mut synth = Synthesizer::new(&mut restored, 42).unwrap();
    assert_eq!(synth.len(), 96);

    let mut last_tick = 0;
    let mut count = 0;
    while let Some(req) = synth.generate_next_request() {
        assert!(req.tick >= last_tick);
        assert_eq!(req.op, Operation::Read);
        assert_eq!(req.size, 64);
        last_tick = req.tick;
        count += 1;
    }
    assert_eq!(count, 96);
}

#[test]
fn stm_and_hrd_leaf_profiles_synthesize_their_request_counts() {
    // A looping stream with one far outlier: plenty of reuse for the leaf
    // models, plus address-range slack for their cold misses.
    let looping: Vec<Request> = (0..64)
        .map(|i| {
            let address = if i == 32 { 6400 } else { (i % 8) * 64 };
            Request::new(i, Operation::Read, address, 64)
        })
        .collect();
    let root = Partition { start_time: 0, duration: 63, requests: looping };

    for model_type in [ModelType::Stm, ModelType::Hrd] {
        let profile = generate_profile(
            0,
            root.clone(),
            &stsim_mocktails::HierarchyConfig::default(),
            model_type,
        )
        .unwrap();

        let record = ProfileRecord::from_profile(&profile);
        let mut restored = record.into_profile(0).unwrap();
        let mut synth = Synthesizer::new(&mut restored, 5).unwrap();
        assert_eq!(synth.len(), 64);

        let mut last_tick = 0;
        while let Some(req) = synth.generate_next_request() {
            assert!(req.tick >= last_tick);
            last_tick = req.tick;
        }
    }
}
