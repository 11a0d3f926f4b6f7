//! End-to-end checks for STM: profile a stream, round-trip the record
//! through a file, and synthesize from the loaded profile.

use stsim_core::io::{read_profiles_auto, write_profiles_auto};
use stsim_core::Operation;
use stsim_stm::{Parameters, Profile, ProfileRecord, Synthesizer};

fn sample_profile() -> Profile {
    let mut profile =
        Profile::new(Parameters { num_rows: 8, num_cols: 2, stride_depth: 4 }).unwrap();
    for i in 0..256u64 {
        let op = if i % 3 == 0 { Operation::Write } else { Operation::Read };
        profile.update((i * 24) % 2048, op);
    }
    profile
}

#[test]
fn profile_file_roundtrip() {
    let records = vec![ProfileRecord::from_profile(&sample_profile())];

    let dir = tempfile::tempdir().unwrap();
    for name in ["p.json", "p.cbor", "p.jsonl"] {
        let path = dir.path().join(name);
        write_profiles_auto(&path, &records).unwrap();
        let got: Vec<ProfileRecord> = read_profiles_auto(&path).unwrap();
        assert_eq!(got, records);
    }
}

#[test]
fn loaded_profile_synthesizes_its_request_count() {
    let records = vec![ProfileRecord::from_profile(&sample_profile())];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p.json");
    write_profiles_auto(&path, &records).unwrap();

    let got: Vec<ProfileRecord> = read_profiles_auto(&path).unwrap();
    let profile = got.into_iter().next().unwrap().into_profile().unwrap();
    let (min, max) = (profile.min_address, profile.max_address);

    let count = profile.count();
    let mut synth = Synthesizer::new(profile, 42);
    for _ in 0..count {
        let (address, _) = synth.generate_next_request().unwrap();
        assert!(address >= min && address <= max, "address {address} outside [{min}, {max}]");
    }
}
