// crates/stsim-mocktails/src/config.rs

//! Hierarchy configuration parsing.
//!
//! The configuration is a JSON document listing one split policy per level:
//!
//! ```json
//! {
//!   "hierarchy": [
//!     { "partition": { "scheme": "temporal", "separator": "requests", "value": 1000 } },
//!     { "partition": { "scheme": "spatial", "separator": "contiguous", "value": 1 } }
//!   ]
//! }
//! ```

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

use std::path::Path;

use serde::Deserialize;

use stsim_core::{Error, Result};

use crate::hierarchy::HierarchyConfig;
use crate::partition::SplitConfig;

#[derive(Deserialize)]
struct RawConfig {
    hierarchy: Vec<RawLevel>,
}

#[derive(Deserialize)]
struct RawLevel {
    partition: SplitConfig,
}

/// Parse a hierarchy configuration from JSON text.
///
/// # Errors
/// [`Error::Configuration`] for malformed JSON, unknown schemes or
/// separators, invalid combinations, or non-positive values.
pub fn parse_config(text: &str) -> Result<HierarchyConfig> {
    let raw: RawConfig =
        serde_json::from_str(text).map_err(|e| Error::Configuration(e.to_string()))?;

    let levels: Vec<SplitConfig> = raw.hierarchy.into_iter().map(|l| l.partition).collect();
    for level in &levels {
        level.validate()?;
    }

    Ok(HierarchyConfig { levels })
}

/// Load a hierarchy configuration from a JSON file.
///
/// # Errors
/// As [`parse_config`], plus filesystem failures.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HierarchyConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Configuration(format!("read {}: {e}", path.display())))?;
    parse_config(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{Scheme, Separator};

    #[test]
    fn parses_levels_in_order() {
        let config = parse_config(
            r#"{
              "hierarchy": [
                { "partition": { "scheme": "temporal", "separator": "requests", "value": 1000 } },
                { "partition": { "scheme": "spatial", "separator": "contiguous", "value": 1 } }
              ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.levels.len(), 2);
        assert_eq!(
            config.levels[0],
            SplitConfig { scheme: Scheme::Temporal, separator: Separator::Requests, value: 1000 }
        );
        assert_eq!(config.levels[1].scheme, Scheme::Spatial);
    }

    #[test]
    fn unknown_separator_is_a_configuration_error() {
        let err = parse_config(
            r#"{ "hierarchy": [ { "partition": { "scheme": "temporal", "separator": "bogus", "value": 1 } } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn zero_value_is_a_configuration_error() {
        let err = parse_config(
            r#"{ "hierarchy": [ { "partition": { "scheme": "temporal", "separator": "cycles", "value": 0 } } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn mismatched_scheme_and_separator_is_rejected() {
        let err = parse_config(
            r#"{ "hierarchy": [ { "partition": { "scheme": "spatial", "separator": "cycles", "value": 4 } } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
