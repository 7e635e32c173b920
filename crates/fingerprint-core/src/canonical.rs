// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Canonical serialization of collected probe outputs.
//!
//! The hashed form is the JSON of the probe map alone: probe names sorted,
//! keys inside every output sorted, no timestamp or timing fields.

use std::collections::BTreeMap;

use fingerprint_api::{CollectError, ProbeOutput};
use sha2::{Digest, Sha256};

/// Canonical document plus its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub json: String,
    pub fingerprint: String,
}

pub fn canonical_json(probes: &BTreeMap<String, ProbeOutput>) -> Result<String, CollectError> {
    Ok(serde_json::to_string(probes)?)
}

/// Lowercase hex SHA-256.
pub fn fingerprint(canonical: &str) -> String {
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Serialize, enforce the size cap, then hash.
pub fn encode(
    probes: &BTreeMap<String, ProbeOutput>,
    max_bytes: usize,
) -> Result<Canonical, CollectError> {
    let json = canonical_json(probes)?;
    if json.len() > max_bytes {
        return Err(CollectError::OversizedReport {
            size: json.len(),
            max: max_bytes,
        });
    }
    let fingerprint = fingerprint(&json);
    Ok(Canonical { json, fingerprint })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use fingerprint_api::{Fields, FieldsExt};
    use proptest::prelude::*;

    fn output(pairs: &[(&str, &str)]) -> ProbeOutput {
        let mut fields = Fields::new();
        for (k, v) in pairs {
            fields.put(k, *v);
        }
        ProbeOutput::Data(fields)
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut first = BTreeMap::new();
        first.insert("cpuInfo".to_string(), output(&[("b", "2"), ("a", "1")]));
        first.insert("buildInfo".to_string(), ProbeOutput::timed_out());

        let mut second = BTreeMap::new();
        second.insert("buildInfo".to_string(), ProbeOutput::timed_out());
        second.insert("cpuInfo".to_string(), output(&[("a", "1"), ("b", "2")]));

        let a = encode(&first, usize::MAX).unwrap();
        let b = encode(&second, usize::MAX).unwrap();
        assert_eq!(a, b);
        assert!(a.json.starts_with(r#"{"buildInfo":"#));
        assert_eq!(a.fingerprint.len(), 64);
        assert!(a.fingerprint.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_value_change_changes_fingerprint() {
        let mut probes = BTreeMap::new();
        probes.insert("buildInfo".to_string(), output(&[("model", "Pixel 8")]));
        let before = encode(&probes, usize::MAX).unwrap();
        probes.insert("buildInfo".to_string(), output(&[("model", "Pixel 9")]));
        let after = encode(&probes, usize::MAX).unwrap();
        assert_ne!(before.fingerprint, after.fingerprint);
    }

    #[test]
    fn test_size_cap() {
        let mut probes = BTreeMap::new();
        let big = "x".repeat(200);
        probes.insert("blob".to_string(), output(&[("data", big.as_str())]));
        assert_matches!(
            encode(&probes, 100),
            Err(CollectError::OversizedReport { max: 100, .. })
        );
    }

    #[test]
    fn test_known_fingerprint() {
        assert_eq!(
            fingerprint("{}"),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    proptest! {
        #[test]
        fn prop_field_insertion_order_is_irrelevant(
            pairs in proptest::collection::btree_map("[a-z]{1,8}", "[ -~]{0,16}", 0..12)
        ) {
            let mut forward = Fields::new();
            for (k, v) in pairs.iter() {
                forward.put(k, v.as_str());
            }
            let mut backward = Fields::new();
            for (k, v) in pairs.iter().rev() {
                backward.put(k, v.as_str());
            }
            let mut a = BTreeMap::new();
            a.insert("p".to_string(), ProbeOutput::Data(forward));
            let mut b = BTreeMap::new();
            b.insert("p".to_string(), ProbeOutput::Data(backward));
            prop_assert_eq!(
                encode(&a, usize::MAX).unwrap().fingerprint,
                encode(&b, usize::MAX).unwrap().fingerprint
            );
        }
    }
}
