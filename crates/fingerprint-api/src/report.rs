// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::output::ProbeOutput;

/// Aggregate of every probe output from one collection call.
///
/// Serialises as a flat document: one top-level key per probe plus
/// `fingerprint`, `success`, `error`, `collectionTimeMs` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    #[serde(flatten)]
    pub probes: BTreeMap<String, ProbeOutput>,
    pub fingerprint: String,
    pub success: bool,
    pub error: Option<String>,
    pub collection_time_ms: u64,
    pub timestamp: i64,
}

impl CollectionReport {
    /// Minimal failure report. Carries no probe data.
    pub fn failed(error: impl Display, collection_time_ms: u64) -> Self {
        Self {
            probes: BTreeMap::new(),
            fingerprint: String::new(),
            success: false,
            error: Some(error.to_string()),
            collection_time_ms,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn probe(&self, name: &str) -> Option<&ProbeOutput> {
        self.probes.get(name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
