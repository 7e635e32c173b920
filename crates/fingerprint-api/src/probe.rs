// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::source::DataSource;
use crate::value::Fields;

/// A named unit of collection work.
///
/// Probes must not catch their own failures: returning `Err` (or panicking)
/// is converted into a structured error output by the orchestrator.
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;

    fn required_capabilities(&self) -> Vec<String> {
        Vec::new()
    }

    fn supported(&self, _device: &dyn DataSource) -> bool {
        true
    }

    fn has_capabilities(&self, device: &dyn DataSource) -> bool {
        self.required_capabilities()
            .iter()
            .all(|capability| device.has_capability(capability))
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError>;
}

/// Registry introspection entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeInfo {
    pub name: String,
    pub required_capabilities: Vec<String>,
    pub supported: bool,
}
