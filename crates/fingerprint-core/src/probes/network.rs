// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{capability, DataSource, Fields, FieldsExt, Probe, ProbeError};

use super::NETWORK_INFO;

const WIFI_PREFIXES: [&str; 2] = ["wlan", "swlan"];
const CELLULAR_PREFIXES: [&str; 3] = ["rmnet", "ccmni", "radio"];

/// Interface inventory. Requires the network-state capability.
pub struct NetworkInfoProbe;

#[async_trait]
impl Probe for NetworkInfoProbe {
    fn name(&self) -> &str {
        NETWORK_INFO
    }

    fn required_capabilities(&self) -> Vec<String> {
        vec![capability::ACCESS_NETWORK_STATE.to_string()]
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        let mut names: Vec<String> = device
            .network_interfaces()?
            .into_iter()
            .map(|iface| iface.name)
            .collect();
        names.sort();
        names.dedup();

        let has = |prefixes: &[&str]| {
            names
                .iter()
                .any(|name| prefixes.iter().any(|p| name.starts_with(p)))
        };
        let mut transports = Vec::new();
        if has(&WIFI_PREFIXES[..]) {
            transports.push("wifi".to_string());
        }
        if has(&CELLULAR_PREFIXES[..]) {
            transports.push("cellular".to_string());
        }
        if has(&["eth"][..]) {
            transports.push("ethernet".to_string());
        }

        let mut fields = Fields::new();
        fields.put("interfaceCount", names.len());
        fields.put("interfaceNames", names);
        fields.put("transports", transports);
        Ok(fields)
    }
}
