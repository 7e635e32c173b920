// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{DataSource, Fields, FieldsExt, Probe, ProbeError};

use super::{optional, CPU_INFO};

const CPUINFO: &str = "/proc/cpuinfo";
const MAX_FREQ: &str = "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq";

/// Processor identity parsed from `/proc/cpuinfo`.
pub struct CpuInfoProbe;

#[async_trait]
impl Probe for CpuInfoProbe {
    fn name(&self) -> &str {
        CPU_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        let text = device.read_text(CPUINFO)?;
        let mut fields = parse_cpuinfo(&text);

        // frequency is not exposed on every kernel
        let max_freq = device
            .read_text(MAX_FREQ)
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok());
        fields.put("maxFrequencyKhz", max_freq);

        let abi = optional(device.build_facts())?.map(|b| b.primary_abi().to_string());
        fields.put("primaryAbi", abi);
        Ok(fields)
    }
}

/// Extract the stable identity fields. Per-core values such as BogoMIPS are
/// left out so the output does not change between boots.
pub fn parse_cpuinfo(text: &str) -> Fields {
    let mut cores = 0usize;
    let mut hardware = None;
    let mut model_name = None;
    let mut vendor = None;
    let mut implementers = BTreeSet::new();
    let mut parts = BTreeSet::new();
    let mut features = BTreeSet::new();

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "processor" => cores += 1,
            "Hardware" => hardware = Some(value.to_string()),
            "model name" | "Processor" => model_name = Some(value.to_string()),
            "vendor_id" => vendor = Some(value.to_string()),
            "CPU implementer" => {
                implementers.insert(value.to_string());
            }
            "CPU part" => {
                parts.insert(value.to_string());
            }
            "Features" | "flags" => {
                features.extend(value.split_whitespace().map(str::to_string));
            }
            _ => {}
        }
    }

    let mut fields = Fields::new();
    fields.put("cores", cores);
    fields.put("hardware", hardware);
    fields.put("modelName", model_name);
    fields.put("vendorId", vendor);
    fields.put("implementers", implementers.into_iter().collect::<Vec<_>>());
    fields.put("parts", parts.into_iter().collect::<Vec<_>>());
    fields.put("features", features.into_iter().collect::<Vec<_>>());
    fields
}
