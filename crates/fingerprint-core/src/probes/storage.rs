// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{DataSource, Fields, FieldsExt, Probe, ProbeError, StorageStats};

use super::STORAGE_INFO;

const STORAGE_UNAVAILABLE: &str = "directoryUnavailable";
const RAM_UNAVAILABLE: &str = "activityManagerUnavailable";

/// Data partition and memory totals. A missing figure is reported as an
/// error field rather than failing the probe.
pub struct StorageInfoProbe;

#[async_trait]
impl Probe for StorageInfoProbe {
    fn name(&self) -> &str {
        STORAGE_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        Ok(storage_fields(&device.storage_stats()?))
    }
}

pub fn storage_fields(stats: &StorageStats) -> Fields {
    let mut fields = Fields::new();
    match stats.storage_total_bytes {
        Some(total) => fields.put("storageTotalBytes", total),
        None => fields.put("storageError", STORAGE_UNAVAILABLE),
    }
    match stats.ram_total_bytes {
        Some(total) => {
            fields.put("ramTotalBytes", total);
            if let Some(threshold) = stats.ram_threshold_bytes {
                fields.put("ramThresholdBytes", threshold);
            }
        }
        None => fields.put("ramError", RAM_UNAVAILABLE),
    }
    fields
}
