// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! In-memory data source.
//!
//! Replays a captured set of device facts (for example a JSON capture taken
//! on a real device) through the engine. Facts left as `None` behave as if the
//! host withheld them.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceResult};
use crate::source::{
    capability, BatteryTelemetry, BuildFacts, DataSource, DeviceSettings, DisplayMetrics,
    GpuSnapshot, NetworkInterface, SensorActivity, SensorInfo, StorageStats,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticSource {
    pub capabilities: BTreeSet<String>,
    pub files: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
    pub texts: BTreeMap<String, String>,
    pub build: BuildFacts,
    pub interfaces: Option<Vec<NetworkInterface>>,
    pub sensors: Option<Vec<SensorInfo>>,
    pub sensor_activity: Option<SensorActivity>,
    /// Block for the requested window in `sensor_activity`, like a device
    /// that actually samples.
    pub realtime_sampling: bool,
    pub gpu: Option<GpuSnapshot>,
    pub battery: Option<BatteryTelemetry>,
    pub imei: Option<String>,
    pub packages: BTreeSet<String>,
    pub env: BTreeMap<String, String>,
    pub tracer_pid: u32,
    pub debugger_connected: bool,
    pub neon_supported: Option<bool>,
    pub selinux_enforcing: Option<bool>,
    pub settings: Option<DeviceSettings>,
    pub display: Option<DisplayMetrics>,
    pub storage: Option<StorageStats>,
    /// Gservices provider row; `None` means the provider is not installed
    /// and an empty string means it has no id.
    pub gsf_id: Option<String>,
    pub drm_id: Option<Vec<u8>>,
}

impl StaticSource {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capabilities.insert(capability.to_string());
        self
    }

    pub fn with_file(mut self, path: &str) -> Self {
        self.files.insert(path.to_string());
        self
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }
}

fn withheld<T>(fact: &str) -> SourceResult<T> {
    Err(SourceError::CapabilityDenied(fact.to_string()))
}

impl DataSource for StaticSource {
    fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    fn file_exists(&self, path: &str) -> SourceResult<bool> {
        Ok(self.files.contains(path))
    }

    fn system_property(&self, key: &str) -> SourceResult<String> {
        Ok(self.properties.get(key).cloned().unwrap_or_default())
    }

    fn read_text(&self, path: &str) -> SourceResult<String> {
        self.texts
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::Unavailable(path.to_string()))
    }

    fn build_facts(&self) -> SourceResult<BuildFacts> {
        Ok(self.build.clone())
    }

    fn network_interfaces(&self) -> SourceResult<Vec<NetworkInterface>> {
        match &self.interfaces {
            Some(interfaces) => Ok(interfaces.clone()),
            None => withheld("network interfaces"),
        }
    }

    fn sensors(&self) -> SourceResult<Vec<SensorInfo>> {
        match &self.sensors {
            Some(sensors) => Ok(sensors.clone()),
            None => withheld("sensor list"),
        }
    }

    fn sensor_activity(&self, window_ms: u64) -> SourceResult<SensorActivity> {
        let Some(activity) = self.sensor_activity else {
            return withheld("sensor sampling");
        };
        if self.realtime_sampling {
            std::thread::sleep(Duration::from_millis(window_ms));
        }
        Ok(activity)
    }

    fn gpu_snapshot(&self) -> SourceResult<GpuSnapshot> {
        match &self.gpu {
            Some(gpu) => Ok(gpu.clone()),
            None => withheld("gpu strings"),
        }
    }

    fn battery(&self) -> SourceResult<BatteryTelemetry> {
        match &self.battery {
            Some(battery) => Ok(battery.clone()),
            None => withheld("battery telemetry"),
        }
    }

    fn imei(&self) -> SourceResult<Option<String>> {
        if !self.has_capability(capability::READ_PHONE_STATE) {
            return withheld(capability::READ_PHONE_STATE);
        }
        Ok(self.imei.clone())
    }

    fn package_installed(&self, package: &str) -> SourceResult<bool> {
        Ok(self.packages.contains(package))
    }

    fn env_var(&self, name: &str) -> SourceResult<Option<String>> {
        Ok(self.env.get(name).cloned())
    }

    fn tracer_pid(&self) -> SourceResult<u32> {
        Ok(self.tracer_pid)
    }

    fn debugger_connected(&self) -> SourceResult<bool> {
        Ok(self.debugger_connected)
    }

    fn neon_probe(&self) -> SourceResult<bool> {
        self.neon_supported
            .ok_or_else(|| SourceError::Unavailable("neon probe".to_string()))
    }

    fn selinux_enforcing(&self) -> SourceResult<Option<bool>> {
        Ok(self.selinux_enforcing)
    }

    fn device_settings(&self) -> SourceResult<DeviceSettings> {
        self.settings.clone().map_or_else(|| withheld("device settings"), Ok)
    }

    fn display_metrics(&self) -> SourceResult<DisplayMetrics> {
        self.display.clone().map_or_else(|| withheld("display metrics"), Ok)
    }

    fn storage_stats(&self) -> SourceResult<StorageStats> {
        self.storage.map_or_else(|| withheld("storage stats"), Ok)
    }

    fn gservices_available(&self) -> bool {
        self.gsf_id.is_some()
    }

    fn gsf_id(&self) -> SourceResult<Option<String>> {
        if !self.has_capability(capability::READ_GSERVICES) {
            return withheld(capability::READ_GSERVICES);
        }
        match &self.gsf_id {
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => Ok(Some(raw.clone())),
            None => Err(SourceError::Unavailable("gservices provider".to_string())),
        }
    }

    fn drm_device_id(&self) -> SourceResult<Vec<u8>> {
        self.drm_id
            .clone()
            .ok_or_else(|| SourceError::Unavailable("widevine".to_string()))
    }
}
