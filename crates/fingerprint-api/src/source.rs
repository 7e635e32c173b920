// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Probe data source capability.
//!
//! Every platform signal the engine consumes is read through [`DataSource`].
//! Each call either returns the fact or a [`SourceError`]; a
//! `CapabilityDenied` result means "skip this fact".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceResult};

/// Capability names used by the built-in probes.
pub mod capability {
    pub const ACCESS_NETWORK_STATE: &str = "android.permission.ACCESS_NETWORK_STATE";
    pub const READ_PHONE_STATE: &str = "android.permission.READ_PHONE_STATE";
    pub const READ_GSERVICES: &str = "com.google.android.providers.gsf.permission.READ_GSERVICES";
}

/// Android sensor type ids used by the sensor heuristics.
pub mod sensor_type {
    pub const ACCELEROMETER: i32 = 1;
    pub const MAGNETIC_FIELD: i32 = 2;
    pub const GYROSCOPE: i32 = 4;
}

/// Static build identity (Android `Build.*`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildFacts {
    pub board: String,
    pub bootloader: String,
    pub brand: String,
    pub device: String,
    pub display: String,
    pub fingerprint: String,
    pub hardware: String,
    pub host: String,
    pub manufacturer: String,
    pub model: String,
    pub product: String,
    pub tags: String,
    pub build_type: String,
    pub supported_abis: Vec<String>,
    pub sdk_int: u32,
}

impl BuildFacts {
    /// Lowercased, space-joined identity string matched against device tokens.
    pub fn descriptor(&self) -> String {
        [
            &self.fingerprint,
            &self.hardware,
            &self.model,
            &self.manufacturer,
            &self.brand,
            &self.device,
            &self.product,
            &self.board,
        ]
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }

    pub fn primary_abi(&self) -> &str {
        self.supported_abis.first().map(String::as_str).unwrap_or("")
    }

    pub fn has_arm_abi(&self) -> bool {
        self.supported_abis
            .iter()
            .any(|abi| abi.to_lowercase().contains("arm"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub mac: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorInfo {
    pub name: String,
    pub vendor: String,
    pub sensor_type: i32,
}

/// Result of sampling sensors for a short window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorActivity {
    pub sampled: u32,
    pub varying: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GpuSnapshot {
    pub renderer: String,
    pub vendor: String,
    pub version: String,
    pub egl_vendor: String,
    pub extensions: Vec<String>,
    pub max_texture_size: u32,
    pub compute_invocations: u32,
    pub vulkan_supported: bool,
    pub micro_benchmark_ms: f64,
    pub total_ram_mb: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatteryTelemetry {
    pub current_samples: Vec<i32>,
    pub charge_counter: Option<i32>,
}

/// Secure android id plus the global settings table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceSettings {
    pub android_id: Option<String>,
    /// Raw values by setting name. Unset settings are absent.
    pub global: BTreeMap<String, String>,
}

/// Physical display attached to the default screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayPanel {
    pub refresh_rate: f64,
    pub flags: u32,
    pub is_hdr: bool,
    pub is_wide_color_gamut: bool,
    pub hdr_max_luminance: Option<f64>,
    pub hdr_min_luminance: Option<f64>,
    /// One entry per display mode, unordered and possibly repeated.
    pub mode_refresh_rates: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayMetrics {
    pub width_pixels: u32,
    pub height_pixels: u32,
    pub density: f64,
    pub density_dpi: u32,
    pub xdpi: f64,
    pub ydpi: f64,
    /// Maximum window bounds, when the platform reports them.
    pub real_width_pixels: Option<u32>,
    pub real_height_pixels: Option<u32>,
    pub screen_width_dp: u32,
    pub screen_height_dp: u32,
    pub smallest_screen_width_dp: u32,
    pub density_dpi_config: u32,
    pub font_scale: f64,
    pub ui_mode_night: u32,
    pub locales: Vec<String>,
    pub panel: Option<DisplayPanel>,
}

/// Storage and memory totals. `None` marks a figure the host could not read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageStats {
    pub storage_total_bytes: Option<u64>,
    pub ram_total_bytes: Option<u64>,
    pub ram_threshold_bytes: Option<u64>,
}

fn platform_only<T>(fact: &str) -> SourceResult<T> {
    Err(SourceError::CapabilityDenied(fact.to_string()))
}

/// Narrow interface to the platform. Implementations must be cheap to call
/// from blocking worker threads.
pub trait DataSource: Send + Sync {
    fn has_capability(&self, capability: &str) -> bool;

    fn file_exists(&self, path: &str) -> SourceResult<bool>;

    /// Empty string when the property is unset, like `getprop`.
    fn system_property(&self, key: &str) -> SourceResult<String>;

    /// Whole-file read of a pseudo file such as `/proc/cpuinfo`.
    fn read_text(&self, path: &str) -> SourceResult<String>;

    fn build_facts(&self) -> SourceResult<BuildFacts>;

    fn network_interfaces(&self) -> SourceResult<Vec<NetworkInterface>>;

    fn sensors(&self) -> SourceResult<Vec<SensorInfo>>;

    fn sensor_activity(&self, window_ms: u64) -> SourceResult<SensorActivity>;

    fn gpu_snapshot(&self) -> SourceResult<GpuSnapshot>;

    fn battery(&self) -> SourceResult<BatteryTelemetry>;

    /// `Ok(None)` when the device has no IMEI.
    fn imei(&self) -> SourceResult<Option<String>>;

    fn package_installed(&self, package: &str) -> SourceResult<bool>;

    fn env_var(&self, name: &str) -> SourceResult<Option<String>>;

    fn tracer_pid(&self) -> SourceResult<u32>;

    fn debugger_connected(&self) -> SourceResult<bool>;

    /// SIMD self-test; `true` when NEON instructions execute correctly.
    fn neon_probe(&self) -> SourceResult<bool>;

    /// `Some(true)` enforcing, `Some(false)` permissive, `None` unknown.
    fn selinux_enforcing(&self) -> SourceResult<Option<bool>>;

    fn device_settings(&self) -> SourceResult<DeviceSettings> {
        platform_only("device settings")
    }

    fn display_metrics(&self) -> SourceResult<DisplayMetrics> {
        platform_only("display metrics")
    }

    fn storage_stats(&self) -> SourceResult<StorageStats> {
        platform_only("storage stats")
    }

    /// Whether the Google services settings provider is installed.
    fn gservices_available(&self) -> bool {
        false
    }

    /// Raw services id from the gservices provider; `Ok(None)` when it has
    /// no row for the device.
    fn gsf_id(&self) -> SourceResult<Option<String>> {
        platform_only("gservices provider")
    }

    /// Widevine `deviceUniqueId` property bytes.
    fn drm_device_id(&self) -> SourceResult<Vec<u8>> {
        platform_only("media drm")
    }
}
