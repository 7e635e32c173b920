// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Native data source.
//!
//! Reads what an unprivileged native process can see directly: property
//! files, `/proc` and `/sys`. Facts that only the platform runtime exposes
//! (sensors, GPU strings, battery, telephony, package manager) are reported
//! as capability-denied so the heuristics skip them.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::PathBuf;

use fingerprint_api::{
    capability, BatteryTelemetry, BuildFacts, DataSource, GpuSnapshot, NetworkInterface,
    SensorActivity, SensorInfo, SourceError, SourceResult, StorageStats,
};
use once_cell::sync::OnceCell;
use tracing::debug;

/// Property files in lookup order. The first definition of a key wins.
const PROPERTY_FILES: [&str; 4] = [
    "/default.prop",
    "/system/build.prop",
    "/vendor/build.prop",
    "/product/build.prop",
];

const PROC_STATUS: &str = "/proc/self/status";
const PROC_CPUINFO: &str = "/proc/cpuinfo";
const PROC_MEMINFO: &str = "/proc/meminfo";
const SELINUX_ENFORCE: &str = "/sys/fs/selinux/enforce";
const SYS_NET: &str = "/sys/class/net";

pub struct HostDataSource {
    root: PathBuf,
    capabilities: BTreeSet<String>,
    properties: OnceCell<HashMap<String, String>>,
}

impl HostDataSource {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Resolve every absolute path below `root`. Used for captured device
    /// trees and tests.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            capabilities: [capability::ACCESS_NETWORK_STATE.to_string()]
                .into_iter()
                .collect(),
            properties: OnceCell::new(),
        }
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capabilities.insert(capability.to_string());
        self
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn read(&self, path: &str) -> SourceResult<String> {
        fs::read_to_string(self.resolve(path)).map_err(|err| io_error(path, err))
    }

    fn properties(&self) -> &HashMap<String, String> {
        self.properties.get_or_init(|| {
            let mut props = HashMap::new();
            for file in PROPERTY_FILES {
                let Ok(content) = self.read(file) else {
                    continue;
                };
                for (key, value) in parse_properties(&content) {
                    props.entry(key.to_string()).or_insert_with(|| value.to_string());
                }
            }
            debug!(count = props.len(), "system properties loaded");
            props
        })
    }

    fn property(&self, key: &str) -> String {
        self.properties().get(key).cloned().unwrap_or_default()
    }
}

impl Default for HostDataSource {
    fn default() -> Self {
        Self::new()
    }
}

fn io_error(path: &str, err: io::Error) -> SourceError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => SourceError::CapabilityDenied(path.to_string()),
        _ => SourceError::Unavailable(format!("{path}: {err}")),
    }
}

fn platform_only<T>(fact: &str) -> SourceResult<T> {
    Err(SourceError::CapabilityDenied(fact.to_string()))
}

/// `key=value` lines, comments and blanks skipped.
pub fn parse_properties(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some((key.trim(), value.trim()))
    })
}

/// `TracerPid:` value from a `/proc/<pid>/status` document.
pub fn parse_tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse().ok())
}

/// `MemTotal:` from a `/proc/meminfo` document, in bytes.
pub fn parse_mem_total(meminfo: &str) -> Option<u64> {
    let value = meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))?;
    let kib: u64 = value.trim().trim_end_matches("kB").trim().parse().ok()?;
    kib.checked_mul(1024)
}

impl DataSource for HostDataSource {
    fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    fn file_exists(&self, path: &str) -> SourceResult<bool> {
        let resolved = self.resolve(path);
        match fs::symlink_metadata(&resolved) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            // an unreadable parent still means something is there
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => Ok(resolved.exists()),
            Err(err) => Err(io_error(path, err)),
        }
    }

    fn system_property(&self, key: &str) -> SourceResult<String> {
        Ok(self.property(key))
    }

    fn read_text(&self, path: &str) -> SourceResult<String> {
        self.read(path)
    }

    fn build_facts(&self) -> SourceResult<BuildFacts> {
        if self.properties().is_empty() {
            return Err(SourceError::Unavailable("build properties".to_string()));
        }
        let abis = self.property("ro.product.cpu.abilist");
        Ok(BuildFacts {
            board: self.property("ro.product.board"),
            bootloader: self.property("ro.bootloader"),
            brand: self.property("ro.product.brand"),
            device: self.property("ro.product.device"),
            display: self.property("ro.build.display.id"),
            fingerprint: self.property("ro.build.fingerprint"),
            hardware: self.property("ro.hardware"),
            host: self.property("ro.build.host"),
            manufacturer: self.property("ro.product.manufacturer"),
            model: self.property("ro.product.model"),
            product: self.property("ro.product.name"),
            tags: self.property("ro.build.tags"),
            build_type: self.property("ro.build.type"),
            supported_abis: abis
                .split(',')
                .map(str::trim)
                .filter(|abi| !abi.is_empty())
                .map(str::to_string)
                .collect(),
            sdk_int: self.property("ro.build.version.sdk").parse().unwrap_or(0),
        })
    }

    fn network_interfaces(&self) -> SourceResult<Vec<NetworkInterface>> {
        let dir = fs::read_dir(self.resolve(SYS_NET)).map_err(|err| io_error(SYS_NET, err))?;
        let mut interfaces = Vec::new();
        for entry in dir.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let mac = fs::read_to_string(entry.path().join("address"))
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_default();
            interfaces.push(NetworkInterface { name, mac });
        }
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(interfaces)
    }

    fn sensors(&self) -> SourceResult<Vec<SensorInfo>> {
        platform_only("sensor list")
    }

    fn sensor_activity(&self, _window_ms: u64) -> SourceResult<SensorActivity> {
        platform_only("sensor sampling")
    }

    fn gpu_snapshot(&self) -> SourceResult<GpuSnapshot> {
        platform_only("gpu strings")
    }

    fn battery(&self) -> SourceResult<BatteryTelemetry> {
        platform_only("battery telemetry")
    }

    fn imei(&self) -> SourceResult<Option<String>> {
        platform_only(capability::READ_PHONE_STATE)
    }

    fn package_installed(&self, _package: &str) -> SourceResult<bool> {
        platform_only("package manager")
    }

    fn env_var(&self, name: &str) -> SourceResult<Option<String>> {
        Ok(std::env::var_os(name).map(|value| value.to_string_lossy().into_owned()))
    }

    fn tracer_pid(&self) -> SourceResult<u32> {
        let status = self.read(PROC_STATUS)?;
        parse_tracer_pid(&status)
            .ok_or_else(|| SourceError::Unavailable(format!("{PROC_STATUS}: no TracerPid")))
    }

    fn debugger_connected(&self) -> SourceResult<bool> {
        platform_only("debugger state")
    }

    fn neon_probe(&self) -> SourceResult<bool> {
        if cfg!(target_arch = "aarch64") {
            return Ok(true);
        }
        let cpuinfo = self.read(PROC_CPUINFO)?;
        Ok(cpuinfo
            .lines()
            .filter(|line| line.starts_with("Features"))
            .any(|line| line.split_whitespace().any(|f| f == "neon" || f == "asimd")))
    }

    /// Memory only; filesystem totals need the platform storage service.
    fn storage_stats(&self) -> SourceResult<StorageStats> {
        let meminfo = self.read(PROC_MEMINFO)?;
        Ok(StorageStats {
            ram_total_bytes: parse_mem_total(&meminfo),
            ..StorageStats::default()
        })
    }

    fn selinux_enforcing(&self) -> SourceResult<Option<bool>> {
        match self.read(SELINUX_ENFORCE) {
            Ok(value) => Ok(match value.trim() {
                "1" => Some(true),
                "0" => Some(false),
                _ => None,
            }),
            Err(SourceError::Unavailable(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
