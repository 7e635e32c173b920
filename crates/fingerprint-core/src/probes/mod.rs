// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Built-in probe catalogue.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use fingerprint_api::{Probe, ProbeError, SourceResult};
use fingerprint_security::{
    DirectoryPayload, EmulatorLiterals, GpuPatterns, HeuristicBus, IntegrityVerifier,
    RootLiterals,
};

use crate::config::FingerprintConfig;

pub mod build;
pub mod cpu;
pub mod debug;
pub mod device;
pub mod display;
pub mod emulator;
pub mod gpu;
pub mod gsf;
pub mod media_drm;
pub mod network;
pub mod root;
pub mod sensors;
pub mod storage;

pub use build::BuildInfoProbe;
pub use cpu::CpuInfoProbe;
pub use debug::DebugInfoProbe;
pub use device::DeviceInfoProbe;
pub use display::DisplayInfoProbe;
pub use emulator::EmulatorInfoProbe;
pub use gpu::GpuInfoProbe;
pub use gsf::GsfInfoProbe;
pub use media_drm::MediaDrmInfoProbe;
pub use network::NetworkInfoProbe;
pub use root::RootInfoProbe;
pub use sensors::SensorInfoProbe;
pub use storage::StorageInfoProbe;

pub const BUILD_INFO: &str = "buildInfo";
pub const DEVICE_INFO: &str = "deviceInfo";
pub const DISPLAY_INFO: &str = "displayInfo";
pub const STORAGE_INFO: &str = "storageInfo";
pub const GSF_INFO: &str = "gsfInfo";
pub const MEDIA_DRM_INFO: &str = "mediaDrmInfo";
pub const DEBUG_INFO: &str = "debugInfo";
pub const CPU_INFO: &str = "cpuInfo";
pub const NETWORK_INFO: &str = "networkInfo";
pub const SENSOR_INFO: &str = "sensorInfo";
pub const GPU_INFO: &str = "gpuInfo";
pub const EMULATOR_INFO: &str = "emulatorInfo";
pub const ROOT_INFO: &str = "rootInfo";

pub type ProbeRegistry = HashMap<String, Arc<dyn Probe>>;

/// Collaborators shared by the heuristic probes of one engine instance.
#[derive(Clone)]
pub struct ProbeContext {
    pub config: Arc<FingerprintConfig>,
    pub bus: Arc<HeuristicBus>,
    pub integrity: Option<Arc<IntegrityVerifier>>,
    pub emulator_literals: Arc<EmulatorLiterals>,
    pub root_literals: Arc<RootLiterals>,
    pub gpu_patterns: Arc<GpuPatterns>,
}

impl ProbeContext {
    /// Context backed by the embedded string tables and the build-time
    /// integrity baseline.
    pub fn new(config: FingerprintConfig) -> Self {
        let payload = DirectoryPayload::new(
            payload_dir(&config),
            config.integrity.extensions.clone(),
        );
        Self {
            config: Arc::new(config),
            bus: Arc::new(HeuristicBus::new()),
            integrity: Some(Arc::new(IntegrityVerifier::embedded(Box::new(payload)))),
            emulator_literals: Arc::new(EmulatorLiterals::embedded()),
            root_literals: Arc::new(RootLiterals::embedded()),
            gpu_patterns: Arc::new(GpuPatterns::embedded()),
        }
    }

    pub fn with_integrity(mut self, verifier: Option<Arc<IntegrityVerifier>>) -> Self {
        self.integrity = verifier;
        self
    }

    pub fn with_bus(mut self, bus: Arc<HeuristicBus>) -> Self {
        self.bus = bus;
        self
    }
}

impl Default for ProbeContext {
    fn default() -> Self {
        Self::new(FingerprintConfig::default())
    }
}

fn payload_dir(config: &FingerprintConfig) -> PathBuf {
    config
        .integrity
        .payload_dir
        .clone()
        .or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default catalogue minus the probes disabled in the configuration.
pub fn default_registry(ctx: &ProbeContext) -> ProbeRegistry {
    let probes: Vec<Arc<dyn Probe>> = vec![
        Arc::new(BuildInfoProbe),
        Arc::new(DeviceInfoProbe),
        Arc::new(DisplayInfoProbe),
        Arc::new(DebugInfoProbe),
        Arc::new(RootInfoProbe::new(ctx)),
        Arc::new(EmulatorInfoProbe::new(ctx)),
        Arc::new(GpuInfoProbe::new(ctx)),
        Arc::new(CpuInfoProbe),
        Arc::new(StorageInfoProbe),
        Arc::new(SensorInfoProbe::new(ctx)),
        Arc::new(NetworkInfoProbe),
        Arc::new(GsfInfoProbe),
        Arc::new(MediaDrmInfoProbe),
    ];
    probes
        .into_iter()
        .filter(|probe| !ctx.config.is_disabled(probe.name()))
        .map(|probe| (probe.name().to_string(), probe))
        .collect()
}

/// Capability-denied reads become `None`, anything else propagates.
pub(crate) fn optional<T>(result: SourceResult<T>) -> Result<Option<T>, ProbeError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_capability_denied() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Two-decimal rounding used for reported confidence values.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
