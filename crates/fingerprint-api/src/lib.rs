// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Shared data model for the device fingerprinting engine.
//!
//! Probes, the report they aggregate into, the data source capability that
//! probes read platform facts through, and the error taxonomy shared by the
//! security and core crates.

pub mod error;
pub mod fixture;
pub mod output;
pub mod probe;
pub mod report;
pub mod source;
pub mod value;

pub use error::{CollectError, ProbeError, RegistryError, SourceError, SourceResult};
pub use fixture::StaticSource;
pub use output::{ProbeFailure, ProbeOutput};
pub use probe::{Probe, ProbeInfo};
pub use report::CollectionReport;
pub use source::{
    capability, sensor_type, BatteryTelemetry, BuildFacts, DataSource, DeviceSettings,
    DisplayMetrics, DisplayPanel, GpuSnapshot, NetworkInterface, SensorActivity, SensorInfo,
    StorageStats,
};
pub use value::{Fields, FieldsExt, Value};
