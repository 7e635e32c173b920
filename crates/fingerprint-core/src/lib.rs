// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Device fingerprint collection engine.
//!
//! [`Orchestrator`] runs the registered probes concurrently against a
//! [`DataSource`](fingerprint_api::DataSource), aggregates their outputs into a
//! [`CollectionReport`](fingerprint_api::CollectionReport) and derives the
//! fingerprint from the canonical form of that report.

pub mod canonical;
pub mod config;
pub mod host;
pub mod orchestrator;
pub mod probes;

pub use config::{ConfigError, FingerprintConfig, IntegrityConfig};
pub use host::HostDataSource;
pub use orchestrator::{run_probe_safely, Orchestrator};
pub use probes::{default_registry, ProbeContext, ProbeRegistry};
