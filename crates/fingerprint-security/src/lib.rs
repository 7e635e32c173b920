// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Detection and self-protection for the fingerprinting engine.
//!
//! - [`manifest`]: literal manifest format and cipher, shared with the build script
//! - [`string_table`]: XOR-obfuscated literal storage
//! - [`literals`]: the tables embedded at build time, decoded per category
//! - [`heuristics`]: weighted-indicator scoring, emulator and root batteries
//! - [`signal_bus`]: short-lived cache shared between heuristic probes
//! - [`integrity`]: payload hash verification against the build baseline

pub mod heuristics;
pub mod integrity;
pub mod literals;
pub mod manifest;
pub mod signal_bus;
pub mod string_table;

pub use heuristics::emulator::{EmulatorAssessment, EmulatorDetector};
pub use heuristics::gpu::GpuAssessment;
pub use heuristics::root::{RootAssessment, RootDetector};
pub use heuristics::{record_indicator, Indicator, IndicatorSet, Verdict, VerdictRule};
pub use integrity::{DirectoryPayload, IntegrityError, IntegrityVerifier, PayloadHasher};
pub use literals::{EmulatorLiterals, GpuPatterns, RootLiterals, StringDecoder};
pub use signal_bus::{
    Clock, GpuSignals, HeuristicBus, ManualClock, SensorSignals, SignalBus, SystemClock,
};
pub use string_table::{ObfuscatedEntry, StringTable, TableError};
