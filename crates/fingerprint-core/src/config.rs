// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Engine configuration, loaded from TOML.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// Directory holding the executable payload. Defaults to the directory
    /// of the running executable.
    pub payload_dir: Option<PathBuf>,
    pub extensions: Vec<String>,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            payload_dir: None,
            extensions: vec!["so".to_string(), "dex".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// When false `collect_default` waits for every probe without a deadline.
    pub enable_timeout: bool,
    pub default_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub emulator_detection_timeout_ms: u64,
    pub root_detection_timeout_ms: u64,
    pub max_report_bytes: usize,
    pub disabled_probes: Vec<String>,
    pub signal_max_age_ms: u64,
    pub integrity: IntegrityConfig,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            enable_timeout: true,
            default_timeout_ms: 10_000,
            probe_timeout_ms: 3_000,
            emulator_detection_timeout_ms: 150,
            root_detection_timeout_ms: 2_000,
            max_report_bytes: 1024 * 1024,
            disabled_probes: Vec::new(),
            signal_max_age_ms: 10_000,
            integrity: IntegrityConfig::default(),
        }
    }
}

impl FingerprintConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Overall deadline for `collect_default`, `None` when disabled.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.enable_timeout
            .then(|| Duration::from_millis(self.default_timeout_ms))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn emulator_budget(&self) -> Duration {
        Duration::from_millis(self.emulator_detection_timeout_ms)
    }

    pub fn root_budget(&self) -> Duration {
        Duration::from_millis(self.root_detection_timeout_ms)
    }

    pub fn signal_max_age(&self) -> Duration {
        Duration::from_millis(self.signal_max_age_ms)
    }

    pub fn is_disabled(&self, probe: &str) -> bool {
        self.disabled_probes.iter().any(|name| name == probe)
    }
}
