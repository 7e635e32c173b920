// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use thiserror::Error;

/// Failure of a single data source call.
///
/// `CapabilityDenied` means the host withheld the fact (missing permission);
/// callers treat it as "skip this fact", never as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("capability denied: {0}")]
    CapabilityDenied(String),

    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    pub fn is_capability_denied(&self) -> bool {
        matches!(self, SourceError::CapabilityDenied(_))
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Error returned by a probe's `run`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Permission denied: {0}")]
    CapabilityDenied(String),

    #[error("{0}")]
    Failed(String),
}

impl ProbeError {
    pub fn is_permission_error(&self) -> bool {
        matches!(self, ProbeError::CapabilityDenied(_))
    }
}

impl From<SourceError> for ProbeError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::CapabilityDenied(what) => ProbeError::CapabilityDenied(what),
            SourceError::Unavailable(what) => ProbeError::Failed(format!("unavailable: {what}")),
        }
    }
}

/// Failures of a whole collection call. Per-probe failures never end up here.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("collection timed out after {timeout_ms}ms")]
    OverallTimeout { timeout_ms: u64 },

    #[error("Fingerprint data too large: {size} bytes (max: {max} bytes)")]
    OversizedReport { size: usize, max: usize },

    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("probe name must not be empty")]
    EmptyName,
}
