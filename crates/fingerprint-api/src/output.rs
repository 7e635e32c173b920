// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;
use crate::value::Fields;

pub const MISSING_PERMISSIONS: &str = "Missing required permissions";
pub const PROBE_TIMED_OUT: &str = "Collection timed out";
pub const PROBE_UNSUPPORTED: &str = "Probe not supported on this device";

/// Error marker stored in place of a probe's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeFailure {
    pub error: String,
    pub permission_required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported: Option<bool>,
}

/// Result of one probe invocation. Immutable once produced.
///
/// Serialised untagged: an error output is a map carrying `error` and
/// `permissionRequired`, a data output is the probe's own field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeOutput {
    Error(ProbeFailure),
    Data(Fields),
}

impl ProbeOutput {
    pub fn failed(error: impl Into<String>, permission_required: bool) -> Self {
        ProbeOutput::Error(ProbeFailure {
            error: error.into(),
            permission_required,
            missing: Vec::new(),
            supported: None,
        })
    }

    pub fn missing_capabilities(missing: Vec<String>) -> Self {
        ProbeOutput::Error(ProbeFailure {
            error: MISSING_PERMISSIONS.to_string(),
            permission_required: true,
            missing,
            supported: None,
        })
    }

    pub fn timed_out() -> Self {
        Self::failed(PROBE_TIMED_OUT, false)
    }

    pub fn unsupported() -> Self {
        ProbeOutput::Error(ProbeFailure {
            error: PROBE_UNSUPPORTED.to_string(),
            permission_required: false,
            missing: Vec::new(),
            supported: Some(false),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ProbeOutput::Error(_))
    }

    pub fn fields(&self) -> Option<&Fields> {
        match self {
            ProbeOutput::Data(fields) => Some(fields),
            ProbeOutput::Error(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            ProbeOutput::Error(failure) => Some(failure),
            ProbeOutput::Data(_) => None,
        }
    }
}

impl From<Result<Fields, ProbeError>> for ProbeOutput {
    fn from(result: Result<Fields, ProbeError>) -> Self {
        match result {
            Ok(fields) => ProbeOutput::Data(fields),
            Err(err) => {
                let permission = err.is_permission_error();
                ProbeOutput::failed(err.to_string(), permission)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldsExt;

    #[test]
    fn test_error_output_shape() {
        let output = ProbeOutput::missing_capabilities(vec!["READ_PHONE_STATE".into()]);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["error"], "Missing required permissions");
        assert_eq!(json["permissionRequired"], true);
        assert_eq!(json["missing"][0], "READ_PHONE_STATE");
        assert!(json.get("supported").is_none());
    }

    #[test]
    fn test_data_and_error_are_distinguished_on_parse() {
        let mut fields = Fields::new();
        fields.put("model", "Pixel 8");
        let data = ProbeOutput::Data(fields);
        let timeout = ProbeOutput::timed_out();

        let data_back: ProbeOutput =
            serde_json::from_str(&serde_json::to_string(&data).unwrap()).unwrap();
        let timeout_back: ProbeOutput =
            serde_json::from_str(&serde_json::to_string(&timeout).unwrap()).unwrap();

        assert!(!data_back.is_error());
        assert!(timeout_back.is_error());
        assert_eq!(timeout_back.failure().unwrap().error, PROBE_TIMED_OUT);
    }

    #[test]
    fn test_probe_error_conversion() {
        let output: ProbeOutput = Err(ProbeError::CapabilityDenied("imei".into())).into();
        let failure = output.failure().unwrap();
        assert!(failure.permission_required);
        assert_eq!(failure.error, "Permission denied: imei");
    }
}
