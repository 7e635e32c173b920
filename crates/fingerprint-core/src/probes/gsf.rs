// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{capability, DataSource, Fields, FieldsExt, Probe, ProbeError};

use super::GSF_INFO;

/// Google services framework id. Only supported where the gservices
/// provider is installed.
pub struct GsfInfoProbe;

#[async_trait]
impl Probe for GsfInfoProbe {
    fn name(&self) -> &str {
        GSF_INFO
    }

    fn required_capabilities(&self) -> Vec<String> {
        vec![capability::READ_GSERVICES.to_string()]
    }

    fn supported(&self, device: &dyn DataSource) -> bool {
        device.gservices_available()
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        let raw = device.gsf_id()?;
        let mut fields = Fields::new();
        fields.put("gsfId", raw.as_deref().map(gsf_hex).unwrap_or_default());
        Ok(fields)
    }
}

/// Decimal ids are rendered as lowercase two's-complement hex; anything
/// else is passed through.
pub fn gsf_hex(raw: &str) -> String {
    match raw.trim().parse::<i64>() {
        Ok(id) => format!("{id:x}"),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerprint_api::{StaticSource, Value};
    use rstest::rstest;

    #[rstest]
    #[case("3875291062347112094", "35c7ccb064721e9e")]
    #[case("255", "ff")]
    #[case("-1", "ffffffffffffffff")]
    #[case("not-a-number", "not-a-number")]
    fn test_gsf_hex(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(gsf_hex(raw), expected);
    }

    #[tokio::test]
    async fn test_gsf_fields() {
        let source = StaticSource {
            gsf_id: Some("255".into()),
            ..StaticSource::default()
        }
        .with_capability(capability::READ_GSERVICES);
        assert!(GsfInfoProbe.supported(&source));
        assert!(GsfInfoProbe.has_capabilities(&source));
        let fields = GsfInfoProbe.run(Arc::new(source)).await.unwrap();
        assert_eq!(fields["gsfId"], Value::from("ff"));
    }

    #[tokio::test]
    async fn test_empty_provider_row_is_blank() {
        let source = StaticSource {
            gsf_id: Some(String::new()),
            ..StaticSource::default()
        }
        .with_capability(capability::READ_GSERVICES);
        let fields = GsfInfoProbe.run(Arc::new(source)).await.unwrap();
        assert_eq!(fields["gsfId"], Value::from(""));
    }

    #[test]
    fn test_unsupported_without_provider() {
        let source = StaticSource::default().with_capability(capability::READ_GSERVICES);
        assert!(!GsfInfoProbe.supported(&source));
    }
}
