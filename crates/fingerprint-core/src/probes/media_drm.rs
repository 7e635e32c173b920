// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{DataSource, Fields, FieldsExt, Probe, ProbeError};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::MEDIA_DRM_INFO;

/// Reported when the DRM id cannot be read.
const ID_FALLBACK: &str = "error";

/// SHA-256 of the Widevine device unique id. The raw id never leaves the probe.
pub struct MediaDrmInfoProbe;

#[async_trait]
impl Probe for MediaDrmInfoProbe {
    fn name(&self) -> &str {
        MEDIA_DRM_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        let id = match device.drm_device_id() {
            Ok(raw) => hex::encode(Sha256::digest(&raw)),
            Err(err) => {
                debug!(error = %err, "widevine id unavailable");
                ID_FALLBACK.to_string()
            }
        };
        let mut fields = Fields::new();
        fields.put("id", id);
        Ok(fields)
    }
}
