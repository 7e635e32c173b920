// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{DataSource, Fields, FieldsExt, Probe, ProbeError};

use super::BUILD_INFO;

/// Static build identity.
pub struct BuildInfoProbe;

#[async_trait]
impl Probe for BuildInfoProbe {
    fn name(&self) -> &str {
        BUILD_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        let build = device.build_facts()?;
        let mut fields = Fields::new();
        fields.put("board", build.board);
        fields.put("bootloader", build.bootloader);
        fields.put("brand", build.brand);
        fields.put("device", build.device);
        fields.put("display", build.display);
        fields.put("fingerprint", build.fingerprint);
        fields.put("hardware", build.hardware);
        fields.put("host", build.host);
        fields.put("manufacturer", build.manufacturer);
        fields.put("model", build.model);
        fields.put("product", build.product);
        fields.put("tags", build.tags);
        fields.put("type", build.build_type);
        fields.put("supportedAbis", build.supported_abis);
        fields.put("sdkInt", build.sdk_int);
        Ok(fields)
    }
}
