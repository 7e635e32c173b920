// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{DataSource, Fields, FieldsExt, Probe, ProbeError};

use super::{optional, DEBUG_INFO};

const ADB_SERVICE: &str = "init.svc.adbd";
const USB_CONFIG: &str = "persist.sys.usb.config";

/// ADB and debugger state.
pub struct DebugInfoProbe;

#[async_trait]
impl Probe for DebugInfoProbe {
    fn name(&self) -> &str {
        DEBUG_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        let mut fields = Fields::new();

        let service = optional(device.system_property(ADB_SERVICE))?.unwrap_or_default();
        let usb = optional(device.system_property(USB_CONFIG))?.unwrap_or_default();
        fields.put(
            "adbEnabled",
            service.trim() == "running" || usb.split(',').any(|f| f.trim() == "adb"),
        );
        fields.put("isDebuggerConnected", optional(device.debugger_connected())?);
        fields.put("tracerPid", optional(device.tracer_pid())?);
        Ok(fields)
    }
}
