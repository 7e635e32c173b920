// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{DataSource, Fields, FieldsExt, Probe, ProbeError};
use fingerprint_security::heuristics::gpu;
use fingerprint_security::{GpuPatterns, HeuristicBus};
use tracing::debug;

use super::{optional, round2, ProbeContext, GPU_INFO};

/// GPU identity and virtualization heuristics. Publishes its findings on the
/// signal bus for the emulator probe.
pub struct GpuInfoProbe {
    bus: Arc<HeuristicBus>,
    patterns: Arc<GpuPatterns>,
}

impl GpuInfoProbe {
    pub fn new(ctx: &ProbeContext) -> Self {
        Self {
            bus: ctx.bus.clone(),
            patterns: ctx.gpu_patterns.clone(),
        }
    }
}

#[async_trait]
impl Probe for GpuInfoProbe {
    fn name(&self) -> &str {
        GPU_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        let snapshot = device.gpu_snapshot()?;
        let build = optional(device.build_facts())?.unwrap_or_default();

        let assessment = gpu::evaluate(&snapshot, &self.patterns, &build);
        let signals = assessment.signals;
        debug!(
            suspected = signals.suspected_virtualization,
            checks_passed = signals.checks_passed,
            "gpu heuristics evaluated"
        );

        let mut extensions = snapshot.extensions;
        extensions.sort();
        extensions.dedup();

        let mut fields = Fields::new();
        fields.put("renderer", snapshot.renderer);
        fields.put("vendor", snapshot.vendor);
        fields.put("version", snapshot.version);
        fields.put("eglVendor", snapshot.egl_vendor);
        fields.put("extensionCount", extensions.len());
        fields.put("extensions", extensions);
        fields.put("maxTextureSize", snapshot.max_texture_size);
        fields.put("computeWorkGroupInvocations", snapshot.compute_invocations);
        fields.put("vulkanSupported", snapshot.vulkan_supported);
        fields.put("systemRamMb", snapshot.total_ram_mb);
        fields.put("confidenceScore", round2(signals.confidence_score));
        fields.put("suspectedVirtualization", signals.suspected_virtualization);
        fields.put("suspiciousIndicators", signals.hints.clone());
        fields.put("hardwareChecksPassed", signals.checks_passed);
        self.bus.publish_gpu(signals);
        Ok(fields)
    }
}
