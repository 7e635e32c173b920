// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! GPU virtualization heuristics.

use fingerprint_api::{BuildFacts, GpuSnapshot};

use super::{IndicatorSet, HIGH, LOW, MEDIUM};
use crate::literals::GpuPatterns;
use crate::signal_bus::GpuSignals;

/// Confidence at which the GPU is reported as virtualized.
pub const SUSPECTED_THRESHOLD: f64 = 0.65;

const SOFTWARE_RENDERERS: [&str; 6] = [
    "swiftshader",
    "llvmpipe",
    "mesa",
    "software",
    "angle",
    "virtualbox",
];

const DESKTOP_EXTENSION_PREFIXES: [&str; 2] = ["GL_ARB_", "GL_NV_"];

const LARGE_TEXTURE: u32 = 16_384;
const LOW_RAM_MB: u64 = 3_072;
const SLOW_BENCHMARK_MS: f64 = 50.0;

/// Number of independent GPU checks; `checks_passed` counts the clean ones.
pub const GPU_CHECK_COUNT: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct GpuAssessment {
    pub indicators: IndicatorSet,
    pub signals: GpuSignals,
}

pub fn evaluate(gpu: &GpuSnapshot, patterns: &GpuPatterns, build: &BuildFacts) -> GpuAssessment {
    let mut set = IndicatorSet::new();
    let renderer = gpu.renderer.to_lowercase();
    let vendor = gpu.vendor.to_lowercase();
    let egl_vendor = gpu.egl_vendor.to_lowercase();

    let fired = [
        match_patterns(&mut set, &renderer, &patterns.renderers, "renderer", HIGH, true),
        software_renderer(&mut set, &renderer),
        match_patterns(&mut set, &vendor, &patterns.vendors, "vendor", MEDIUM, false),
        match_patterns(&mut set, &egl_vendor, &patterns.egl_vendors, "egl_vendor", MEDIUM, false),
        extensions(&mut set, &gpu.extensions, &patterns.extensions),
        compute_support(&mut set, gpu),
        texture_ram_mismatch(&mut set, gpu),
        flag(&mut set, renderer.trim().is_empty(), "blank_renderer", MEDIUM),
        flag(
            &mut set,
            vendor.contains("google") && !build.manufacturer.to_lowercase().contains("google"),
            "google_vendor_mismatch",
            MEDIUM,
        ),
        flag(&mut set, gpu.micro_benchmark_ms > SLOW_BENCHMARK_MS, "slow_benchmark", LOW),
    ];
    let triggered = fired.iter().filter(|f| **f).count() as u32;

    let confidence = set.score();
    let signals = GpuSignals {
        confidence_score: confidence,
        suspected_virtualization: confidence >= SUSPECTED_THRESHOLD,
        hints: set.labels(),
        checks_passed: GPU_CHECK_COUNT.saturating_sub(triggered),
    };
    GpuAssessment {
        indicators: set,
        signals,
    }
}

fn match_patterns(
    set: &mut IndicatorSet,
    value: &str,
    patterns: &[String],
    prefix: &str,
    weight: f64,
    high_confidence: bool,
) -> bool {
    let mut fired = false;
    for pattern in patterns.iter().filter(|p| value.contains(p.as_str())) {
        set.record(format!("{prefix}:{pattern}"), weight, high_confidence);
        fired = true;
    }
    fired
}

fn software_renderer(set: &mut IndicatorSet, renderer: &str) -> bool {
    match SOFTWARE_RENDERERS.iter().find(|s| renderer.contains(*s)) {
        Some(name) => {
            set.record(format!("software_renderer:{name}"), HIGH, false);
            true
        }
        None => false,
    }
}

fn extensions(set: &mut IndicatorSet, extensions: &[String], patterns: &[String]) -> bool {
    let mut fired = false;
    for pattern in patterns {
        if extensions.iter().any(|e| e.starts_with(pattern.as_str())) {
            set.record(format!("extension:{pattern}"), HIGH, true);
            fired = true;
        }
    }
    let desktop = extensions
        .iter()
        .any(|e| DESKTOP_EXTENSION_PREFIXES.iter().any(|p| e.starts_with(p)));
    fired | flag(set, desktop, "desktop_extensions", LOW)
}

fn compute_support(set: &mut IndicatorSet, gpu: &GpuSnapshot) -> bool {
    let no_vulkan = flag(set, !gpu.vulkan_supported, "no_vulkan", LOW);
    let no_compute = flag(set, gpu.compute_invocations == 0, "no_compute", LOW);
    no_vulkan || no_compute
}

fn texture_ram_mismatch(set: &mut IndicatorSet, gpu: &GpuSnapshot) -> bool {
    let mismatch = gpu.max_texture_size >= LARGE_TEXTURE
        && gpu.total_ram_mb > 0
        && gpu.total_ram_mb < LOW_RAM_MB;
    flag(set, mismatch, "texture_ram_mismatch", MEDIUM)
}

fn flag(set: &mut IndicatorSet, condition: bool, label: &str, weight: f64) -> bool {
    if condition {
        set.record(label, weight, false);
    }
    condition
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> GpuPatterns {
        GpuPatterns {
            renderers: vec!["swiftshader".into(), "android emulator opengl es translator".into()],
            vendors: vec!["google (translator)".into()],
            extensions: vec!["GL_ANDROID_EMU".into()],
            egl_vendors: vec!["emulator".into()],
        }
    }

    fn adreno() -> GpuSnapshot {
        GpuSnapshot {
            renderer: "Adreno (TM) 740".into(),
            vendor: "Qualcomm".into(),
            version: "OpenGL ES 3.2 V@0676.32".into(),
            egl_vendor: "Android".into(),
            extensions: vec!["GL_OES_EGL_image".into(), "GL_EXT_texture_filter_anisotropic".into()],
            max_texture_size: 16_384,
            compute_invocations: 1_024,
            vulkan_supported: true,
            micro_benchmark_ms: 4.2,
            total_ram_mb: 8_192,
        }
    }

    fn pixel_build() -> BuildFacts {
        BuildFacts {
            manufacturer: "Google".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_physical_gpu_passes_all_checks() {
        let assessment = evaluate(&adreno(), &patterns(), &pixel_build());
        assert!(assessment.indicators.is_empty());
        assert_eq!(assessment.signals.checks_passed, GPU_CHECK_COUNT);
        assert!(!assessment.signals.suspected_virtualization);
    }

    #[test]
    fn test_emulator_translator_is_suspected() {
        let gpu = GpuSnapshot {
            renderer: "Android Emulator OpenGL ES Translator (Google SwiftShader)".into(),
            vendor: "Google (Translator)".into(),
            egl_vendor: "Emulator".into(),
            extensions: vec!["GL_ANDROID_EMU_native_sync_v2".into()],
            ..Default::default()
        };
        let build = BuildFacts {
            manufacturer: "unknown".into(),
            ..Default::default()
        };
        let assessment = evaluate(&gpu, &patterns(), &build);
        let signals = &assessment.signals;

        assert!(signals.suspected_virtualization);
        assert_eq!(signals.confidence_score, 1.0);
        assert!(signals.hints.contains(&"renderer:swiftshader".to_string()));
        assert!(signals.hints.contains(&"extension:GL_ANDROID_EMU".to_string()));
        assert!(signals.hints.contains(&"google_vendor_mismatch".to_string()));
        assert!(signals.checks_passed <= 3);
    }

    #[test]
    fn test_texture_ram_mismatch() {
        let gpu = GpuSnapshot {
            total_ram_mb: 2_048,
            ..adreno()
        };
        let assessment = evaluate(&gpu, &patterns(), &pixel_build());
        assert_eq!(assessment.signals.hints, vec!["texture_ram_mismatch"]);
        assert_eq!(assessment.signals.checks_passed, GPU_CHECK_COUNT - 1);
    }
}
