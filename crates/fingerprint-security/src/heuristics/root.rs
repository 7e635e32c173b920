// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Root and tamper detection battery.

use std::sync::Arc;
use std::time::Instant;

use fingerprint_api::DataSource;
use rand::Rng;
use tracing::debug;

use super::{
    anti_debug_triggered, CheckBattery, CheckResult, DetectionPass, Verdict, VerdictRule, HIGH,
    LOW, MEDIUM,
};
use crate::integrity::IntegrityVerifier;
use crate::literals::RootLiterals;

const HIGH_CONFIDENCE_PATH_KEYWORDS: [&str; 4] = ["magisk", "kernelsu", "zygisk", "ksu"];
const HIGH_CONFIDENCE_PACKAGES: [&str; 4] = [
    "com.topjohnwu.magisk",
    "com.topjohnwu.magisk.beta",
    "eu.chainfire.supersu",
    "com.kingroot.kinguser",
];
const ENV_MARKERS: [&str; 6] = [
    "su",
    "busybox",
    "magisk",
    "/data/local",
    "/system/xbin",
    "kernelsu",
];

enum Matcher {
    Exact(&'static str),
    IgnoreCase(&'static str),
}

impl Matcher {
    fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Exact(expected) => value == *expected,
            Matcher::IgnoreCase(expected) => value.eq_ignore_ascii_case(expected),
        }
    }
}

struct PropertyAlert {
    key: &'static str,
    matcher: Matcher,
    high_confidence: bool,
}

const PROPERTY_ALERTS: [PropertyAlert; 7] = [
    PropertyAlert {
        key: "ro.debuggable",
        matcher: Matcher::Exact("1"),
        high_confidence: false,
    },
    PropertyAlert {
        key: "ro.secure",
        matcher: Matcher::Exact("0"),
        high_confidence: false,
    },
    PropertyAlert {
        key: "ro.boot.veritymode",
        matcher: Matcher::IgnoreCase("logging"),
        high_confidence: false,
    },
    PropertyAlert {
        key: "ro.boot.vbmeta.device_state",
        matcher: Matcher::IgnoreCase("unlocked"),
        high_confidence: true,
    },
    PropertyAlert {
        key: "ro.boot.verifiedbootstate",
        matcher: Matcher::IgnoreCase("orange"),
        high_confidence: true,
    },
    PropertyAlert {
        key: "ro.boot.flash.locked",
        matcher: Matcher::Exact("0"),
        high_confidence: true,
    },
    PropertyAlert {
        key: "ro.boot.warranty_bit",
        matcher: Matcher::Exact("0"),
        high_confidence: true,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct RootAssessment {
    pub verdict: Verdict,
    pub integrity_verified: bool,
    pub native_checks_performed: usize,
    pub anti_debug_triggered: bool,
    /// Sorted messages of checks that failed to run.
    pub warnings: Vec<String>,
}

pub struct RootDetector {
    literals: RootLiterals,
    integrity: Option<Arc<IntegrityVerifier>>,
}

impl RootDetector {
    pub fn new(literals: RootLiterals) -> Self {
        Self {
            literals,
            integrity: None,
        }
    }

    pub fn with_integrity(mut self, verifier: Arc<IntegrityVerifier>) -> Self {
        self.integrity = Some(verifier);
        self
    }

    pub fn detect<R: Rng + ?Sized>(
        &self,
        device: &dyn DataSource,
        rng: &mut R,
        deadline: Option<Instant>,
    ) -> RootAssessment {
        let integrity_verified = self
            .integrity
            .as_ref()
            .map(|verifier| verifier.verify())
            .unwrap_or(false);

        let mut pass = DetectionPass::default();
        self.battery(device).run_shuffled(rng, &mut pass, deadline);

        if pass.timed_out {
            return RootAssessment {
                verdict: Verdict::timed_out(),
                integrity_verified: false,
                native_checks_performed: 0,
                anti_debug_triggered: false,
                warnings: Vec::new(),
            };
        }

        // tracer pid read
        pass.native_reads += 1;
        let anti_debug = anti_debug_triggered(device);

        let verdict = pass.verdict(VerdictRule::ROOT);
        debug!(
            indicators = verdict.indicators.len(),
            positive = verdict.is_positive,
            "root pass finished"
        );
        let mut warnings = pass.warnings;
        warnings.sort();
        RootAssessment {
            verdict,
            integrity_verified,
            native_checks_performed: pass.native_reads,
            anti_debug_triggered: anti_debug,
            warnings,
        }
    }

    fn battery<'a>(&'a self, device: &'a dyn DataSource) -> CheckBattery<'a> {
        CheckBattery::new()
            .check("paths", move |pass| self.paths(device, pass))
            .check("properties", move |pass| self.properties(device, pass))
            .check("packages", move |pass| self.packages(device, pass))
            .check("environment", move |pass| self.environment(device, pass))
            .check("build_tags", move |pass| build_tags(device, pass))
            .check("selinux", move |pass| selinux(device, pass))
            .check("integrity", move |pass| self.integrity(pass))
    }

    fn paths(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        for path in &self.literals.paths {
            pass.native_reads += 1;
            if device.file_exists(path)? {
                let lower = path.to_lowercase();
                let high = HIGH_CONFIDENCE_PATH_KEYWORDS
                    .iter()
                    .any(|keyword| lower.contains(keyword));
                pass.record(format!("path:{path}"), MEDIUM, high);
            }
        }
        Ok(())
    }

    fn properties(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        for key in &self.literals.properties {
            let Some(alert) = PROPERTY_ALERTS.iter().find(|alert| alert.key == key.as_str()) else {
                continue;
            };
            pass.native_reads += 1;
            let value = device.system_property(key)?;
            let value = value.trim();
            if alert.matcher.matches(value) {
                let weight = if alert.high_confidence { HIGH } else { MEDIUM };
                pass.record(format!("property:{key}={value}"), weight, alert.high_confidence);
            }
        }
        Ok(())
    }

    fn packages(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        for package in &self.literals.packages {
            if device.package_installed(package)? {
                let high = HIGH_CONFIDENCE_PACKAGES.contains(&package.as_str());
                pass.record(format!("package:{package}"), MEDIUM, high);
            }
        }
        Ok(())
    }

    fn environment(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        for name in &self.literals.env_vars {
            let Some(value) = device.env_var(name)? else {
                continue;
            };
            let lower = value.to_lowercase();
            if !lower.is_empty() && ENV_MARKERS.iter().any(|marker| lower.contains(marker)) {
                pass.record(format!("env:{name}"), LOW, false);
            }
        }
        Ok(())
    }

    fn integrity(&self, pass: &mut DetectionPass) -> CheckResult {
        if let Some(verifier) = &self.integrity {
            if verifier.is_configured() && !verifier.verify() {
                pass.record("integrity:mismatch", HIGH, false);
            }
        }
        Ok(())
    }
}

fn build_tags(device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
    if device.build_facts()?.tags.contains("test-keys") {
        pass.record("build:test_keys", MEDIUM, false);
    }
    Ok(())
}

fn selinux(device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
    pass.native_reads += 1;
    if device.selinux_enforcing()? == Some(false) {
        pass.record("selinux:permissive", MEDIUM, false);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::{IntegrityError, PayloadHasher};
    use fingerprint_api::{BuildFacts, SourceError, SourceResult, StaticSource};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    struct FixedDigest(String);

    impl PayloadHasher for FixedDigest {
        fn payload_digest(&self) -> Result<String, IntegrityError> {
            Ok(self.0.clone())
        }
    }

    fn detector() -> RootDetector {
        RootDetector::new(RootLiterals::embedded())
    }

    fn stock() -> StaticSource {
        let mut source = StaticSource::default()
            .with_property("ro.debuggable", "0")
            .with_property("ro.secure", "1")
            .with_property("ro.boot.verifiedbootstate", "green")
            .with_property("ro.boot.flash.locked", "1")
            .with_property("ro.boot.vbmeta.device_state", "locked");
        source.build = BuildFacts {
            tags: "release-keys".into(),
            ..Default::default()
        };
        source.selinux_enforcing = Some(true);
        source
            .env
            .insert("PATH".into(), "/product/bin:/apex/com.android.runtime/bin".into());
        source
    }

    fn detect(detector: &RootDetector, device: &StaticSource) -> RootAssessment {
        detector.detect(device, &mut StdRng::seed_from_u64(11), None)
    }

    #[test]
    fn test_stock_device_is_clean() {
        let assessment = detect(&detector(), &stock());
        assert!(!assessment.verdict.is_positive);
        assert!(assessment.verdict.indicators.is_empty());
        assert!(assessment.warnings.is_empty());
        assert!(!assessment.integrity_verified);
        assert!(assessment.native_checks_performed > 0);
    }

    #[test]
    fn test_magisk_path_is_high_confidence() {
        let device = stock().with_file("/data/adb/magisk");
        let assessment = detect(&detector(), &device);
        assert!(assessment.verdict.is_positive);
        assert_eq!(assessment.verdict.high_confidence_count, 1);
        assert_eq!(assessment.verdict.indicators, vec!["path:/data/adb/magisk"]);
    }

    #[test]
    fn test_three_weak_indicators_are_positive() {
        let mut device = stock()
            .with_file("/system/xbin/su")
            .with_property("ro.debuggable", "1");
        device.build.tags = "test-keys".into();
        let assessment = detect(&detector(), &device);
        assert_eq!(assessment.verdict.high_confidence_count, 0);
        assert_eq!(
            assessment.verdict.indicators,
            vec!["build:test_keys", "path:/system/xbin/su", "property:ro.debuggable=1"]
        );
        assert!(assessment.verdict.is_positive);
    }

    #[test]
    fn test_two_weak_indicators_are_negative() {
        let mut device = stock().with_property("ro.secure", "0");
        device.selinux_enforcing = Some(false);
        let assessment = detect(&detector(), &device);
        assert_eq!(assessment.verdict.indicators.len(), 2);
        assert!(!assessment.verdict.is_positive);
    }

    #[rstest]
    #[case("ro.boot.vbmeta.device_state", "unlocked")]
    #[case("ro.boot.verifiedbootstate", "ORANGE")]
    #[case("ro.boot.flash.locked", "0")]
    #[case("ro.boot.warranty_bit", "0")]
    fn test_boot_state_alerts_are_high_confidence(#[case] key: &str, #[case] value: &str) {
        let device = stock().with_property(key, value);
        let assessment = detect(&detector(), &device);
        assert!(assessment.verdict.is_positive);
        assert_eq!(
            assessment.verdict.indicators,
            vec![format!("property:{key}={value}")]
        );
    }

    #[test]
    fn test_root_manager_package() {
        let mut device = stock();
        device.packages.insert("eu.chainfire.supersu".into());
        device.packages.insert("com.kingo.root".into());
        let assessment = detect(&detector(), &device);
        assert_eq!(assessment.verdict.high_confidence_count, 1);
        assert_eq!(assessment.verdict.indicators.len(), 2);
    }

    #[test]
    fn test_environment_markers() {
        let mut device = stock();
        device.env.insert("MAGISKTMP".into(), "/debug_ramdisk/.magisk".into());
        device.env.insert("LD_PRELOAD".into(), "".into());
        let assessment = detect(&detector(), &device);
        assert_eq!(assessment.verdict.indicators, vec!["env:MAGISKTMP"]);
    }

    #[test]
    fn test_integrity_mismatch_only_when_configured() {
        let digest = "ab".repeat(32);
        let unset = Arc::new(IntegrityVerifier::new(
            "UNSET",
            Box::new(FixedDigest("ff".into())),
        ));
        let assessment = detect(&detector().with_integrity(unset), &stock());
        assert!(!assessment.integrity_verified);
        assert!(assessment.verdict.indicators.is_empty());

        let mismatch = Arc::new(IntegrityVerifier::new(
            digest.clone(),
            Box::new(FixedDigest("ff".into())),
        ));
        let assessment = detect(&detector().with_integrity(mismatch), &stock());
        assert_eq!(assessment.verdict.indicators, vec!["integrity:mismatch"]);
        assert!(!assessment.verdict.is_positive);

        let matching = Arc::new(IntegrityVerifier::new(
            digest.clone(),
            Box::new(FixedDigest(digest)),
        ));
        let assessment = detect(&detector().with_integrity(matching), &stock());
        assert!(assessment.integrity_verified);
        assert!(assessment.verdict.indicators.is_empty());
    }

    struct BrokenPackages(StaticSource);

    impl DataSource for BrokenPackages {
        fn has_capability(&self, capability: &str) -> bool {
            self.0.has_capability(capability)
        }
        fn file_exists(&self, path: &str) -> SourceResult<bool> {
            self.0.file_exists(path)
        }
        fn system_property(&self, key: &str) -> SourceResult<String> {
            self.0.system_property(key)
        }
        fn read_text(&self, path: &str) -> SourceResult<String> {
            self.0.read_text(path)
        }
        fn build_facts(&self) -> SourceResult<BuildFacts> {
            self.0.build_facts()
        }
        fn network_interfaces(&self) -> SourceResult<Vec<fingerprint_api::NetworkInterface>> {
            self.0.network_interfaces()
        }
        fn sensors(&self) -> SourceResult<Vec<fingerprint_api::SensorInfo>> {
            self.0.sensors()
        }
        fn sensor_activity(&self, window_ms: u64) -> SourceResult<fingerprint_api::SensorActivity> {
            self.0.sensor_activity(window_ms)
        }
        fn gpu_snapshot(&self) -> SourceResult<fingerprint_api::GpuSnapshot> {
            self.0.gpu_snapshot()
        }
        fn battery(&self) -> SourceResult<fingerprint_api::BatteryTelemetry> {
            self.0.battery()
        }
        fn imei(&self) -> SourceResult<Option<String>> {
            self.0.imei()
        }
        fn package_installed(&self, _package: &str) -> SourceResult<bool> {
            Err(SourceError::Unavailable("package manager".into()))
        }
        fn env_var(&self, name: &str) -> SourceResult<Option<String>> {
            self.0.env_var(name)
        }
        fn tracer_pid(&self) -> SourceResult<u32> {
            self.0.tracer_pid()
        }
        fn debugger_connected(&self) -> SourceResult<bool> {
            self.0.debugger_connected()
        }
        fn neon_probe(&self) -> SourceResult<bool> {
            self.0.neon_probe()
        }
        fn selinux_enforcing(&self) -> SourceResult<Option<bool>> {
            self.0.selinux_enforcing()
        }
    }

    #[test]
    fn test_failing_check_becomes_warning() {
        let device = BrokenPackages(stock().with_file("/data/adb/ksu"));
        let assessment = detector().detect(&device, &mut StdRng::seed_from_u64(3), None);
        assert_eq!(assessment.warnings, vec!["packages: unavailable: package manager"]);
        assert!(assessment.verdict.is_positive);
    }

    #[test]
    fn test_exhausted_budget() {
        let device = stock().with_file("/data/adb/magisk");
        let assessment =
            detector().detect(&device, &mut StdRng::seed_from_u64(3), Some(Instant::now()));
        assert!(assessment.verdict.timed_out);
        assert!(!assessment.verdict.is_positive);
        assert_eq!(assessment.native_checks_performed, 0);
    }

    #[test]
    fn test_check_order_does_not_change_verdict() {
        let mut device = stock()
            .with_file("/system/xbin/su")
            .with_file("/data/adb/magisk")
            .with_property("ro.debuggable", "1");
        device.build.tags = "test-keys".into();
        device.selinux_enforcing = Some(false);
        device.packages.insert("com.kingo.root".into());
        device.env.insert("MAGISKTMP".into(), "/debug_ramdisk/.magisk".into());

        let detector = detector();
        let baseline = detector.detect(&device, &mut StdRng::seed_from_u64(0), None);
        assert!(baseline.verdict.is_positive);
        for seed in 1..32 {
            let other = detector.detect(&device, &mut StdRng::seed_from_u64(seed), None);
            assert_eq!(other.verdict, baseline.verdict);
            assert_eq!(other.native_checks_performed, baseline.native_checks_performed);
        }
    }
}
