// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Emulator detection battery.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fingerprint_api::{BatteryTelemetry, DataSource, SourceError};
use rand::Rng;
use tracing::debug;

use super::imei::check_imei;
use super::{
    anti_debug_triggered, sensors, CheckBattery, CheckResult, DetectionPass, Verdict, VerdictRule,
    HIGH, LOW, MEDIUM,
};
use crate::literals::EmulatorLiterals;
use crate::signal_bus::{HeuristicBus, SensorSignals, DEFAULT_MAX_AGE};

const CPUINFO: &str = "/proc/cpuinfo";
const ARP_TABLE: &str = "/proc/net/arp";
/// Sensor sampling window. Must stay well inside the detection budget.
pub const SENSOR_WINDOW_MS: u64 = 90;

const QEMU_PROPERTY: &str = "ro.kernel.qemu";
const MANUFACTURER_PROPERTY: &str = "ro.product.manufacturer";
const BOOTLOADER_PROPERTY: &str = "ro.bootloader";

const HIGH_CONFIDENCE_TOKENS: [&str; 3] = ["bluestacks", "ldplayer", "genymotion"];
const SUSPICIOUS_MANUFACTURERS: [&str; 4] = ["unknown", "genymotion", "netease", "bluestacks"];
const PHYSICAL_X86_VENDORS: [&str; 3] = ["asus", "lenovo", "acer"];

const HEALTHY_SENSOR_COUNT: usize = 5;

const SENSOR_MAX_HINTS: usize = 10;
const GPU_ELEVATED: f64 = 0.5;
const GPU_MAX_HINTS: usize = 5;
const GPU_UNDERPERFORM_CHECKS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct EmulatorAssessment {
    pub verdict: Verdict,
    pub hardware_checks_passed: usize,
    pub anti_debug_triggered: bool,
    pub warnings: Vec<String>,
}

pub struct EmulatorDetector {
    literals: EmulatorLiterals,
    bus: Option<Arc<HeuristicBus>>,
    signal_max_age: Duration,
}

impl EmulatorDetector {
    pub fn new(literals: EmulatorLiterals) -> Self {
        Self {
            literals,
            bus: None,
            signal_max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_bus(mut self, bus: Arc<HeuristicBus>, max_age: Duration) -> Self {
        self.bus = Some(bus);
        self.signal_max_age = max_age;
        self
    }

    pub fn detect<R: Rng + ?Sized>(
        &self,
        device: &dyn DataSource,
        rng: &mut R,
        deadline: Option<Instant>,
    ) -> EmulatorAssessment {
        let mut pass = DetectionPass::default();
        self.battery(device).run_shuffled(rng, &mut pass, deadline);

        let anti_debug = anti_debug_triggered(device);
        if !pass.timed_out {
            self.gpu_hints(&mut pass);
            if anti_debug {
                pass.record("debug:anti_debug", LOW, false);
            }
        }

        let verdict = pass.verdict(VerdictRule::EMULATOR);
        debug!(
            indicators = verdict.indicators.len(),
            positive = verdict.is_positive,
            timed_out = verdict.timed_out,
            "emulator pass finished"
        );
        EmulatorAssessment {
            verdict,
            hardware_checks_passed: pass.hardware_checks_passed,
            anti_debug_triggered: anti_debug,
            warnings: pass.warnings,
        }
    }

    fn battery<'a>(&'a self, device: &'a dyn DataSource) -> CheckBattery<'a> {
        CheckBattery::new()
            .check("artifacts", move |pass| self.artifacts(device, pass))
            .check("device_tokens", move |pass| self.device_tokens(device, pass))
            .check("properties", move |pass| self.properties(device, pass))
            .check("cpuinfo", move |pass| self.cpuinfo(device, pass))
            .check("interfaces", move |pass| self.interfaces(device, pass))
            .check("arp", move |pass| self.arp(device, pass))
            .check("sensor_activity", move |pass| sensor_activity(device, pass))
            .check("sensor_population", move |pass| self.sensor_population(device, pass))
            .check("battery", move |pass| battery(device, pass))
            .check("imei", move |pass| imei(device, pass))
            .check("x86_bootloader", move |pass| x86_bootloader(device, pass))
            .check("neon", move |pass| neon(device, pass))
    }

    fn artifacts(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        for path in &self.literals.paths {
            if device.file_exists(path)? {
                pass.record(format!("file:{path}"), HIGH, true);
            }
        }
        Ok(())
    }

    fn device_tokens(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        let descriptor = device.build_facts()?.descriptor();
        for token in &self.literals.device_tokens {
            if descriptor.contains(token.as_str()) {
                let high = HIGH_CONFIDENCE_TOKENS.contains(&token.as_str());
                pass.record(format!("device:{token}"), MEDIUM, high);
            }
        }
        Ok(())
    }

    fn properties(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        for key in &self.literals.properties {
            let value = device.system_property(key)?.trim().to_lowercase();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                QEMU_PROPERTY => {
                    if value == "1" || value == "true" {
                        pass.record(format!("prop:{key}"), HIGH, true);
                    }
                }
                MANUFACTURER_PROPERTY => {
                    if SUSPICIOUS_MANUFACTURERS.contains(&value.as_str()) {
                        pass.record("prop:suspicious_manufacturer", MEDIUM, false);
                    }
                }
                _ => {
                    if self
                        .literals
                        .device_tokens
                        .iter()
                        .any(|token| value.contains(token.as_str()))
                    {
                        pass.record(format!("prop:{key}"), MEDIUM, false);
                    }
                }
            }
        }
        Ok(())
    }

    fn cpuinfo(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        let cpuinfo = device.read_text(CPUINFO)?.to_lowercase();
        for token in &self.literals.proc_tokens {
            if cpuinfo.contains(token.as_str()) {
                pass.record(format!("cpu:{token}"), MEDIUM, false);
            }
        }
        let build = device.build_facts()?;
        let intel = cpuinfo.contains("genuineintel") || cpuinfo.contains("intel(r)");
        if intel && build.primary_abi().contains("arm") {
            pass.record("cpu:mixed_vendor", MEDIUM, true);
        }
        Ok(())
    }

    fn interfaces(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        let interfaces = device.network_interfaces()?;
        if !interfaces.iter().any(|i| i.name.starts_with("wlan")) {
            pass.record("net:no_wlan", LOW, false);
        }
        for interface in &interfaces {
            let mac = interface.mac.to_lowercase();
            if let Some(prefix) = self
                .literals
                .mac_prefixes
                .iter()
                .find(|prefix| mac.starts_with(prefix.as_str()))
            {
                pass.record(format!("net:mac_prefix:{prefix}"), MEDIUM, true);
            }
        }
        Ok(())
    }

    fn arp(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        // unreadable on recent Android releases
        let Ok(table) = device.read_text(ARP_TABLE) else {
            return Ok(());
        };
        for line in table.lines().skip(1) {
            let Some(ip) = line.split_whitespace().next() else {
                continue;
            };
            if self.literals.ip_ranges.iter().any(|range| range == ip) {
                pass.record(format!("net:arp:{ip}"), MEDIUM, false);
            }
        }
        Ok(())
    }

    fn sensor_population(&self, device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
        let published = self
            .bus
            .as_ref()
            .and_then(|bus| bus.latest_sensor(self.signal_max_age));
        let signals = match published {
            Some(signals) => signals,
            None => sensors::evaluate(&device.sensors()?, None, &self.literals.proc_tokens),
        };
        if sensors_healthy(&signals) {
            pass.hardware_checks_passed += 1;
        }
        for label in signals.indicators.iter().take(SENSOR_MAX_HINTS) {
            pass.record(format!("sensor:{label}"), LOW, false);
        }
        if signals.suspected_emulation || signals.confidence_score > 0.0 {
            pass.record(
                "sensor:confidence",
                signals.confidence_score,
                signals.suspected_emulation,
            );
        }
        Ok(())
    }

    fn gpu_hints(&self, pass: &mut DetectionPass) {
        let Some(gpu) = self
            .bus
            .as_ref()
            .and_then(|bus| bus.latest_gpu(self.signal_max_age))
        else {
            return;
        };
        if gpu.suspected_virtualization {
            pass.record("gpu:suspected", HIGH, true);
        } else if gpu.confidence_score >= GPU_ELEVATED {
            pass.record("gpu:elevated", MEDIUM, false);
        }
        for hint in gpu.hints.iter().take(GPU_MAX_HINTS) {
            pass.record(format!("gpu:{hint}"), LOW, false);
        }
        if gpu.checks_passed <= GPU_UNDERPERFORM_CHECKS {
            pass.record("gpu:hardware_underperform", LOW, false);
        }
    }
}

fn sensors_healthy(signals: &SensorSignals) -> bool {
    !signals.suspected_emulation
        && signals.missing_core_count == 0
        && signals.total_sensors > HEALTHY_SENSOR_COUNT
}

fn sensor_activity(device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
    let activity = device.sensor_activity(SENSOR_WINDOW_MS)?;
    if activity.sampled >= 2 && activity.varying >= 1 {
        pass.hardware_checks_passed += 1;
    } else {
        pass.record("sensors:static", MEDIUM, false);
    }
    Ok(())
}

/// Live batteries fluctuate; an unset charge counter reads as `None`.
pub fn battery_healthy(telemetry: &BatteryTelemetry) -> bool {
    let samples = &telemetry.current_samples;
    let has_variance = samples.iter().any(|s| *s != samples[0]);
    let counter_valid = telemetry.charge_counter.map_or(true, |counter| counter != 0);
    (samples.is_empty() || has_variance) && counter_valid
}

fn battery(device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
    if battery_healthy(&device.battery()?) {
        pass.hardware_checks_passed += 1;
    } else {
        pass.record("battery:static_battery", LOW, false);
    }
    Ok(())
}

fn imei(device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
    if let Some(imei) = device.imei()? {
        if let Err(violation) = check_imei(imei.trim()) {
            pass.record(format!("imei:{}", violation.reason()), LOW, false);
        }
    }
    Ok(())
}

fn x86_bootloader(device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
    if x86_without_bootloader(device)? {
        pass.record("abi:x86_unknown_bootloader", HIGH, true);
    } else {
        pass.hardware_checks_passed += 1;
    }
    Ok(())
}

fn x86_without_bootloader(device: &dyn DataSource) -> Result<bool, SourceError> {
    let build = device.build_facts()?;
    if !build.primary_abi().to_lowercase().contains("x86") {
        return Ok(false);
    }
    let manufacturer = build.manufacturer.trim().to_lowercase();
    if PHYSICAL_X86_VENDORS.contains(&manufacturer.as_str()) {
        return Ok(false);
    }
    let bootloader = format!(
        "{}{}",
        build.bootloader,
        device.system_property(BOOTLOADER_PROPERTY)?
    )
    .to_lowercase();
    Ok(bootloader.trim().is_empty() || bootloader.contains("unknown"))
}

fn neon(device: &dyn DataSource, pass: &mut DetectionPass) -> CheckResult {
    let passed = !device.build_facts()?.has_arm_abi() || device.neon_probe()?;
    if passed {
        pass.hardware_checks_passed += 1;
    } else {
        pass.record("cpu:neon_failed", MEDIUM, false);
    }
    Ok(())
}
