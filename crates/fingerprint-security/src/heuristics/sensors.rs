// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Sensor population heuristics.

use std::collections::BTreeSet;

use fingerprint_api::{sensor_type, SensorActivity, SensorInfo};

use super::{IndicatorSet, HIGH, LOW, MEDIUM};
use crate::signal_bus::SensorSignals;

/// Confidence at which the sensor population alone is considered emulated.
pub const SUSPECTED_THRESHOLD: f64 = 0.6;

const CORE_TYPES: [(i32, &str); 3] = [
    (sensor_type::ACCELEROMETER, "accelerometer"),
    (sensor_type::MAGNETIC_FIELD, "magnetic_field"),
    (sensor_type::GYROSCOPE, "gyroscope"),
];

const GENERIC_VENDORS: [&str; 2] = ["the android open source project", "aosp"];

/// Score a sensor list. `emulator_tokens` are matched against sensor names
/// and vendors (e.g. `goldfish`).
pub fn evaluate(
    sensors: &[SensorInfo],
    activity: Option<SensorActivity>,
    emulator_tokens: &[String],
) -> SensorSignals {
    let mut set = IndicatorSet::new();

    let vendors: BTreeSet<String> = sensors.iter().map(|s| s.vendor.to_lowercase()).collect();
    let types: BTreeSet<i32> = sensors.iter().map(|s| s.sensor_type).collect();

    if sensors.is_empty() {
        set.record("no_sensors", HIGH, true);
    } else if sensors.len() < 5 {
        set.record("few_sensors", LOW, false);
    }

    let missing_core: Vec<&str> = CORE_TYPES
        .iter()
        .filter(|(id, _)| !types.contains(id))
        .map(|(_, name)| *name)
        .collect();
    for name in &missing_core {
        set.record(format!("missing_core:{name}"), MEDIUM, false);
    }

    for sensor in sensors {
        let haystack = format!("{} {}", sensor.name, sensor.vendor).to_lowercase();
        if let Some(token) = emulator_tokens.iter().find(|t| haystack.contains(t.as_str())) {
            set.record(format!("emulator_sensor:{token}"), HIGH, true);
        }
    }

    if vendors.iter().any(|v| GENERIC_VENDORS.contains(&v.as_str())) {
        set.record("generic_vendor", MEDIUM, false);
    }
    if vendors.len() == 1 && sensors.len() > 3 {
        set.record("single_vendor", LOW, false);
    }

    if let Some(activity) = activity {
        if activity.sampled > 0 && activity.varying == 0 {
            set.record("static_readings", MEDIUM, false);
        }
    }

    let confidence = set.score();
    SensorSignals {
        confidence_score: confidence,
        suspected_emulation: set.high_confidence_count() > 0 || confidence >= SUSPECTED_THRESHOLD,
        indicators: set.labels(),
        total_sensors: sensors.len(),
        missing_core_count: missing_core.len(),
        unique_vendors: vendors.len(),
        unique_types: types.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(name: &str, vendor: &str, sensor_type: i32) -> SensorInfo {
        SensorInfo {
            name: name.into(),
            vendor: vendor.into(),
            sensor_type,
        }
    }

    fn tokens() -> Vec<String> {
        vec!["goldfish".into(), "ranchu".into()]
    }

    fn phone_sensors() -> Vec<SensorInfo> {
        vec![
            sensor("LSM6DSO Accelerometer", "STMicro", sensor_type::ACCELEROMETER),
            sensor("AK09918 Magnetometer", "AKM", sensor_type::MAGNETIC_FIELD),
            sensor("LSM6DSO Gyroscope", "STMicro", sensor_type::GYROSCOPE),
            sensor("TMD3719 Light", "AMS", 5),
            sensor("TMD3719 Proximity", "AMS", 8),
            sensor("BMP380 Pressure", "Bosch", 6),
        ]
    }

    #[test]
    fn test_physical_phone_is_clean() {
        let signals = evaluate(&phone_sensors(), None, &tokens());
        assert!(!signals.suspected_emulation);
        assert!(signals.indicators.is_empty());
        assert_eq!(signals.missing_core_count, 0);
        assert_eq!(signals.unique_vendors, 4);
        assert_eq!(signals.unique_types, 6);
    }

    #[test]
    fn test_goldfish_sensors_are_high_confidence() {
        let sensors = vec![sensor(
            "Goldfish 3-axis Accelerometer",
            "The Android Open Source Project",
            sensor_type::ACCELEROMETER,
        )];
        let signals = evaluate(&sensors, None, &tokens());
        assert!(signals.suspected_emulation);
        assert!(signals
            .indicators
            .contains(&"emulator_sensor:goldfish".to_string()));
        assert_eq!(signals.missing_core_count, 2);
    }

    #[test]
    fn test_empty_list() {
        let signals = evaluate(&[], None, &tokens());
        assert!(signals.suspected_emulation);
        assert_eq!(signals.total_sensors, 0);
        assert_eq!(signals.missing_core_count, 3);
    }

    #[test]
    fn test_static_readings_alone_are_not_suspected() {
        let activity = SensorActivity {
            sampled: 3,
            varying: 0,
        };
        let signals = evaluate(&phone_sensors(), Some(activity), &tokens());
        assert_eq!(signals.indicators, vec!["static_readings"]);
        assert!(!signals.suspected_emulation);
    }
}
