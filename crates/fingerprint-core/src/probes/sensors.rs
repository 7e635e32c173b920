// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{
    sensor_type, DataSource, Fields, FieldsExt, Probe, ProbeError, SensorInfo, Value,
};
use fingerprint_security::heuristics::sensors;
use fingerprint_security::HeuristicBus;
use tracing::debug;

use super::{optional, round2, ProbeContext, SENSOR_INFO};

const COMMON_SENSORS: [(i32, &str); 3] = [
    (sensor_type::ACCELEROMETER, "accelerometer"),
    (sensor_type::MAGNETIC_FIELD, "magneticField"),
    (sensor_type::GYROSCOPE, "gyroscope"),
];
const ACTIVITY_WINDOW_MS: u64 = 500;
const GOLDFISH: &str = "goldfish";

/// Sensor inventory plus the sensor population heuristics, published on the
/// signal bus for the emulator probe.
pub struct SensorInfoProbe {
    bus: Arc<HeuristicBus>,
    emulator_tokens: Vec<String>,
}

impl SensorInfoProbe {
    pub fn new(ctx: &ProbeContext) -> Self {
        Self {
            bus: ctx.bus.clone(),
            emulator_tokens: ctx.emulator_literals.proc_tokens.clone(),
        }
    }
}

#[async_trait]
impl Probe for SensorInfoProbe {
    fn name(&self) -> &str {
        SENSOR_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        // sampling blocks for the whole window
        let task = tokio::task::spawn_blocking(move || {
            let list = device.sensors()?;
            let activity = optional(device.sensor_activity(ACTIVITY_WINDOW_MS))?;
            Ok::<_, ProbeError>((list, activity))
        });
        let (list, activity) = match task.await {
            Ok(read) => read?,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => return Err(ProbeError::Failed(err.to_string())),
        };

        let signals = sensors::evaluate(&list, activity, &self.emulator_tokens);
        debug!(
            sensors = list.len(),
            suspected = signals.suspected_emulation,
            "sensor heuristics evaluated"
        );

        let mut fields = inventory(&list);
        fields.put("confidenceScore", round2(signals.confidence_score));
        fields.put("suspectedEmulation", signals.suspected_emulation);
        fields.put("heuristicIndicators", signals.indicators.clone());
        self.bus.publish_sensor(signals);
        Ok(fields)
    }
}

fn inventory(list: &[SensorInfo]) -> Fields {
    let mut vendor_counts: BTreeMap<String, usize> = BTreeMap::new();
    for sensor in list {
        *vendor_counts.entry(sensor.vendor.clone()).or_default() += 1;
    }
    let types: BTreeSet<i32> = list.iter().map(|s| s.sensor_type).collect();
    let missing: Vec<String> = COMMON_SENSORS
        .iter()
        .filter(|(id, _)| !types.contains(id))
        .map(|(_, name)| name.to_string())
        .collect();
    let goldfish = list
        .iter()
        .filter(|s| {
            let haystack = format!("{} {}", s.name, s.vendor).to_lowercase();
            haystack.contains(GOLDFISH) || haystack.contains("aosp")
        })
        .count();

    let entries: Vec<Value> = list
        .iter()
        .map(|sensor| {
            let mut entry = Fields::new();
            entry.put("name", sensor.name.as_str());
            entry.put("vendor", sensor.vendor.as_str());
            entry.put("type", sensor.sensor_type);
            Value::Map(entry)
        })
        .collect();
    let counts: Fields = vendor_counts
        .into_iter()
        .map(|(vendor, count)| (vendor, Value::from(count)))
        .collect();

    let mut fields = Fields::new();
    fields.put("sensors", entries);
    fields.put("totalSensors", list.len());
    fields.put("vendorCounts", counts);
    fields.put("missingCommonSensors", missing);
    fields.put("aospGoldfishSensorCount", goldfish);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerprint_api::{SensorActivity, StaticSource};
    use std::time::Duration;

    fn sensor(name: &str, vendor: &str, sensor_type: i32) -> SensorInfo {
        SensorInfo {
            name: name.into(),
            vendor: vendor.into(),
            sensor_type,
        }
    }

    fn probe(bus: Arc<HeuristicBus>) -> SensorInfoProbe {
        SensorInfoProbe {
            bus,
            emulator_tokens: vec!["goldfish".into()],
        }
    }

    #[tokio::test]
    async fn test_emulated_sensors_are_published() {
        let bus = Arc::new(HeuristicBus::new());
        let source = StaticSource {
            sensors: Some(vec![
                sensor("Goldfish 3-axis Accelerometer", "The Android Open Source Project", 1),
                sensor("Goldfish 3-axis Gyroscope", "The Android Open Source Project", 4),
            ]),
            sensor_activity: Some(SensorActivity {
                sampled: 20,
                varying: 0,
            }),
            ..StaticSource::default()
        };
        let fields = probe(bus.clone()).run(Arc::new(source)).await.unwrap();

        assert_eq!(fields["totalSensors"], Value::Int(2));
        assert_eq!(fields["aospGoldfishSensorCount"], Value::Int(2));
        assert_eq!(
            fields["missingCommonSensors"],
            Value::from(vec!["magneticField".to_string()])
        );
        assert_eq!(fields["suspectedEmulation"], Value::Bool(true));

        let published = bus.latest_sensor(Duration::from_secs(10)).unwrap();
        assert!(published.suspected_emulation);
        assert_eq!(published.total_sensors, 2);
    }

    #[tokio::test]
    async fn test_denied_sensor_list_is_permission_error() {
        let bus = Arc::new(HeuristicBus::new());
        let err = probe(bus.clone())
            .run(Arc::new(StaticSource::default()))
            .await
            .unwrap_err();
        assert!(err.is_permission_error());
        assert!(bus.latest_sensor(Duration::from_secs(10)).is_none());
    }
}
