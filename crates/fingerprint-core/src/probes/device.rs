// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;

use async_trait::async_trait;
use fingerprint_api::{DataSource, DeviceSettings, Fields, FieldsExt, Probe, ProbeError, Value};

use super::DEVICE_INFO;

const UNKNOWN_ANDROID_ID: &str = "unknown";
const DEFAULT_ANIMATION_SCALE: &str = "1.0";

#[derive(Clone, Copy)]
enum Kind {
    /// Integer setting, `0` when unset or unparsable.
    Flag,
    /// Animation scale string, `1.0` when unset.
    Scale,
    /// Free-form string, null when unset.
    Text,
}

const SETTINGS: [(&str, &str, Kind); 22] = [
    ("developmentSettingsEnabled", "development_settings_enabled", Kind::Flag),
    ("waitForDebugger", "wait_for_debugger", Kind::Flag),
    ("airplaneModeOn", "airplane_mode_on", Kind::Flag),
    ("bootCount", "boot_count", Kind::Flag),
    ("deviceProvisioned", "device_provisioned", Kind::Flag),
    ("dataRoaming", "data_roaming", Kind::Flag),
    ("stayOnWhilePluggedIn", "stay_on_while_plugged_in", Kind::Flag),
    ("animatorDurationScale", "animator_duration_scale", Kind::Scale),
    ("transitionAnimationScale", "transition_animation_scale", Kind::Scale),
    ("windowAnimationScale", "window_animation_scale", Kind::Scale),
    ("autoTime", "auto_time", Kind::Flag),
    ("autoTimeZone", "auto_time_zone", Kind::Flag),
    ("bluetoothOn", "bluetooth_on", Kind::Flag),
    ("bluetoothDiscoverability", "bluetooth_discoverability", Kind::Text),
    ("bluetoothDiscoverabilityTimeout", "bluetooth_discoverability_timeout", Kind::Text),
    ("httpProxy", "http_proxy", Kind::Text),
    ("networkPreference", "network_preference", Kind::Text),
    ("usbMassStorageEnabled", "usb_mass_storage_enabled", Kind::Text),
    ("wifiNetworksAvailableNotificationOn", "wifi_networks_available_notification_on", Kind::Text),
    ("alwaysFinishActivities", "always_finish_activities", Kind::Flag),
    ("modeRinger", "mode_ringer", Kind::Text),
    ("airplaneModeRadios", "airplane_mode_radios", Kind::Text),
];

/// Android id and global settings.
pub struct DeviceInfoProbe;

#[async_trait]
impl Probe for DeviceInfoProbe {
    fn name(&self) -> &str {
        DEVICE_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        Ok(settings_fields(&device.device_settings()?))
    }
}

pub fn settings_fields(settings: &DeviceSettings) -> Fields {
    let mut fields = Fields::new();
    fields.put(
        "androidId",
        settings
            .android_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_ANDROID_ID.to_string()),
    );
    for (key, setting, kind) in SETTINGS {
        let raw = settings.global.get(setting);
        let value = match kind {
            Kind::Flag => Value::from(raw.and_then(|v| v.trim().parse::<i64>().ok()).unwrap_or(0)),
            Kind::Scale => Value::from(raw.map_or(DEFAULT_ANIMATION_SCALE, String::as_str)),
            Kind::Text => Value::from(raw.cloned()),
        };
        fields.put(key, value);
    }
    fields
}
