// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;
use std::time::Duration;

use fingerprint_api::{
    capability, sensor_type, BatteryTelemetry, BuildFacts, DeviceSettings, DisplayMetrics,
    GpuSnapshot, NetworkInterface, SensorActivity, SensorInfo, StaticSource, StorageStats, Value,
};
use fingerprint_core::probes::{
    BUILD_INFO, CPU_INFO, DEBUG_INFO, DEVICE_INFO, DISPLAY_INFO, EMULATOR_INFO, GPU_INFO,
    GSF_INFO, MEDIA_DRM_INFO, NETWORK_INFO, ROOT_INFO, SENSOR_INFO, STORAGE_INFO,
};
use fingerprint_core::{FingerprintConfig, Orchestrator};

fn config() -> FingerprintConfig {
    FingerprintConfig::default()
}

fn pixel() -> StaticSource {
    let mut source = StaticSource::default()
        .with_capability(capability::ACCESS_NETWORK_STATE)
        .with_capability(capability::READ_GSERVICES)
        .with_property("ro.secure", "1")
        .with_property("ro.debuggable", "0");
    source.build = BuildFacts {
        brand: "google".into(),
        device: "husky".into(),
        fingerprint: "google/husky/husky:14/UD1A/1:user/release-keys".into(),
        hardware: "husky".into(),
        manufacturer: "Google".into(),
        model: "Pixel 8 Pro".into(),
        product: "husky".into(),
        board: "husky".into(),
        bootloader: "ripcurrent-14.0".into(),
        tags: "release-keys".into(),
        build_type: "user".into(),
        supported_abis: vec!["arm64-v8a".into()],
        sdk_int: 34,
        ..BuildFacts::default()
    };
    source.texts.insert(
        "/proc/cpuinfo".into(),
        "processor\t: 0\nFeatures\t: fp asimd\nCPU implementer\t: 0x41\nHardware\t: Tensor G3\n"
            .into(),
    );
    source.interfaces = Some(vec![NetworkInterface {
        name: "wlan0".into(),
        mac: "3c:28:6d:11:22:33".into(),
    }]);
    source.sensors = Some(vec![
        sensor("LSM6DSV Accelerometer", "STMicro", sensor_type::ACCELEROMETER),
        sensor("MMC56X3X Magnetometer", "memsic", sensor_type::MAGNETIC_FIELD),
        sensor("LSM6DSV Gyroscope", "STMicro", sensor_type::GYROSCOPE),
        sensor("TMD3725 Light", "AMS", 5),
        sensor("TMD3725 Proximity", "AMS", 8),
        sensor("ICP20100 Pressure", "TDK", 6),
    ]);
    source.gpu = Some(GpuSnapshot {
        renderer: "Mali-G715".into(),
        vendor: "ARM".into(),
        version: "OpenGL ES 3.2".into(),
        egl_vendor: "ARM".into(),
        extensions: vec!["GL_EXT_debug_marker".into()],
        max_texture_size: 8_192,
        compute_invocations: 512,
        vulkan_supported: true,
        micro_benchmark_ms: 3.0,
        total_ram_mb: 12_288,
    });
    source.sensor_activity = Some(SensorActivity {
        sampled: 3,
        varying: 3,
    });
    source.realtime_sampling = true;
    source.battery = Some(BatteryTelemetry {
        current_samples: vec![-412, -388, -455],
        charge_counter: Some(3_120_000),
    });
    source.neon_supported = Some(true);
    source.selinux_enforcing = Some(true);
    source.settings = Some(DeviceSettings {
        android_id: Some("9774d56d682e549c".into()),
        global: [("device_provisioned", "1"), ("auto_time", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    });
    source.display = Some(DisplayMetrics {
        width_pixels: 1344,
        height_pixels: 2992,
        density: 2.625,
        density_dpi: 420,
        locales: vec!["en_US".into()],
        ..DisplayMetrics::default()
    });
    source.storage = Some(StorageStats {
        storage_total_bytes: Some(238_353_506_304),
        ram_total_bytes: Some(12_118_720_512),
        ram_threshold_bytes: Some(226_492_416),
    });
    source.gsf_id = Some("3875291062347112094".into());
    source.drm_id = Some(vec![0x0a, 0x1b, 0x2c, 0x3d]);
    source
}

fn sensor(name: &str, vendor: &str, sensor_type: i32) -> SensorInfo {
    SensorInfo {
        name: name.into(),
        vendor: vendor.into(),
        sensor_type,
    }
}

fn flag(report: &fingerprint_api::CollectionReport, probe: &str, key: &str) -> Option<bool> {
    report
        .probe(probe)?
        .fields()?
        .get(key)
        .and_then(Value::as_bool)
}

#[tokio::test]
async fn physical_device_report() {
    let engine = Orchestrator::new(Arc::new(pixel()), config());
    let report = engine.collect(Duration::from_secs(10)).await;

    assert!(report.success, "{:?}", report.error);
    for name in [
        BUILD_INFO,
        DEVICE_INFO,
        DISPLAY_INFO,
        DEBUG_INFO,
        ROOT_INFO,
        EMULATOR_INFO,
        GPU_INFO,
        CPU_INFO,
        STORAGE_INFO,
        SENSOR_INFO,
        NETWORK_INFO,
        GSF_INFO,
        MEDIA_DRM_INFO,
    ] {
        let output = report.probe(name).unwrap_or_else(|| panic!("missing {name}"));
        assert!(!output.is_error(), "{name}: {:?}", output.failure());
    }
    assert_eq!(flag(&report, EMULATOR_INFO, "isEmulator"), Some(false));
    // sampling really waits its window; the default budget still covers it
    assert_eq!(flag(&report, EMULATOR_INFO, "timedOut"), Some(false));
    assert_eq!(flag(&report, ROOT_INFO, "isRooted"), Some(false));
    assert_eq!(flag(&report, GPU_INFO, "suspectedVirtualization"), Some(false));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["buildInfo"]["model"], "Pixel 8 Pro");
    assert_eq!(json["deviceInfo"]["androidId"], "9774d56d682e549c");
    assert_eq!(json["gsfInfo"]["gsfId"], "35c7ccb064721e9e");
    assert_eq!(json["storageInfo"]["ramTotalBytes"], 12_118_720_512u64);
    assert_eq!(json["success"], true);
    assert!(json["timestamp"].is_i64());
}

#[tokio::test]
async fn emulator_report() {
    let mut source = StaticSource::default()
        .with_file("/dev/qemu_pipe")
        .with_property("ro.kernel.qemu", "1")
        .with_property("ro.hardware", "ranchu");
    source.build = BuildFacts {
        fingerprint: "google/sdk_gphone64_x86_64/emu64xa:14/UE1A/1:userdebug/dev-keys".into(),
        hardware: "ranchu".into(),
        model: "sdk_gphone64_x86_64".into(),
        manufacturer: "unknown".into(),
        supported_abis: vec!["x86_64".into()],
        ..BuildFacts::default()
    };

    let engine = Orchestrator::new(Arc::new(source), config());
    let report = engine.collect(Duration::from_secs(10)).await;

    assert!(report.success);
    assert_eq!(flag(&report, EMULATOR_INFO, "isEmulator"), Some(true));
    // no network capability granted
    let network = report.probe(NETWORK_INFO).unwrap().failure().unwrap();
    assert!(network.permission_required);
    // withheld GPU strings surface as a permission error, not a crash
    assert!(report.probe(GPU_INFO).unwrap().failure().unwrap().permission_required);
    // no gservices provider on this image
    assert!(report.probe(GSF_INFO).is_none());
    assert_eq!(
        report.probe(MEDIA_DRM_INFO).unwrap().fields().unwrap()["id"],
        Value::from("error")
    );
}

#[tokio::test]
async fn same_facts_same_fingerprint() {
    let a = Orchestrator::new(Arc::new(pixel()), config())
        .collect(Duration::from_secs(10))
        .await;
    let b = Orchestrator::new(Arc::new(pixel()), config())
        .collect(Duration::from_secs(10))
        .await;
    assert_eq!(a.fingerprint, b.fingerprint);
}
