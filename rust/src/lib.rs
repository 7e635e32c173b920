// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Fingerprint engine - JNI bindings
//!
//! Every entry point returns a JSON string. Failures are reported inside the
//! JSON document; `null` is only returned when the JVM cannot allocate the
//! string at all.

use std::sync::Arc;
use std::time::Duration;

use fingerprint_api::{CollectionReport, ProbeOutput};
use fingerprint_core::{FingerprintConfig, HostDataSource, Orchestrator};
use jni::objects::{JClass, JString};
use jni::sys::{jlong, jstring};
use jni::JNIEnv;
use once_cell::sync::Lazy;
use tokio::runtime::Runtime;
use tracing::{info, warn};

#[cfg(target_os = "android")]
use android_logger::Config;
#[cfg(target_os = "android")]
use log::LevelFilter;

/// Optional TOML config path, read once when the engine is first used.
const CONFIG_ENV: &str = "FINGERPRINT_CONFIG";

static RUNTIME: Lazy<Option<Runtime>> = Lazy::new(|| {
    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("fingerprint")
        .build()
    {
        Ok(rt) => Some(rt),
        Err(err) => {
            warn!(error = %err, "failed to start runtime");
            None
        }
    }
});

static ENGINE: Lazy<Orchestrator> = Lazy::new(|| {
    Orchestrator::new(Arc::new(HostDataSource::new()), load_config())
});

fn load_config() -> FingerprintConfig {
    let Some(path) = std::env::var_os(CONFIG_ENV) else {
        return FingerprintConfig::default();
    };
    match FingerprintConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "falling back to default configuration");
            FingerprintConfig::default()
        }
    }
}

fn error_json(message: &str) -> String {
    serde_json::to_string(&ProbeOutput::failed(message, false))
        .unwrap_or_else(|_| r#"{"error":"serialization failed","permissionRequired":false}"#.into())
}

fn into_jstring(env: &mut JNIEnv, json: &str) -> jstring {
    match env.new_string(json) {
        Ok(jstr) => jstr.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn collect_json(timeout_ms: jlong) -> String {
    let Some(rt) = RUNTIME.as_ref() else {
        return failed_report_json("runtime unavailable");
    };
    let report = rt.block_on(async {
        if timeout_ms > 0 {
            ENGINE.collect(Duration::from_millis(timeout_ms as u64)).await
        } else {
            ENGINE.collect_default().await
        }
    });
    report
        .to_json()
        .unwrap_or_else(|err| failed_report_json(&err.to_string()))
}

fn failed_report_json(message: &str) -> String {
    CollectionReport::failed(message, 0)
        .to_json()
        .unwrap_or_else(|_| r#"{"success":false,"error":"serialization failed"}"#.into())
}

fn collect_single_json(name: &str) -> String {
    let Some(rt) = RUNTIME.as_ref() else {
        return error_json("runtime unavailable");
    };
    match rt.block_on(ENGINE.collect_single(name)) {
        Some(output) => serde_json::to_string(&output)
            .unwrap_or_else(|err| error_json(&err.to_string())),
        None => error_json(&format!("Unknown probe: {name}")),
    }
}

#[cfg(target_os = "android")]
#[no_mangle]
pub extern "C" fn Java_com_protosdk_sdk_fingerprint_NativeFingerprint_nativeInit(
    _env: JNIEnv,
    _class: JClass,
) {
    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Info)
            .with_tag("ProtoFingerprint"),
    );
    info!(probes = ENGINE.available_probes().len(), "fingerprint engine ready");
}

#[cfg(not(target_os = "android"))]
#[no_mangle]
pub extern "C" fn Java_com_protosdk_sdk_fingerprint_NativeFingerprint_nativeInit(
    _env: JNIEnv,
    _class: JClass,
) {
    info!(probes = ENGINE.available_probes().len(), "fingerprint engine ready");
}

/// Run a full collection - JNI entry point
///
/// `timeout_ms <= 0` uses the configured default deadline.
#[no_mangle]
pub extern "C" fn Java_com_protosdk_sdk_fingerprint_NativeFingerprint_nativeCollect(
    mut env: JNIEnv,
    _class: JClass,
    timeout_ms: jlong,
) -> jstring {
    let json = collect_json(timeout_ms);
    into_jstring(&mut env, &json)
}

/// Run one probe by name - JNI entry point
#[no_mangle]
pub extern "C" fn Java_com_protosdk_sdk_fingerprint_NativeFingerprint_nativeCollectSingle(
    mut env: JNIEnv,
    _class: JClass,
    name: JString,
) -> jstring {
    let name: String = match env.get_string(&name) {
        Ok(s) => s.into(),
        Err(_) => {
            let json = error_json("invalid probe name");
            return into_jstring(&mut env, &json);
        }
    };
    let json = collect_single_json(&name);
    into_jstring(&mut env, &json)
}

/// Registered probes with their capability requirements - JNI entry point
#[no_mangle]
pub extern "C" fn Java_com_protosdk_sdk_fingerprint_NativeFingerprint_nativeProbeInfo(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    let json = serde_json::to_string(&ENGINE.all_probe_info()).unwrap_or_else(|_| "[]".into());
    into_jstring(&mut env, &json)
}
