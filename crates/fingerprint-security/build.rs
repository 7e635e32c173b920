// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

// Build script for the obfuscated string tables
// Encodes strings/*.txt with the per-release key and bakes the integrity baseline

use std::env;
use std::fs;
use std::path::Path;

#[allow(dead_code)]
#[path = "src/manifest.rs"]
mod manifest;

use manifest::{derive_key, parse_manifest, render_static, xor_cycle};

const TABLES: &[(&str, &str)] = &[
    ("EMULATOR_TABLE", "strings/emulator.txt"),
    ("ROOT_TABLE", "strings/root.txt"),
    ("GPU_TABLE", "strings/gpu.txt"),
];

fn main() {
    println!("cargo:rerun-if-changed=strings");
    println!("cargo:rerun-if-changed=src/manifest.rs");
    println!("cargo:rerun-if-env-changed=FINGERPRINT_STRING_KEY");
    println!("cargo:rerun-if-env-changed=FINGERPRINT_INTEGRITY_HASH");

    let key = release_key();
    let integrity_hash =
        env::var("FINGERPRINT_INTEGRITY_HASH").unwrap_or_else(|_| "UNSET".to_string());

    let mut out = format!(
        "pub const STRING_KEY: &str = {key:?};\npub const EXPECTED_INTEGRITY_HASH: &str = {integrity_hash:?};\n"
    );

    for (name, path) in TABLES {
        println!("cargo:rerun-if-changed={path}");
        let text =
            fs::read_to_string(path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
        let entries: Vec<(String, Vec<u8>)> = parse_manifest(&text)
            .into_iter()
            .map(|(category, literal)| (category, xor_cycle(literal.as_bytes(), key.as_bytes())))
            .collect();
        out.push_str(&render_static(
            name,
            entries.iter().map(|(c, b)| (c.as_str(), b.as_slice())),
        ));
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    fs::write(Path::new(&out_dir).join("string_tables.rs"), out)
        .expect("failed to write string_tables.rs");
}

/// Per-release key: explicit override, else derived from package name and profile.
fn release_key() -> String {
    if let Ok(key) = env::var("FINGERPRINT_STRING_KEY") {
        if !key.is_empty() {
            return key;
        }
    }
    let package = env::var("CARGO_PKG_NAME").unwrap_or_default();
    let profile = env::var("PROFILE").unwrap_or_default();
    derive_key(&package, &profile)
}
