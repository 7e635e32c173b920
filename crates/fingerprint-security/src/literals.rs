// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Decoded detection literals.
//!
//! The tables below are generated by `build.rs` from `strings/*.txt` and are
//! only ever present in the binary in encoded form.

use zeroize::Zeroizing;

use crate::string_table::{
    StringTable, CATEGORY_DEVICE, CATEGORY_EGL_VENDOR, CATEGORY_ENV, CATEGORY_EXTENSION,
    CATEGORY_IP_RANGE, CATEGORY_MAC_PREFIX, CATEGORY_PACKAGE, CATEGORY_PATH, CATEGORY_PROC_TOKEN,
    CATEGORY_PROPERTY, CATEGORY_RENDERER, CATEGORY_VENDOR,
};

mod generated {
    include!(concat!(env!("OUT_DIR"), "/string_tables.rs"));
}

pub use generated::EXPECTED_INTEGRITY_HASH;

/// Holds the per-release key for the lifetime of a decoding pass.
pub struct StringDecoder {
    key: Zeroizing<String>,
}

impl StringDecoder {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Zeroizing::new(key.into()),
        }
    }

    /// Decoder using the key baked in at build time.
    pub fn embedded() -> Self {
        Self::new(generated::STRING_KEY)
    }

    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }

    pub fn decode(&self, table: &StringTable, category: &str) -> Vec<String> {
        table.decode(category, &self.key)
    }
}

pub fn emulator_table() -> StringTable {
    StringTable::from_static(generated::EMULATOR_TABLE)
}

pub fn root_table() -> StringTable {
    StringTable::from_static(generated::ROOT_TABLE)
}

pub fn gpu_table() -> StringTable {
    StringTable::from_static(generated::GPU_TABLE)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatorLiterals {
    pub paths: Vec<String>,
    pub properties: Vec<String>,
    pub device_tokens: Vec<String>,
    pub mac_prefixes: Vec<String>,
    pub ip_ranges: Vec<String>,
    pub proc_tokens: Vec<String>,
}

impl EmulatorLiterals {
    pub fn decode(table: &StringTable, decoder: &StringDecoder) -> Self {
        Self {
            paths: decoder.decode(table, CATEGORY_PATH),
            properties: decoder.decode(table, CATEGORY_PROPERTY),
            device_tokens: lowercase(decoder.decode(table, CATEGORY_DEVICE)),
            mac_prefixes: lowercase(decoder.decode(table, CATEGORY_MAC_PREFIX)),
            ip_ranges: decoder.decode(table, CATEGORY_IP_RANGE),
            proc_tokens: lowercase(decoder.decode(table, CATEGORY_PROC_TOKEN)),
        }
    }

    pub fn embedded() -> Self {
        Self::decode(&emulator_table(), &StringDecoder::embedded())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootLiterals {
    pub paths: Vec<String>,
    pub properties: Vec<String>,
    pub packages: Vec<String>,
    pub env_vars: Vec<String>,
}

impl RootLiterals {
    pub fn decode(table: &StringTable, decoder: &StringDecoder) -> Self {
        Self {
            paths: decoder.decode(table, CATEGORY_PATH),
            properties: decoder.decode(table, CATEGORY_PROPERTY),
            packages: decoder.decode(table, CATEGORY_PACKAGE),
            env_vars: decoder.decode(table, CATEGORY_ENV),
        }
    }

    pub fn embedded() -> Self {
        Self::decode(&root_table(), &StringDecoder::embedded())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuPatterns {
    pub renderers: Vec<String>,
    pub vendors: Vec<String>,
    pub extensions: Vec<String>,
    pub egl_vendors: Vec<String>,
}

impl GpuPatterns {
    pub fn decode(table: &StringTable, decoder: &StringDecoder) -> Self {
        Self {
            renderers: lowercase(decoder.decode(table, CATEGORY_RENDERER)),
            vendors: lowercase(decoder.decode(table, CATEGORY_VENDOR)),
            extensions: decoder.decode(table, CATEGORY_EXTENSION),
            egl_vendors: lowercase(decoder.decode(table, CATEGORY_EGL_VENDOR)),
        }
    }

    pub fn embedded() -> Self {
        Self::decode(&gpu_table(), &StringDecoder::embedded())
    }
}

fn lowercase(values: Vec<String>) -> Vec<String> {
    values.into_iter().map(|v| v.to_lowercase()).collect()
}
