// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Obfuscated string table.
//!
//! Sensitive literals (paths, property names, package names) are stored as
//! `plain[i] XOR key[i % key.len()]` and only decoded at the point of use.
//! This deters casual static analysis; it is not confidentiality.

use thiserror::Error;
use tracing::warn;
use zeroize::Zeroizing;

pub use crate::manifest::{parse_manifest, xor_cycle};
use crate::manifest::render_static;

pub const CATEGORY_PATH: &str = "PATH";
pub const CATEGORY_PROPERTY: &str = "PROPERTY";
pub const CATEGORY_DEVICE: &str = "DEVICE";
pub const CATEGORY_MAC_PREFIX: &str = "MAC_PREFIX";
pub const CATEGORY_IP_RANGE: &str = "IP_RANGE";
pub const CATEGORY_PROC_TOKEN: &str = "PROC_TOKEN";
pub const CATEGORY_PACKAGE: &str = "PACKAGE";
pub const CATEGORY_ENV: &str = "ENV";
pub const CATEGORY_RENDERER: &str = "RENDERER";
pub const CATEGORY_VENDOR: &str = "VENDOR";
pub const CATEGORY_EXTENSION: &str = "EXTENSION";
pub const CATEGORY_EGL_VENDOR: &str = "EGL_VENDOR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("obfuscation key must not be empty")]
    EmptyKey,

    #[error("malformed manifest line {line}: {content:?}")]
    MalformedLine { line: usize, content: String },
}

/// One encoded literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObfuscatedEntry {
    pub category: String,
    pub cipher: Vec<u8>,
}

impl ObfuscatedEntry {
    pub fn encode(category: &str, plain: &str, key: &str) -> Result<Self, TableError> {
        if key.is_empty() {
            return Err(TableError::EmptyKey);
        }
        Ok(Self {
            category: category.to_uppercase(),
            cipher: xor_cycle(plain.as_bytes(), key.as_bytes()),
        })
    }

    /// `None` for an empty key or bytes that do not decode to UTF-8.
    pub fn decode(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }
        let plain = Zeroizing::new(xor_cycle(&self.cipher, key.as_bytes()));
        String::from_utf8(plain.to_vec()).ok()
    }
}

/// Encode a single literal with `key`.
pub fn encode(plain: &str, key: &str) -> Vec<u8> {
    xor_cycle(plain.as_bytes(), key.as_bytes())
}

/// Decode a single cipher. Fail-closed: an empty key yields an empty string.
pub fn decode(cipher: &[u8], key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let plain = Zeroizing::new(xor_cycle(cipher, key.as_bytes()));
    String::from_utf8_lossy(&plain).into_owned()
}

/// Like [`parse_manifest`] but rejects lines without a separator.
pub fn parse_manifest_strict(text: &str) -> Result<Vec<(String, String)>, TableError> {
    let mut entries = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match trimmed.split_once('|') {
            Some((category, literal)) if !category.is_empty() => {
                entries.push((category.to_uppercase(), literal.to_string()));
            }
            _ => {
                return Err(TableError::MalformedLine {
                    line: index + 1,
                    content: trimmed.to_string(),
                })
            }
        }
    }
    Ok(entries)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    entries: Vec<ObfuscatedEntry>,
}

impl StringTable {
    pub fn new(entries: Vec<ObfuscatedEntry>) -> Self {
        Self { entries }
    }

    pub fn from_static(raw: &[(&str, &[u8])]) -> Self {
        let entries = raw
            .iter()
            .map(|(category, cipher)| ObfuscatedEntry {
                category: category.to_string(),
                cipher: cipher.to_vec(),
            })
            .collect();
        Self { entries }
    }

    pub fn from_manifest(text: &str, key: &str) -> Result<Self, TableError> {
        let entries = parse_manifest(text)
            .into_iter()
            .map(|(category, literal)| ObfuscatedEntry::encode(&category, &literal, key))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ObfuscatedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode every entry of `category`. An empty key yields nothing.
    pub fn decode(&self, category: &str, key: &str) -> Vec<String> {
        if key.is_empty() {
            warn!(category, "string table key missing, decoding disabled");
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .filter_map(|entry| entry.decode(key))
            .filter(|value| !value.trim().is_empty())
            .collect()
    }

    /// Render the table as a Rust `static` for embedding into a release build.
    pub fn render_rust(&self, name: &str) -> String {
        render_static(
            name,
            self.entries
                .iter()
                .map(|entry| (entry.category.as_str(), entry.cipher.as_slice())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    const MANIFEST: &str = "\
# comment
path|/system/xbin/su
PROPERTY|ro.secure

package|com.topjohnwu.magisk
broken line
path|
";

    #[test]
    fn test_parse_manifest_skips_comments_and_malformed() {
        let entries = parse_manifest(MANIFEST);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], ("PATH".to_string(), "/system/xbin/su".to_string()));
        assert_eq!(entries[1].0, "PROPERTY");
    }

    #[test]
    fn test_parse_manifest_strict_reports_line() {
        let err = parse_manifest_strict(MANIFEST).unwrap_err();
        assert_matches!(err, TableError::MalformedLine { line: 6, .. });
    }

    #[test]
    fn test_table_decode_by_category_drops_blank() {
        let table = StringTable::from_manifest(MANIFEST, "k3y").unwrap();
        assert_eq!(table.decode(CATEGORY_PATH, "k3y"), vec!["/system/xbin/su"]);
        assert_eq!(table.decode(CATEGORY_PACKAGE, "k3y"), vec!["com.topjohnwu.magisk"]);
        assert!(table.decode(CATEGORY_ENV, "k3y").is_empty());
    }

    #[test]
    fn test_decode_fails_closed_without_key() {
        let table = StringTable::from_manifest(MANIFEST, "k3y").unwrap();
        assert!(table.decode(CATEGORY_PATH, "").is_empty());
    }

    #[test]
    fn test_encode_rejects_empty_key() {
        assert_eq!(
            StringTable::from_manifest(MANIFEST, ""),
            Err(TableError::EmptyKey)
        );
    }

    #[test]
    fn test_cipher_differs_from_plaintext() {
        let entry = ObfuscatedEntry::encode("path", "/sbin/su", "0f3a").unwrap();
        assert_ne!(entry.cipher, b"/sbin/su".to_vec());
        assert_eq!(entry.category, "PATH");
    }

    #[test]
    fn test_wrong_key_does_not_reveal_literal() {
        let cipher = encode("/data/adb/magisk", "release-a");
        assert_ne!(decode(&cipher, "release-b"), "/data/adb/magisk");
    }

    #[test]
    fn test_render_rust_lists_every_entry() {
        let table = StringTable::from_manifest("path|/a\nenv|B\n", "k").unwrap();
        let rendered = table.render_rust("ROOT_TABLE");
        assert!(rendered.starts_with("pub static ROOT_TABLE"));
        assert!(rendered.contains("(\"PATH\", &["));
        assert!(rendered.contains("(\"ENV\", &["));
    }

    proptest! {
        #[test]
        fn prop_round_trip(plain in "\\PC{0,64}", key in "[ -~]{1,32}") {
            let cipher = encode(&plain, &key);
            prop_assert_eq!(decode(&cipher, &key), plain.clone());
            prop_assert_eq!(decode(&cipher, ""), "");
        }

        #[test]
        fn prop_table_round_trip_per_category(
            literals in proptest::collection::vec("[a-z0-9/._-]{1,24}", 1..8),
            key in "[ -~]{1,24}",
        ) {
            for category in [CATEGORY_PATH, CATEGORY_PROPERTY, CATEGORY_PACKAGE, CATEGORY_ENV] {
                let entries = literals
                    .iter()
                    .map(|l| ObfuscatedEntry::encode(category, l, &key).unwrap())
                    .collect();
                let table = StringTable::new(entries);
                prop_assert_eq!(table.decode(category, &key), literals.clone());
            }
        }
    }
}
