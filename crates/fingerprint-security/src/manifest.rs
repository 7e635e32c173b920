// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Literal manifest format and cipher, shared with `build.rs`.
//!
//! Included by the build script through `#[path]`, so this file may only
//! use `std` plus the crates listed under `[build-dependencies]`.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// Hex characters kept from the derived key digest.
pub const DERIVED_KEY_LEN: usize = 16;

/// Parse a `category|literal` manifest. Blank lines, `#` comments and lines
/// without a separator are skipped.
pub fn parse_manifest(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let (category, literal) = trimmed.split_once('|')?;
            Some((category.to_uppercase(), literal.to_string()))
        })
        .collect()
}

/// Byte-wise XOR with key cycling. Symmetric: applying it twice restores the input.
pub fn xor_cycle(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return Vec::new();
    }
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

/// Key used when no explicit one is configured: SHA-256 of `package:profile`.
/// Independent of the crate version so a version bump keeps captures readable.
pub fn derive_key(package: &str, profile: &str) -> String {
    let digest = Sha256::digest(format!("{package}:{profile}").as_bytes());
    hex::encode(digest)[..DERIVED_KEY_LEN].to_string()
}

/// Render encoded entries as a Rust `static` slice of `(category, cipher)`.
pub fn render_static<'a, I>(name: &str, entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut out = String::new();
    let _ = writeln!(out, "pub static {name}: &[(&str, &[u8])] = &[");
    for (category, cipher) in entries {
        let bytes: Vec<String> = cipher.iter().map(|b| b.to_string()).collect();
        let _ = writeln!(out, "    ({category:?}, &[{}]),", bytes.join(", "));
    }
    out.push_str("];\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_key_ignores_version() {
        let key = derive_key("fingerprint-security", "release");
        let expected = hex::encode(Sha256::digest(b"fingerprint-security:release"));
        assert_eq!(key, expected[..DERIVED_KEY_LEN]);
        assert_ne!(key, derive_key("fingerprint-security", "debug"));
    }

    #[test]
    fn test_render_static_round_trips_through_xor() {
        let cipher = xor_cycle(b"/sbin/su", b"k");
        let rendered = render_static("ROOT_TABLE", [("PATH", cipher.as_slice())]);
        assert!(rendered.starts_with("pub static ROOT_TABLE: &[(&str, &[u8])] = &[\n"));
        assert!(rendered.contains("(\"PATH\", &["));
        assert!(rendered.ends_with("];\n"));
        assert_eq!(xor_cycle(&cipher, b"k"), b"/sbin/su");
    }

    #[test]
    fn test_xor_with_empty_key_is_empty() {
        assert!(xor_cycle(b"abc", b"").is_empty());
    }
}
