// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Anti-tamper integrity check.
//!
//! Every executable payload file is hashed on its own, the per-file digests
//! are sorted and the concatenation is hashed again. The result therefore does
//! not depend on the order the files were enumerated in.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::literals::EXPECTED_INTEGRITY_HASH;

/// Placeholder baked in when no baseline was provided at build time.
pub const UNSET: &str = "UNSET";

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to enumerate payload: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("no payload files found under {0}")]
    NoPayload(PathBuf),
}

/// Produces the combined digest of the executable payload.
#[cfg_attr(test, mockall::automock)]
pub trait PayloadHasher: Send + Sync {
    fn payload_digest(&self) -> Result<String, IntegrityError>;
}

/// Payload made of every file under `root` whose extension is listed.
#[derive(Debug, Clone)]
pub struct DirectoryPayload {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryPayload {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
        }
    }

    pub fn files(&self) -> Result<Vec<PathBuf>, IntegrityError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

impl PayloadHasher for DirectoryPayload {
    fn payload_digest(&self) -> Result<String, IntegrityError> {
        let files = self.files()?;
        if files.is_empty() {
            return Err(IntegrityError::NoPayload(self.root.clone()));
        }
        let digests = files
            .iter()
            .map(|path| hash_file(path))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(files = digests.len(), "payload hashed");
        Ok(combine_digests(digests))
    }
}

/// Lowercase hex SHA-256 of one file.
pub fn hash_file(path: &Path) -> Result<String, IntegrityError> {
    let io_err = |source| IntegrityError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(io_err)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Sort per-file digests, then hash their concatenation.
pub fn combine_digests(mut digests: Vec<String>) -> String {
    digests.sort();
    let mut hasher = Sha256::new();
    for digest in &digests {
        hasher.update(digest.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Compares the live payload hash with the build-time baseline.
///
/// The outcome is computed once and cached for the lifetime of the verifier,
/// a negative result included.
pub struct IntegrityVerifier {
    expected: String,
    hasher: Box<dyn PayloadHasher>,
    verdict: OnceCell<bool>,
}

impl IntegrityVerifier {
    pub fn new(expected: impl Into<String>, hasher: Box<dyn PayloadHasher>) -> Self {
        Self {
            expected: expected.into(),
            hasher,
            verdict: OnceCell::new(),
        }
    }

    /// Verifier against the baseline embedded at build time.
    pub fn embedded(hasher: Box<dyn PayloadHasher>) -> Self {
        Self::new(EXPECTED_INTEGRITY_HASH, hasher)
    }

    pub fn is_configured(&self) -> bool {
        let expected = self.expected.trim();
        !expected.is_empty() && !expected.eq_ignore_ascii_case(UNSET)
    }

    pub fn verify(&self) -> bool {
        *self.verdict.get_or_init(|| self.compute())
    }

    /// Cached outcome, if `verify` already ran.
    pub fn cached(&self) -> Option<bool> {
        self.verdict.get().copied()
    }

    fn compute(&self) -> bool {
        if !self.is_configured() {
            debug!("integrity baseline not configured");
            return false;
        }
        match self.hasher.payload_digest() {
            Ok(actual) => {
                let matches = actual.eq_ignore_ascii_case(self.expected.trim());
                if !matches {
                    warn!("payload integrity mismatch");
                }
                matches
            }
            Err(err) => {
                warn!(error = %err, "payload integrity check failed");
                false
            }
        }
    }
}
