// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Fingerprint build and diagnostics tool
//!
//! Usage:
//!   fingerprint-cli encode --manifest strings/root.txt --key 3f9a... --name ROOT_TABLE
//!   fingerprint-cli hash --dir app/build/intermediates/merged_native_libs
//!   fingerprint-cli collect --facts capture.json --config fingerprint.toml

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fingerprint_api::{DataSource, StaticSource};
use fingerprint_core::{FingerprintConfig, HostDataSource, Orchestrator};
use fingerprint_security::{DirectoryPayload, PayloadHasher, StringTable};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fingerprint-cli")]
#[command(about = "Build-time and diagnostic tooling for the fingerprint engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a `category|literal` manifest into an embeddable table
    Encode {
        #[arg(long)]
        manifest: PathBuf,

        /// Per-release key
        #[arg(long, env = "FINGERPRINT_STRING_KEY")]
        key: String,

        /// Name of the generated static
        #[arg(long, default_value = "TABLE")]
        name: String,
    },

    /// Compute the integrity baseline of a payload directory
    Hash {
        #[arg(long)]
        dir: PathBuf,

        /// Payload file extensions (repeatable)
        #[arg(long = "ext", default_values_t = vec!["so".to_string(), "dex".to_string()])]
        extensions: Vec<String>,
    },

    /// Run a full collection and print the report
    Collect {
        /// Captured device facts (JSON). Reads the local host when omitted.
        #[arg(long)]
        facts: Option<PathBuf>,

        /// TOML configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overall deadline, defaults to the configured one
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Run only this probe
        #[arg(long)]
        probe: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Encode {
            manifest,
            key,
            name,
        } => print!("{}", encode(&manifest, &key, &name)?),
        Command::Hash { dir, extensions } => println!("{}", hash(&dir, extensions)?),
        Command::Collect {
            facts,
            config,
            timeout_ms,
            probe,
        } => println!("{}", collect(facts, config, timeout_ms, probe)?),
    }
    Ok(())
}

fn encode(manifest: &Path, key: &str, name: &str) -> Result<String> {
    let text = fs::read_to_string(manifest)
        .with_context(|| format!("failed to read manifest {}", manifest.display()))?;
    let table = StringTable::from_manifest(&text, key)?;
    if table.is_empty() {
        bail!("manifest {} has no entries", manifest.display());
    }
    info!(entries = table.len(), "manifest encoded");
    Ok(table.render_rust(name))
}

fn hash(dir: &Path, extensions: Vec<String>) -> Result<String> {
    let payload = DirectoryPayload::new(dir, extensions);
    let digest = payload.payload_digest()?;
    info!(files = payload.files()?.len(), "payload hashed");
    Ok(digest)
}

fn collect(
    facts: Option<PathBuf>,
    config: Option<PathBuf>,
    timeout_ms: Option<u64>,
    probe: Option<String>,
) -> Result<String> {
    let config = match config {
        Some(path) => FingerprintConfig::load(&path)?,
        None => FingerprintConfig::default(),
    };
    let device: Arc<dyn DataSource> = match facts {
        Some(path) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("failed to read facts {}", path.display()))?;
            Arc::new(StaticSource::from_json(&json).context("invalid facts file")?)
        }
        None => Arc::new(HostDataSource::new()),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let engine = Orchestrator::new(device, config);

    if let Some(name) = probe {
        let Some(output) = runtime.block_on(engine.collect_single(&name)) else {
            bail!("unknown probe {name}; available: {}", engine.available_probes().join(", "));
        };
        return Ok(serde_json::to_string_pretty(&output)?);
    }

    let report = runtime.block_on(async {
        match timeout_ms {
            Some(ms) => engine.collect(Duration::from_millis(ms)).await,
            None => engine.collect_default().await,
        }
    });
    if !report.success {
        bail!(
            "collection failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(serde_json::to_string_pretty(&report)?)
}
