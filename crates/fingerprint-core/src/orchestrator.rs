// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Collection orchestrator.
//!
//! Every supported probe runs as its own task under the per-probe timeout.
//! A probe that fails, panics or times out only affects its own output. The
//! overall deadline is all-or-nothing: when it fires, every in-flight task is
//! aborted and the caller gets a failure report without probe data.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use fingerprint_api::{
    CollectError, CollectionReport, DataSource, Probe, ProbeInfo, ProbeOutput, RegistryError,
};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::canonical;
use crate::config::FingerprintConfig;
use crate::probes::{default_registry, ProbeContext, ProbeRegistry};

pub struct Orchestrator {
    device: Arc<dyn DataSource>,
    context: ProbeContext,
    probes: RwLock<ProbeRegistry>,
}

impl Orchestrator {
    /// Engine with the default probe catalogue.
    pub fn new(device: Arc<dyn DataSource>, config: FingerprintConfig) -> Self {
        Self::with_context(device, ProbeContext::new(config))
    }

    pub fn with_context(device: Arc<dyn DataSource>, context: ProbeContext) -> Self {
        let probes = default_registry(&context);
        Self {
            device,
            context,
            probes: RwLock::new(probes),
        }
    }

    /// Engine without any registered probe.
    pub fn empty(device: Arc<dyn DataSource>, context: ProbeContext) -> Self {
        Self {
            device,
            context,
            probes: RwLock::new(ProbeRegistry::new()),
        }
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.context.config
    }

    pub fn context(&self) -> &ProbeContext {
        &self.context
    }

    fn registry(&self) -> RwLockReadGuard<'_, ProbeRegistry> {
        self.probes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, ProbeRegistry> {
        self.probes.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add or replace a probe. The last registration for a name wins.
    pub fn register_probe(
        &self,
        name: impl Into<String>,
        probe: Arc<dyn Probe>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        debug!(probe = %name, "probe registered");
        self.registry_mut().insert(name, probe);
        Ok(())
    }

    pub fn remove_probe(&self, name: &str) -> Option<Arc<dyn Probe>> {
        self.registry_mut().remove(name)
    }

    pub fn clear_probes(&self) {
        self.registry_mut().clear();
    }

    /// Restore the default catalogue.
    pub fn reset_probes(&self) {
        *self.registry_mut() = default_registry(&self.context);
    }

    /// Names of registered probes supported on this device, sorted.
    pub fn available_probes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry()
            .iter()
            .filter(|(_, probe)| probe.supported(self.device.as_ref()))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn probe_info(&self, name: &str) -> Option<ProbeInfo> {
        self.registry().get(name).map(|probe| self.info(name, probe))
    }

    pub fn all_probe_info(&self) -> Vec<ProbeInfo> {
        let mut infos: Vec<ProbeInfo> = self
            .registry()
            .iter()
            .map(|(name, probe)| self.info(name, probe))
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    fn info(&self, name: &str, probe: &Arc<dyn Probe>) -> ProbeInfo {
        ProbeInfo {
            name: name.to_string(),
            required_capabilities: probe.required_capabilities(),
            supported: probe.supported(self.device.as_ref()),
        }
    }

    /// Whether every supported probe has the capabilities it needs.
    pub fn has_all_capabilities(&self) -> bool {
        let device = self.device.as_ref();
        self.registry()
            .values()
            .filter(|probe| probe.supported(device))
            .all(|probe| probe.has_capabilities(device))
    }

    /// Run one probe outside the batch. `None` when no probe has that name.
    pub async fn collect_single(&self, name: &str) -> Option<ProbeOutput> {
        let probe = self.registry().get(name).cloned()?;
        if !probe.supported(self.device.as_ref()) {
            return Some(ProbeOutput::unsupported());
        }
        let per_probe = self.context.config.probe_timeout();
        Some(run_probe_safely(name, probe, self.device.clone(), per_probe).await)
    }

    /// Collect with the configured default deadline.
    pub async fn collect_default(&self) -> CollectionReport {
        self.report(self.context.config.default_timeout()).await
    }

    /// Collect under `overall`. Failures of the whole call come back as a
    /// report with `success == false`.
    pub async fn collect(&self, overall: Duration) -> CollectionReport {
        self.report(Some(overall)).await
    }

    async fn report(&self, overall: Option<Duration>) -> CollectionReport {
        let started = Instant::now();
        match self.try_collect(overall).await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "collection failed");
                CollectionReport::failed(err, elapsed_ms(started))
            }
        }
    }

    /// Collect every supported probe concurrently. `None` waits without an
    /// overall deadline.
    pub async fn try_collect(
        &self,
        overall: Option<Duration>,
    ) -> Result<CollectionReport, CollectError> {
        let started = Instant::now();
        let device = self.device.clone();
        let batch: Vec<(String, Arc<dyn Probe>)> = self
            .registry()
            .iter()
            .filter(|(_, probe)| probe.supported(device.as_ref()))
            .map(|(name, probe)| (name.clone(), probe.clone()))
            .collect();
        let per_probe = self.context.config.probe_timeout();
        debug!(probes = batch.len(), "collection started");

        let mut tasks = JoinSet::new();
        for (name, probe) in batch {
            let device = device.clone();
            tasks.spawn(async move {
                let output = run_probe_safely(&name, probe, device, per_probe).await;
                (name, output)
            });
        }

        let gather = async {
            let mut outputs = BTreeMap::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((name, output)) => {
                        outputs.insert(name, output);
                    }
                    Err(err) => warn!(error = %err, "probe task lost"),
                }
            }
            outputs
        };

        let outputs = match overall {
            Some(limit) => match timeout(limit, gather).await {
                Ok(outputs) => outputs,
                Err(_) => {
                    let timeout_ms = limit.as_millis() as u64;
                    warn!(timeout_ms, "collection deadline exceeded, aborting probes");
                    tasks.abort_all();
                    return Err(CollectError::OverallTimeout { timeout_ms });
                }
            },
            None => gather.await,
        };

        let canonical = canonical::encode(&outputs, self.context.config.max_report_bytes)?;
        let elapsed = elapsed_ms(started);
        info!(
            probes = outputs.len(),
            failed = outputs.values().filter(|o| o.is_error()).count(),
            bytes = canonical.json.len(),
            elapsed_ms = elapsed,
            "collection finished"
        );
        Ok(CollectionReport {
            probes: outputs,
            fingerprint: canonical.fingerprint,
            success: true,
            error: None,
            collection_time_ms: elapsed,
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }
}

/// Aborts the wrapped task when dropped, so an abandoned probe does not keep
/// running after its timeout or after the whole collection was aborted.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one probe with the shared failure semantics: missing capabilities
/// short-circuit, errors and panics become error outputs, and exceeding
/// `per_probe` yields the timeout marker.
pub async fn run_probe_safely(
    name: &str,
    probe: Arc<dyn Probe>,
    device: Arc<dyn DataSource>,
    per_probe: Duration,
) -> ProbeOutput {
    if !probe.has_capabilities(device.as_ref()) {
        debug!(probe = name, "missing capabilities, probe skipped");
        return ProbeOutput::missing_capabilities(probe.required_capabilities());
    }

    let started = Instant::now();
    let mut task = AbortOnDrop(tokio::spawn(async move { probe.run(device).await }));
    let output = match timeout(per_probe, &mut task.0).await {
        Ok(Ok(result)) => ProbeOutput::from(result),
        Ok(Err(err)) if err.is_panic() => {
            let message = panic_message(err.into_panic());
            warn!(probe = name, "probe panicked: {}", message);
            ProbeOutput::failed(message, false)
        }
        Ok(Err(err)) => ProbeOutput::failed(err.to_string(), false),
        Err(_) => {
            warn!(probe = name, timeout_ms = per_probe.as_millis() as u64, "probe timed out");
            ProbeOutput::timed_out()
        }
    };

    if let Some(failure) = output.failure() {
        debug!(probe = name, error = %failure.error, "probe finished with error");
    } else {
        debug!(probe = name, elapsed_ms = elapsed_ms(started), "probe finished");
    }
    output
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "probe panicked".to_string()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fingerprint_api::{Fields, FieldsExt, ProbeError, StaticSource};

    struct Fixed(&'static str);

    #[async_trait]
    impl Probe for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
            let mut fields = Fields::new();
            fields.put("value", self.0);
            Ok(fields)
        }
    }

    struct Unsupported;

    #[async_trait]
    impl Probe for Unsupported {
        fn name(&self) -> &str {
            "unsupported"
        }

        fn supported(&self, _device: &dyn DataSource) -> bool {
            false
        }

        async fn run(&self, _device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
            Ok(Fields::new())
        }
    }

    fn engine() -> Orchestrator {
        Orchestrator::empty(Arc::new(StaticSource::default()), ProbeContext::default())
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let engine = engine();
        assert_eq!(
            engine.register_probe("  ", Arc::new(Fixed("a"))),
            Err(RegistryError::EmptyName)
        );
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let engine = engine();
        engine.register_probe("probe", Arc::new(Fixed("first"))).unwrap();
        engine.register_probe("probe", Arc::new(Fixed("second"))).unwrap();
        let output = engine.collect_single("probe").await.unwrap();
        assert_eq!(output.fields().unwrap()["value"].as_str(), Some("second"));
    }

    #[test]
    fn test_introspection() {
        let engine = engine();
        engine.register_probe("b", Arc::new(Fixed("b"))).unwrap();
        engine.register_probe("a", Arc::new(Fixed("a"))).unwrap();
        engine.register_probe("unsupported", Arc::new(Unsupported)).unwrap();

        assert_eq!(engine.available_probes(), vec!["a", "b"]);
        let infos = engine.all_probe_info();
        assert_eq!(infos.len(), 3);
        assert_eq!(infos[0].name, "a");
        assert!(!engine.probe_info("unsupported").unwrap().supported);
        assert!(engine.probe_info("missing").is_none());
        assert!(engine.has_all_capabilities());

        assert!(engine.remove_probe("a").is_some());
        assert_eq!(engine.available_probes(), vec!["b"]);
        engine.clear_probes();
        assert!(engine.all_probe_info().is_empty());
    }

    #[test]
    fn test_reset_restores_default_catalogue() {
        let engine = engine();
        engine.reset_probes();
        assert_eq!(engine.all_probe_info().len(), 13);
        // networkInfo needs a capability the empty fixture does not grant
        assert!(!engine.has_all_capabilities());
    }

    #[tokio::test]
    async fn test_collect_single_unknown_and_unsupported() {
        let engine = engine();
        engine.register_probe("unsupported", Arc::new(Unsupported)).unwrap();
        assert!(engine.collect_single("nope").await.is_none());
        let output = engine.collect_single("unsupported").await.unwrap();
        assert_eq!(output.failure().unwrap().supported, Some(false));
    }

    #[tokio::test]
    async fn test_unsupported_probes_have_no_entry() {
        let engine = engine();
        engine.register_probe("a", Arc::new(Fixed("a"))).unwrap();
        engine.register_probe("unsupported", Arc::new(Unsupported)).unwrap();
        let report = engine.collect(Duration::from_secs(5)).await;
        assert!(report.success);
        assert!(report.probe("a").is_some());
        assert!(report.probe("unsupported").is_none());
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "probe panicked");
    }
}
