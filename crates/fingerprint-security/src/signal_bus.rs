// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Short-lived, last-write-wins cache for sharing heuristic findings
//! between probes of the same collection.
//!
//! Reads race against concurrent publishers. A miss is normal and consumers
//! must treat a hit as optional enrichment.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

pub const TOPIC_GPU: &str = "gpu";
pub const TOPIC_SENSOR: &str = "sensor";
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(10_000);

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalBusEntry<T> {
    pub payload: T,
    pub published_at_ms: i64,
}

pub struct SignalBus<T> {
    entries: RwLock<HashMap<String, SignalBusEntry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> SignalBus<T> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Replace the entry for `topic`, stamped with the current time.
    pub fn publish(&self, topic: &str, payload: T) {
        let entry = SignalBusEntry {
            payload,
            published_at_ms: self.clock.now_ms(),
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(topic.to_string(), entry);
        trace!(topic, "signal published");
    }

    /// Payload for `topic` if it was published no more than `max_age` ago.
    pub fn latest(&self, topic: &str, max_age: Duration) -> Option<T> {
        let now = self.clock.now_ms();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(topic)?;
        let age = now.saturating_sub(entry.published_at_ms);
        if age <= max_age.as_millis() as i64 {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl<T: Clone> Default for SignalBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary published by the GPU probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuSignals {
    pub confidence_score: f64,
    pub suspected_virtualization: bool,
    pub hints: Vec<String>,
    pub checks_passed: u32,
}

/// Summary published by the sensor probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSignals {
    pub confidence_score: f64,
    pub suspected_emulation: bool,
    pub indicators: Vec<String>,
    pub total_sensors: usize,
    pub missing_core_count: usize,
    pub unique_vendors: usize,
    pub unique_types: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Gpu(GpuSignals),
    Sensor(SensorSignals),
}

/// Bus shared by the heuristic probes of one engine instance.
pub type HeuristicBus = SignalBus<Signal>;

impl SignalBus<Signal> {
    pub fn publish_gpu(&self, signals: GpuSignals) {
        self.publish(TOPIC_GPU, Signal::Gpu(signals));
    }

    pub fn publish_sensor(&self, signals: SensorSignals) {
        self.publish(TOPIC_SENSOR, Signal::Sensor(signals));
    }

    pub fn latest_gpu(&self, max_age: Duration) -> Option<GpuSignals> {
        match self.latest(TOPIC_GPU, max_age)? {
            Signal::Gpu(signals) => Some(signals),
            _ => None,
        }
    }

    pub fn latest_sensor(&self, max_age: Duration) -> Option<SensorSignals> {
        match self.latest(TOPIC_SENSOR, max_age)? {
            Signal::Sensor(signals) => Some(signals),
            _ => None,
        }
    }
}
