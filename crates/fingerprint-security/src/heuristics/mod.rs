// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

//! Weighted-indicator scoring shared by the emulator and root detectors.
//!
//! A detection pass runs a battery of independent checks in random order.
//! Every check only writes into the pass's [`IndicatorSet`]; the score is a
//! commutative sum over that set, so the verdict does not depend on the order.

pub mod emulator;
pub mod gpu;
pub mod imei;
pub mod root;
pub mod sensors;

use std::collections::BTreeMap;
use std::time::Instant;

use fingerprint_api::{DataSource, SourceError};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const HIGH: f64 = 0.35;
pub const MEDIUM: f64 = 0.20;
pub const LOW: f64 = 0.10;

/// Score at which an emulator pass turns positive.
pub const EMULATOR_THRESHOLD: f64 = 0.70;
/// Indicator count at which a root pass turns positive.
pub const ROOT_MIN_INDICATORS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    pub label: String,
    pub weight: f64,
    pub high_confidence: bool,
}

/// Indicators of one pass keyed by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    indicators: BTreeMap<String, Indicator>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `label`. Returns `false` (and changes nothing) when it was already present.
    pub fn record(&mut self, label: impl Into<String>, weight: f64, high_confidence: bool) -> bool {
        let label = label.into();
        if self.indicators.contains_key(&label) {
            return false;
        }
        // negative or NaN weights would let the score decrease
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        self.indicators.insert(
            label.clone(),
            Indicator {
                label,
                weight,
                high_confidence,
            },
        );
        true
    }

    /// Sum of weights clamped to `[0, 1]`, accumulated in label order.
    pub fn score(&self) -> f64 {
        let sum: f64 = self.indicators.values().map(|i| i.weight).sum();
        sum.clamp(0.0, 1.0)
    }

    pub fn high_confidence_count(&self) -> usize {
        self.indicators
            .values()
            .filter(|i| i.high_confidence)
            .count()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.indicators.contains_key(label)
    }

    /// Sorted labels.
    pub fn labels(&self) -> Vec<String> {
        self.indicators.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.indicators.values()
    }
}

pub fn record_indicator(
    set: &mut IndicatorSet,
    label: impl Into<String>,
    weight: f64,
    high_confidence: bool,
) -> bool {
    set.record(label, weight, high_confidence)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerdictRule {
    /// Positive on any high-confidence indicator or `score >= threshold`.
    ScoreThreshold(f64),
    /// Positive on any high-confidence indicator or at least `n` indicators.
    MinIndicators(usize),
}

impl VerdictRule {
    pub const EMULATOR: VerdictRule = VerdictRule::ScoreThreshold(EMULATOR_THRESHOLD);
    pub const ROOT: VerdictRule = VerdictRule::MinIndicators(ROOT_MIN_INDICATORS);

    pub fn is_positive(&self, set: &IndicatorSet) -> bool {
        if set.high_confidence_count() > 0 {
            return true;
        }
        match *self {
            VerdictRule::ScoreThreshold(threshold) => set.score() >= threshold,
            VerdictRule::MinIndicators(n) => set.len() >= n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub indicators: Vec<String>,
    pub is_positive: bool,
    pub high_confidence_count: usize,
    pub score: f64,
    pub timed_out: bool,
}

impl Verdict {
    pub fn from_set(set: &IndicatorSet, rule: VerdictRule) -> Self {
        Self {
            indicators: set.labels(),
            is_positive: rule.is_positive(set),
            high_confidence_count: set.high_confidence_count(),
            score: set.score(),
            timed_out: false,
        }
    }

    /// Verdict of a pass that ran out of budget. Carries no indicators.
    pub fn timed_out() -> Self {
        Self {
            indicators: Vec::new(),
            is_positive: false,
            high_confidence_count: 0,
            score: 0.0,
            timed_out: true,
        }
    }
}

/// Mutable state of one detection pass.
#[derive(Debug, Default)]
pub struct DetectionPass {
    pub indicators: IndicatorSet,
    /// Checks that completed, with or without a finding.
    pub checks_performed: usize,
    /// Hardware checks (sensors, battery, ABI, NEON) that came back healthy.
    /// Maintained by the checks themselves.
    pub hardware_checks_passed: usize,
    /// Direct file and property reads issued by the checks.
    pub native_reads: usize,
    pub warnings: Vec<String>,
    pub timed_out: bool,
}

impl DetectionPass {
    pub fn record(&mut self, label: impl Into<String>, weight: f64, high_confidence: bool) -> bool {
        self.indicators.record(label, weight, high_confidence)
    }

    pub fn verdict(&self, rule: VerdictRule) -> Verdict {
        if self.timed_out {
            return Verdict::timed_out();
        }
        Verdict::from_set(&self.indicators, rule)
    }
}

pub type CheckResult = Result<(), SourceError>;

type CheckFn<'a> = Box<dyn Fn(&mut DetectionPass) -> CheckResult + 'a>;

/// Ordered list of independent checks run sequentially after a shuffle.
pub struct CheckBattery<'a> {
    checks: Vec<(&'static str, CheckFn<'a>)>,
}

impl<'a> CheckBattery<'a> {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn check(
        mut self,
        name: &'static str,
        check: impl Fn(&mut DetectionPass) -> CheckResult + 'a,
    ) -> Self {
        self.checks.push((name, Box::new(check)));
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Shuffle, then run every check into `pass`.
    ///
    /// A capability-denied source read means "no signal"; any other error is
    /// kept as a warning and the remaining checks still run. Once `deadline`
    /// has passed the pass is marked timed out and the rest is skipped.
    pub fn run_shuffled<R: Rng + ?Sized>(
        mut self,
        rng: &mut R,
        pass: &mut DetectionPass,
        deadline: Option<Instant>,
    ) {
        self.checks.shuffle(rng);
        for (name, check) in &self.checks {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(check = name, "detection budget exhausted");
                pass.timed_out = true;
                return;
            }
            match check(pass) {
                Ok(()) => pass.checks_performed += 1,
                Err(err) if err.is_capability_denied() => {
                    debug!(check = name, "check skipped: {}", err);
                }
                Err(err) => {
                    warn!(check = name, "check failed: {}", err);
                    pass.warnings.push(format!("{name}: {err}"));
                }
            }
        }
    }
}

impl Default for CheckBattery<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracer attached or debugger connected. Unreadable facts count as clean.
pub fn anti_debug_triggered(device: &dyn DataSource) -> bool {
    let traced = device.tracer_pid().map(|pid| pid > 0).unwrap_or(false);
    let debugger = device.debugger_connected().unwrap_or(false);
    traced || debugger
}
