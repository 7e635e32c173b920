// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fingerprint_api::{DataSource, Fields, FieldsExt, Probe, ProbeError};
use fingerprint_security::{EmulatorAssessment, EmulatorDetector, Verdict};
use tokio::time::timeout;
use tracing::warn;

use super::{round2, ProbeContext, EMULATOR_INFO};

/// Emulator verdict. The check battery runs on the blocking pool under the
/// configured detection budget.
pub struct EmulatorInfoProbe {
    detector: Arc<EmulatorDetector>,
    budget: Duration,
}

impl EmulatorInfoProbe {
    pub fn new(ctx: &ProbeContext) -> Self {
        let detector = EmulatorDetector::new((*ctx.emulator_literals).clone())
            .with_bus(ctx.bus.clone(), ctx.config.signal_max_age());
        Self {
            detector: Arc::new(detector),
            budget: ctx.config.emulator_budget(),
        }
    }
}

#[async_trait]
impl Probe for EmulatorInfoProbe {
    fn name(&self) -> &str {
        EMULATOR_INFO
    }

    async fn run(&self, device: Arc<dyn DataSource>) -> Result<Fields, ProbeError> {
        let detector = self.detector.clone();
        let deadline = Instant::now() + self.budget;
        let task = tokio::task::spawn_blocking(move || {
            let mut rng = rand::thread_rng();
            detector.detect(device.as_ref(), &mut rng, Some(deadline))
        });

        let assessment = match timeout(self.budget, task).await {
            Ok(Ok(assessment)) => assessment,
            Ok(Err(err)) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Ok(Err(err)) => return Err(ProbeError::Failed(err.to_string())),
            Err(_) => {
                warn!(budget_ms = self.budget.as_millis() as u64, "emulator detection timed out");
                timed_out_assessment()
            }
        };
        Ok(to_fields(&assessment))
    }
}

fn timed_out_assessment() -> EmulatorAssessment {
    EmulatorAssessment {
        verdict: Verdict::timed_out(),
        hardware_checks_passed: 0,
        anti_debug_triggered: false,
        warnings: Vec::new(),
    }
}

fn to_fields(assessment: &EmulatorAssessment) -> Fields {
    let verdict = &assessment.verdict;
    let mut fields = Fields::new();
    fields.put("emulatorIndicators", verdict.indicators.clone());
    fields.put("isEmulator", verdict.is_positive);
    fields.put("hardwareChecksPassed", assessment.hardware_checks_passed);
    fields.put("confidenceScore", round2(verdict.score));
    fields.put("antiDebugTriggered", assessment.anti_debug_triggered);
    fields.put("highConfidenceSignals", verdict.high_confidence_count);
    fields.put("timedOut", verdict.timed_out);
    fields
}
