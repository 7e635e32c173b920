// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 ProtoSDK

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fingerprint_api::{DataSource, Fields, FieldsExt, Probe, ProbeError};
use fingerprint_security::{RootAssessment, RootDetector, Verdict};
use tokio::time::timeout;
use tracing::warn;

use super::{round2, ProbeContext, ROOT_INFO};

/// Root and tamper verdict, including the payload integrity signal.
pub struct RootInfoProbe {
    detector: Arc<RootDetector>,
    budget: Duration,
}

impl RootInfoProbe {
    pub fn new(ctx: &ProbeContext) -> Self {
        let mut detector = RootDetector::new((*ctx.root_literals).clone());
        if let Some(verifier) = &ctx.integrity {
            detector = detector.with_integrity(verifier.clone());
        }
        Self {
            detector: Arc::new(detector),
            budget: ctx.config.root_budget(),
        }
    }
}

#[async_trait]
impl Probe for RootInfoProbe {
    fn name(&self) -> &str {
        ROOT_INFO
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
                warn!(budget_ms = self.budget.as_millis() as u64, "root detection timed out");
                RootAssessment {
                    verdict: Verdict::timed_out(),
                    integrity_verified: false,
                    native_checks_performed: 0,
                    anti_debug_triggered: false,
                    warnings: Vec::new(),
                }
            }
        };
        Ok(to_fields(assessment))
    }
}

fn to_fields(assessment: RootAssessment) -> Fields {
    let verdict = assessment.verdict;
    let mut fields = Fields::new();
    fields.put("rootIndicators", verdict.indicators);
    fields.put("integrityVerified", assessment.integrity_verified);
    fields.put("isRooted", verdict.is_positive);
    fields.put("nativeChecksPerformed", assessment.native_checks_performed);
    fields.put("antiDebugTriggered", assessment.anti_debug_triggered);
    fields.put("highConfidenceSignals", verdict.high_confidence_count);
    fields.put("score", round2(verdict.score));
    fields.put("timedOut", verdict.timed_out);
    if !assessment.warnings.is_empty() {
        fields.put("collectionWarnings", assessment.warnings);
    }
    fields
}
