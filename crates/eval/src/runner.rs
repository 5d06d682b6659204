//! Runs one step: timing, audit entry, escalation routing.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures_util::FutureExt;
use serde_json::json;

use arbiter_core::{EscalationKind, StepOutcome, StepStatus};
use arbiter_storage::{AuditLedger, StorageError};

use crate::escalation::EscalationQueue;
use crate::steps::{Step, StepContext, StepEffect, StepError};

/// Audit action for a step that ran to completion (accepted or not).
pub const RUN_STEP_ACTION: &str = "run_step";
/// Audit action for a step that broke.
pub const STEP_ERROR_ACTION: &str = "step_error";

/// A finished step with the typed effect the orchestrator folds in.
#[derive(Debug, Clone)]
pub struct StepRun {
    pub outcome: StepOutcome,
    pub effect: StepEffect,
}

#[derive(Clone)]
pub struct StepRunner {
    ledger: AuditLedger,
    escalations: EscalationQueue,
}

impl StepRunner {
    pub fn new(ledger: AuditLedger, escalations: EscalationQueue) -> Self {
        StepRunner {
            ledger,
            escalations,
        }
    }

    /// Run `step` in `ctx`.
    ///
    /// Step errors and panics are captured into an `error` outcome and
    /// escalated. Only a failed audit or escalation write is returned as an
    /// error.
    pub async fn run(
        &self,
        step: &dyn Step,
        ctx: &StepContext<'_>,
    ) -> Result<StepRun, StorageError> {
        let name = step.name();
        let input = ctx.audit_input();
        let started = Instant::now();
        let result = AssertUnwindSafe(step.run(ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(StepError::Internal(format!(
                    "step panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(report) => {
                let escalation_id = match report.escalation {
                    Some(req) => Some(
                        self.escalations
                            .escalate(name, &req.reason, req.context, req.kind)
                            .await?
                            .id,
                    ),
                    None => None,
                };
                self.ledger
                    .append(name, RUN_STEP_ACTION, &input, &report.output, report.confidence, false)
                    .await?;

                let status = if report.accepted {
                    StepStatus::Completed
                } else {
                    StepStatus::Failed
                };
                tracing::info!(
                    step = name,
                    record_id = %ctx.record.record_id(),
                    status = ?status,
                    duration_ms,
                    "step finished"
                );
                Ok(StepRun {
                    outcome: StepOutcome {
                        step: name.to_string(),
                        status,
                        output: report.output,
                        confidence: report.confidence,
                        duration_ms,
                        escalation_id,
                    },
                    effect: report.effect,
                })
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!(
                    step = name,
                    record_id = %ctx.record.record_id(),
                    error = %message,
                    "step failed"
                );
                let output = json!({ "error": message });
                let escalation = self
                    .escalations
                    .escalate(
                        name,
                        &format!("Step {} failed: {}", name, message),
                        json!({ "contract_id": ctx.record.record_id(), "error": message }),
                        EscalationKind::Review,
                    )
                    .await?;
                self.ledger
                    .append(name, STEP_ERROR_ACTION, &input, &output, 0.0, false)
                    .await?;
                Ok(StepRun {
                    outcome: StepOutcome {
                        step: name.to_string(),
                        status: StepStatus::Error,
                        output,
                        confidence: 0.0,
                        duration_ms,
                        escalation_id: Some(escalation.id),
                    },
                    effect: StepEffect::None,
                })
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
