use async_trait::async_trait;
use serde_json::json;

use arbiter_core::EscalationKind;

use super::{EscalationRequest, Step, StepContext, StepError, StepReport, INTAKE};
use crate::validation::{completeness, ContractValidator};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Confidence assigned to a record that failed validation.
const INVALID_CONFIDENCE: f64 = 0.3;

/// Escalate regardless of validity past this many errors.
const MAX_TOLERATED_ERRORS: usize = 3;

/// Validates the record and gates the rest of the pipeline on it.
pub struct IntakeStep {
    validator: ContractValidator,
    confidence_threshold: f64,
}

impl IntakeStep {
    pub fn new(confidence_threshold: f64) -> Result<Self, StepError> {
        Ok(IntakeStep {
            validator: ContractValidator::new()?,
            confidence_threshold,
        })
    }
}

#[async_trait]
impl Step for IntakeStep {
    fn name(&self) -> &str {
        INTAKE
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepReport, StepError> {
        let document = ctx.record.document();
        let report = self.validator.validate(document);
        let completeness = completeness(document);
        let confidence = if report.valid {
            completeness
        } else {
            INVALID_CONFIDENCE
        };

        let mut reasons = Vec::new();
        if !report.valid {
            reasons.push(format!(
                "Validation failed with {} errors",
                report.errors.len()
            ));
        }
        if completeness < self.confidence_threshold {
            reasons.push(format!(
                "Low data completeness ({:.0}%)",
                completeness * 100.0
            ));
        }
        if report.errors.len() > MAX_TOLERATED_ERRORS {
            reasons.push("Too many validation errors".to_string());
        }
        let reason = (!reasons.is_empty()).then(|| reasons.join("; "));

        let output = json!({
            "contract_id": ctx.record.record_id(),
            "vendor_name": ctx.record.vendor_name(),
            "valid": report.valid,
            "completeness": completeness,
            "confidence": confidence,
            "errors": report.errors,
            "warnings": report.warnings,
            "should_escalate": reason.is_some(),
            "escalation_reason": reason,
        });

        let escalation = reason.map(|reason| EscalationRequest {
            kind: EscalationKind::Review,
            reason,
            context: json!({
                "contract_id": ctx.record.record_id(),
                "errors": output["errors"],
                "warnings": output["warnings"],
                "completeness": completeness,
            }),
        });

        tracing::info!(
            record_id = %ctx.record.record_id(),
            valid = report.valid,
            completeness,
            "intake validated"
        );

        Ok(StepReport {
            accepted: report.valid,
            ..StepReport::accepted(output, confidence)
        }
        .with_escalation(escalation))
    }
}
