use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use arbiter_core::{ConfidenceLevel, Decision, EscalationKind, RecoveryPath};

use super::{
    EscalationRequest, Step, StepContext, StepEffect, StepError, StepReport, INTAKE, SYNTHESIS,
};
use crate::prompt::build_reasoning_prompt;
use crate::provider::{GenerationLimits, GenerationProvider, RawResponse};
use crate::recovery::recover;
use crate::validation::completeness;

/// Slight creativity for nuanced reasoning.
pub const SYNTHESIS_TEMPERATURE: f32 = 0.3;

/// Asks the generation provider for a reasoned decision and recovers it.
///
/// Never fails on provider or parse problems: those degrade into a LOW
/// confidence decision and an escalation.
pub struct SynthesisStep {
    provider: Arc<dyn GenerationProvider>,
    limits: GenerationLimits,
}

impl SynthesisStep {
    pub fn new(provider: Arc<dyn GenerationProvider>, max_tokens: u32) -> Self {
        SynthesisStep {
            provider,
            limits: GenerationLimits {
                max_tokens,
                temperature: SYNTHESIS_TEMPERATURE,
            },
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.limits.temperature = temperature;
        self
    }
}

#[async_trait]
impl Step for SynthesisStep {
    fn name(&self) -> &str {
        SYNTHESIS
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepReport, StepError> {
        let prompt = build_reasoning_prompt(ctx);
        let info = self.provider.describe();
        tracing::info!(
            record_id = %ctx.record.record_id(),
            provider = %info.provider,
            model = %info.model,
            prompt_chars = prompt.chars().count(),
            "requesting synthesis"
        );

        let (mut decision, raw, provider_error) =
            match self.provider.generate(&prompt, &self.limits).await {
                Ok(text) => {
                    let decision = recover(&text);
                    let raw = RawResponse {
                        text,
                        prompt_chars: prompt.chars().count(),
                        provider: info.provider.clone(),
                    };
                    (decision, Some(raw), None)
                }
                Err(err) => {
                    tracing::warn!(
                        record_id = %ctx.record.record_id(),
                        error = %err,
                        "provider call failed, using fallback decision"
                    );
                    let message = err.to_string();
                    (Decision::provider_failure(&message), None, Some(message))
                }
            };

        if decision.recovery != RecoveryPath::ProviderError {
            decision.data_completeness = ctx
                .output(INTAKE)
                .and_then(|o| o["completeness"].as_f64())
                .unwrap_or_else(|| completeness(ctx.record.document()));
        }

        let escalation = (decision.confidence_level == ConfidenceLevel::Low).then(|| {
            EscalationRequest {
                kind: EscalationKind::Review,
                reason: match &provider_error {
                    Some(e) => format!("Synthesis provider failed: {}", e),
                    None => format!(
                        "Low-confidence synthesis decision ({:?} recovery)",
                        decision.recovery
                    ),
                },
                context: json!({
                    "contract_id": ctx.record.record_id(),
                    "recommendation": decision.recommendation,
                    "recovery": decision.recovery,
                }),
            }
        });

        let output = json!({
            "decision": decision,
            "provider": info,
            "raw_response": raw,
            "provider_error": provider_error,
        });
        let confidence = decision.confidence_level.score();

        Ok(StepReport::accepted(output, confidence)
            .with_escalation(escalation)
            .with_effect(StepEffect::Decision(Box::new(decision))))
    }
}
