//! Pipeline steps.
//!
//! A step receives the record plus every earlier step's outcome through a
//! [`StepContext`] and answers with a [`StepReport`]. Steps never touch the
//! ledger or the escalation queue themselves; they ask for an escalation
//! and the [`StepRunner`](crate::StepRunner) files it.

mod intake;
mod narrate;
mod performance;
mod risk;
mod synthesis;

pub use intake::{IntakeStep, DEFAULT_CONFIDENCE_THRESHOLD};
pub use narrate::Narrator;
pub use performance::{grade_for, score_kpi, PerformanceStep};
pub use risk::{classify_risk, RiskAssessment, RiskInputs, RiskStep};
pub use synthesis::{SynthesisStep, SYNTHESIS_TEMPERATURE};

use async_trait::async_trait;
use serde_json::Value;

use arbiter_core::{
    Decision, EscalationKind, EvaluationRecord, Recommendation, RiskLevel, StepOutcome,
};

pub const INTAKE: &str = "data_intake";
pub const PERFORMANCE: &str = "performance_analysis";
pub const RISK: &str = "risk_assessment";
pub const SYNTHESIS: &str = "reasoning_synthesis";

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("record schema error: {0}")]
    Schema(String),
    #[error("step input missing: {0}")]
    MissingInput(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Internal(String),
}

/// What a step sees: the record and the outcomes before it, in order.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub record: &'a EvaluationRecord,
    pub prior: &'a [StepOutcome],
}

impl<'a> StepContext<'a> {
    pub fn new(record: &'a EvaluationRecord, prior: &'a [StepOutcome]) -> Self {
        StepContext { record, prior }
    }

    /// Output of an earlier step, by name.
    pub fn output(&self, step: &str) -> Option<&'a Value> {
        self.prior.iter().find(|o| o.step == step).map(|o| &o.output)
    }

    /// Audit input payload for a step run in this context.
    pub fn audit_input(&self) -> Value {
        let prior: serde_json::Map<String, Value> = self
            .prior
            .iter()
            .map(|o| (o.step.clone(), o.output.clone()))
            .collect();
        serde_json::json!({
            "record": self.record.document(),
            "prior": prior,
        })
    }
}

/// A request for human attention raised by a step.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationRequest {
    pub kind: EscalationKind,
    pub reason: String,
    pub context: Value,
}

/// Typed results the orchestrator folds into the run.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEffect {
    None,
    Score(f64),
    Risk {
        level: RiskLevel,
        factors: Vec<String>,
        recommendation: Recommendation,
    },
    Decision(Box<Decision>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub output: Value,
    /// 0.0 to 1.0, recorded on the audit entry.
    pub confidence: f64,
    /// False when the step rejected the record; the run stops as `failed`.
    pub accepted: bool,
    pub escalation: Option<EscalationRequest>,
    pub effect: StepEffect,
}

impl StepReport {
    pub fn accepted(output: Value, confidence: f64) -> Self {
        StepReport {
            output,
            confidence,
            accepted: true,
            escalation: None,
            effect: StepEffect::None,
        }
    }

    pub fn with_effect(mut self, effect: StepEffect) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_escalation(mut self, escalation: Option<EscalationRequest>) -> Self {
        self.escalation = escalation;
        self
    }
}

/// One pluggable analysis stage.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepReport, StepError>;
}
