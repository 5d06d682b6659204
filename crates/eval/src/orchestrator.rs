//! Drives one evaluation run through the step pipeline.

use std::sync::Arc;

use serde_json::{json, Value};

use arbiter_core::{now_rfc3339, EvaluationRecord, RunDraft, RunStatus, StepStatus, WorkflowRun};
use arbiter_storage::{AuditLedger, StorageError};

use crate::escalation::EscalationQueue;
use crate::provider::GenerationProvider;
use crate::runner::StepRunner;
use crate::steps::{
    IntakeStep, Narrator, PerformanceStep, RiskStep, Step, StepContext, StepEffect, StepError,
    SynthesisStep, DEFAULT_CONFIDENCE_THRESHOLD, SYNTHESIS_TEMPERATURE,
};

pub const ORCHESTRATOR_ACTOR: &str = "orchestrator";
/// Closing audit action for runs that finished (completed or failed).
pub const EVALUATE_ACTION: &str = "evaluate_contract";
/// Closing audit action for runs that ended in a step error.
pub const EVALUATE_ERROR_ACTION: &str = "evaluate_contract_error";
/// Token cap for the scoring and risk summaries.
pub const NARRATIVE_MAX_TOKENS: u32 = 150;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// An audit or escalation write failed. The run is returned with
    /// status `error`; it must not be reported as completed.
    #[error("audit persistence failed for {}: {source}", .run.record_id())]
    Persistence {
        run: Box<WorkflowRun>,
        #[source]
        source: StorageError,
    },
}

impl OrchestratorError {
    pub fn run(&self) -> &WorkflowRun {
        match self {
            OrchestratorError::Persistence { run, .. } => run,
        }
    }
}

/// Tunables for the standard pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Intake escalates below this completeness.
    pub confidence_threshold: f64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Let the provider write the scoring and risk summaries too.
    pub narrate: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_tokens: 4096,
            temperature: SYNTHESIS_TEMPERATURE,
            narrate: false,
        }
    }
}

pub struct Orchestrator {
    steps: Vec<Box<dyn Step>>,
    runner: StepRunner,
    ledger: AuditLedger,
    escalations: EscalationQueue,
}

impl Orchestrator {
    /// Pipeline over an explicit step list, run in the given order.
    pub fn new(ledger: AuditLedger, steps: Vec<Box<dyn Step>>) -> Self {
        let escalations = EscalationQueue::new(ledger.clone());
        Orchestrator {
            steps,
            runner: StepRunner::new(ledger.clone(), escalations.clone()),
            ledger,
            escalations,
        }
    }

    /// The standard intake, scoring, risk and synthesis pipeline.
    pub fn standard(
        ledger: AuditLedger,
        provider: Arc<dyn GenerationProvider>,
        settings: PipelineSettings,
    ) -> Result<Self, StepError> {
        let mut performance = PerformanceStep::new();
        let mut risk = RiskStep::new();
        if settings.narrate {
            let narrator = Narrator::new(Arc::clone(&provider), NARRATIVE_MAX_TOKENS);
            performance = performance.with_narrator(narrator.clone());
            risk = risk.with_narrator(narrator);
        }
        let synthesis = SynthesisStep::new(provider, settings.max_tokens)
            .with_temperature(settings.temperature);
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(IntakeStep::new(settings.confidence_threshold)?),
            Box::new(performance),
            Box::new(risk),
            Box::new(synthesis),
        ];
        Ok(Self::new(ledger, steps))
    }

    pub fn escalations(&self) -> &EscalationQueue {
        &self.escalations
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Evaluate one record.
    ///
    /// Rejection by a step ends the run as `failed`; a step error ends it as
    /// `error`. Both are returned as `Ok`. Only persistence failures surface
    /// as `Err`.
    pub async fn run(&self, record: &EvaluationRecord) -> Result<WorkflowRun, OrchestratorError> {
        let mut draft = RunDraft::new(record.record_id(), record.vendor_name(), now_rfc3339());
        tracing::info!(record_id = %record.record_id(), "evaluation started");

        let mut status = RunStatus::Completed;
        let mut error = None;
        for step in &self.steps {
            let ctx = StepContext::new(record, draft.steps());
            let result = self.runner.run(step.as_ref(), &ctx).await;
            let run = match result {
                Ok(run) => run,
                Err(source) => return Err(persistence(draft, source)),
            };

            match run.effect {
                StepEffect::None => {}
                StepEffect::Score(score) => draft.set_performance_score(score),
                StepEffect::Risk {
                    level,
                    factors,
                    recommendation,
                } => draft.set_risk(level, factors, recommendation),
                StepEffect::Decision(decision) => draft.apply_decision(*decision),
            }

            let step_status = run.outcome.status;
            if step_status == StepStatus::Error {
                error = run.outcome.output["error"]
                    .as_str()
                    .map(|e| format!("{} failed: {}", run.outcome.step, e));
            }
            draft.append_step(run.outcome);
            match step_status {
                StepStatus::Completed => {}
                StepStatus::Failed => {
                    status = RunStatus::Failed;
                    break;
                }
                StepStatus::Error => {
                    status = RunStatus::Error;
                    break;
                }
            }
        }

        let run = draft.seal(status, error);
        let (action, confidence) = match status {
            RunStatus::Completed => (EVALUATE_ACTION, 1.0),
            RunStatus::Failed => (EVALUATE_ACTION, 0.5),
            _ => (EVALUATE_ERROR_ACTION, 0.0),
        };
        if let Err(source) = self
            .ledger
            .append(
                ORCHESTRATOR_ACTOR,
                action,
                &record.identity(),
                &summary(&run),
                confidence,
                false,
            )
            .await
        {
            tracing::error!(
                record_id = %run.record_id(),
                error = %source,
                "closing audit write failed"
            );
            let run = run.with_status(RunStatus::Error, source.to_string());
            return Err(OrchestratorError::Persistence {
                run: Box::new(run),
                source,
            });
        }

        tracing::info!(
            record_id = %run.record_id(),
            status = run.status().as_str(),
            recommendation = ?run.recommendation(),
            "evaluation finished"
        );
        Ok(run)
    }
}

fn persistence(draft: RunDraft, source: StorageError) -> OrchestratorError {
    tracing::error!(record_id = %draft.record_id(), error = %source, "audit write failed mid-run");
    let run = draft.seal(RunStatus::Error, Some(source.to_string()));
    OrchestratorError::Persistence {
        run: Box::new(run),
        source,
    }
}

/// Closing audit output for a run.
fn summary(run: &WorkflowRun) -> Value {
    json!({
        "contract_id": run.record_id(),
        "status": run.status().as_str(),
        "steps": run.steps().iter().map(|s| &s.step).collect::<Vec<_>>(),
        "performance_score": run.performance_score(),
        "risk_level": run.risk_level(),
        "recommendation": run.recommendation(),
        "recommendation_source": run.recommendation_source(),
        "confidence_level": run.confidence_level(),
        "error": run.error(),
    })
}
