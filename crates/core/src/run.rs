//! Workflow runs and the step outcomes they accumulate.
//!
//! A run is built through a [`RunDraft`] while it is `in_progress`. The
//! draft only ever appends step outcomes. [`RunDraft::seal`] consumes the
//! draft and yields a read-only [`WorkflowRun`] with a terminal status.

use serde::{Deserialize, Serialize};

use crate::decision::{ConfidenceLevel, Decision, Recommendation, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    /// The step ran and rejected the record.
    Failed,
    /// The step itself broke.
    Error,
}

/// The result of one step, as recorded on the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    pub status: StepStatus,
    pub output: serde_json::Value,
    pub confidence: f64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_id: Option<u64>,
}

/// Where the run's final recommendation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    RiskClassification,
    Synthesis,
}

/// A run still being driven by the orchestrator.
#[derive(Debug, Clone)]
pub struct RunDraft {
    record_id: String,
    vendor_name: String,
    created_at: String,
    steps: Vec<StepOutcome>,
    performance_score: Option<f64>,
    risk_level: Option<RiskLevel>,
    risk_factors: Vec<String>,
    recommendation: Option<(Recommendation, RecommendationSource)>,
    decision: Option<Decision>,
}

impl RunDraft {
    pub fn new(record_id: &str, vendor_name: &str, created_at: String) -> Self {
        RunDraft {
            record_id: record_id.to_string(),
            vendor_name: vendor_name.to_string(),
            created_at,
            steps: Vec::new(),
            performance_score: None,
            risk_level: None,
            risk_factors: Vec::new(),
            recommendation: None,
            decision: None,
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn steps(&self) -> &[StepOutcome] {
        &self.steps
    }

    pub fn append_step(&mut self, outcome: StepOutcome) {
        self.steps.push(outcome);
    }

    pub fn set_performance_score(&mut self, score: f64) {
        self.performance_score = Some(score);
    }

    /// Record the arithmetic risk classification. A recommendation already
    /// taken from synthesis is kept.
    pub fn set_risk(
        &mut self,
        level: RiskLevel,
        factors: Vec<String>,
        recommendation: Recommendation,
    ) {
        self.risk_level = Some(level);
        self.risk_factors = factors;
        if !matches!(
            self.recommendation,
            Some((_, RecommendationSource::Synthesis))
        ) {
            self.recommendation =
                Some((recommendation, RecommendationSource::RiskClassification));
        }
    }

    /// Merge the synthesis decision. Its recommendation always wins over
    /// the risk classification; its risk factors replace the arithmetic
    /// ones only when they came from a parsed structure.
    pub fn apply_decision(&mut self, decision: Decision) {
        self.recommendation = Some((decision.recommendation, RecommendationSource::Synthesis));
        if decision.recovery.is_structured() && !decision.risk_factors.is_empty() {
            self.risk_factors = decision.risk_factors.clone();
        }
        self.decision = Some(decision);
    }

    pub fn seal(self, status: RunStatus, error: Option<String>) -> WorkflowRun {
        let (recommendation, recommendation_source) = match self.recommendation {
            Some((r, s)) => (Some(r), Some(s)),
            None => (None, None),
        };
        WorkflowRun {
            record_id: self.record_id,
            vendor_name: self.vendor_name,
            status,
            created_at: self.created_at,
            steps: self.steps,
            performance_score: self.performance_score,
            risk_level: self.risk_level,
            risk_factors: self.risk_factors,
            recommendation,
            recommendation_source,
            decision: self.decision,
            error,
        }
    }
}

/// A finished evaluation. Read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    record_id: String,
    vendor_name: String,
    status: RunStatus,
    created_at: String,
    steps: Vec<StepOutcome>,
    performance_score: Option<f64>,
    risk_level: Option<RiskLevel>,
    risk_factors: Vec<String>,
    recommendation: Option<Recommendation>,
    recommendation_source: Option<RecommendationSource>,
    decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl WorkflowRun {
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn vendor_name(&self) -> &str {
        &self.vendor_name
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn steps(&self) -> &[StepOutcome] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == name)
    }

    pub fn performance_score(&self) -> Option<f64> {
        self.performance_score
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.risk_level
    }

    pub fn risk_factors(&self) -> &[String] {
        &self.risk_factors
    }

    pub fn recommendation(&self) -> Option<Recommendation> {
        self.recommendation
    }

    pub fn recommendation_source(&self) -> Option<RecommendationSource> {
        self.recommendation_source
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn confidence_level(&self) -> Option<ConfidenceLevel> {
        self.decision.as_ref().map(|d| d.confidence_level)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Copy of this run with a different terminal status, used when the
    /// closing audit write fails after the run was otherwise finished.
    pub fn with_status(&self, status: RunStatus, error: String) -> WorkflowRun {
        WorkflowRun {
            status,
            error: Some(error),
            ..self.clone()
        }
    }
}
