use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use arbiter_core::{Recommendation, RiskLevel, Severity};

use super::narrate::narrate_or;
use super::{
    Narrator, Step, StepContext, StepEffect, StepError, StepReport, PERFORMANCE, RISK,
};

/// Measured inputs to the risk rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskInputs {
    pub performance_score: f64,
    pub critical_incidents: usize,
    pub total_incidents: usize,
    pub unresolved_incidents: usize,
    pub budget_overrun_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub recommendation: Recommendation,
}

/// Rule-based classification.
///
/// HIGH: score < 60, more than 2 critical incidents, overrun above 15%, or
/// more than one unresolved incident. MEDIUM: score below 80, any critical
/// incident, overrun above 5%, or one unresolved incident. LOW otherwise.
pub fn classify_risk(m: &RiskInputs) -> RiskAssessment {
    let mut factors = Vec::new();

    if m.performance_score < 60.0 {
        factors.push(format!("Low performance score ({:.0}/100)", m.performance_score));
    } else if m.performance_score < 80.0 {
        factors.push(format!("Below-target performance ({:.0}/100)", m.performance_score));
    }
    if m.critical_incidents > 2 {
        factors.push(format!("High number of critical incidents ({})", m.critical_incidents));
    } else if m.critical_incidents > 0 {
        factors.push(format!("{} critical incident(s)", m.critical_incidents));
    }
    if m.unresolved_incidents > 0 {
        factors.push(format!("{} unresolved incident(s)", m.unresolved_incidents));
    }
    if m.budget_overrun_pct > 15.0 {
        factors.push(format!("Significant budget overrun ({:.1}%)", m.budget_overrun_pct));
    } else if m.budget_overrun_pct > 5.0 {
        factors.push(format!("Budget overrun ({:.1}%)", m.budget_overrun_pct));
    }

    let level = if m.performance_score < 60.0
        || m.critical_incidents > 2
        || m.budget_overrun_pct > 15.0
        || m.unresolved_incidents > 1
    {
        RiskLevel::High
    } else if m.performance_score < 80.0
        || m.critical_incidents > 0
        || m.budget_overrun_pct > 5.0
        || m.unresolved_incidents == 1
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let recommendation = match level {
        RiskLevel::High if m.performance_score < 50.0 || m.critical_incidents >= 3 => {
            Recommendation::Terminate
        }
        RiskLevel::High => Recommendation::Renegotiate,
        RiskLevel::Medium if m.unresolved_incidents > 0 || m.performance_score < 70.0 => {
            Recommendation::Renegotiate
        }
        RiskLevel::Medium => Recommendation::Monitor,
        RiskLevel::Low => Recommendation::Renew,
    };

    if factors.is_empty() && level == RiskLevel::Low {
        factors.push("No significant risk factors identified".to_string());
    }

    RiskAssessment {
        level,
        factors,
        recommendation,
    }
}

fn reason(vendor: &str, assessment: &RiskAssessment) -> String {
    match assessment.level {
        RiskLevel::High => format!(
            "{} is classified as HIGH risk due to: {}.",
            vendor,
            assessment
                .factors
                .iter()
                .take(2)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ")
        ),
        RiskLevel::Medium => format!(
            "{} presents MEDIUM risk with {} concern(s) requiring monitoring.",
            vendor,
            assessment.factors.len()
        ),
        RiskLevel::Low => format!(
            "{} is LOW risk with strong performance and no significant issues.",
            vendor
        ),
    }
}

fn reason_prompt(vendor: &str, score: f64, assessment: &RiskAssessment) -> String {
    let factors: Vec<String> = assessment
        .factors
        .iter()
        .map(|f| format!("- {}", f))
        .collect();
    format!(
        "Task: Explain why this vendor is classified as {level} risk in 1 sentence.\n\n\
         Vendor: {vendor}\n\
         Risk Level: {level}\n\
         Performance Score: {score:.0}/100\n\n\
         Risk Factors:\n{factors}\n\n\
         Output Format: Write a single sentence explaining the risk classification.\n\n\
         Output:",
        level = assessment.level,
        vendor = vendor,
        score = score,
        factors = factors.join("\n"),
    )
}

/// Classifies vendor risk from the KPI score, incidents and budget.
///
/// A [`Narrator`] only rewrites the `reason` sentence.
#[derive(Clone, Default)]
pub struct RiskStep {
    narrator: Option<Narrator>,
}

impl RiskStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_narrator(mut self, narrator: Narrator) -> Self {
        self.narrator = Some(narrator);
        self
    }
}

#[async_trait]
impl Step for RiskStep {
    fn name(&self) -> &str {
        RISK
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepReport, StepError> {
        let performance_score = ctx
            .output(PERFORMANCE)
            .and_then(|o| o["overall_score"].as_f64())
            .ok_or_else(|| StepError::MissingInput(format!("{} overall_score", PERFORMANCE)))?;

        let incidents = ctx.record.incidents();
        let inputs = RiskInputs {
            performance_score,
            critical_incidents: incidents
                .iter()
                .filter(|i| i.severity == Severity::Critical)
                .count(),
            total_incidents: incidents.len(),
            unresolved_incidents: incidents.iter().filter(|i| !i.resolved).count(),
            budget_overrun_pct: ctx
                .record
                .budget()
                .map(|b| b.overrun_percentage)
                .unwrap_or(0.0),
        };
        let assessment = classify_risk(&inputs);
        let vendor = ctx.record.vendor_name();
        let explanation = narrate_or(
            self.narrator.as_ref(),
            RISK,
            || reason_prompt(vendor, performance_score, &assessment),
            reason(vendor, &assessment),
        )
        .await;

        let output = json!({
            "risk_level": assessment.level,
            "recommendation": assessment.recommendation,
            "reason": explanation,
            "risk_factors": assessment.factors,
            "metrics": inputs,
        });

        tracing::debug!(
            record_id = %ctx.record.record_id(),
            level = %assessment.level,
            "risk classified"
        );
        let effect = StepEffect::Risk {
            level: assessment.level,
            factors: assessment.factors,
            recommendation: assessment.recommendation,
        };
        Ok(StepReport::accepted(output, 1.0).with_effect(effect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::provider::ProviderError;
    use arbiter_core::{StepOutcome, StepStatus};
    use std::sync::Arc;

    fn inputs(score: f64) -> RiskInputs {
        RiskInputs {
            performance_score: score,
            critical_incidents: 0,
            total_incidents: 0,
            unresolved_incidents: 0,
            budget_overrun_pct: 0.0,
        }
    }

    #[test]
    fn clean_vendor_is_low_risk_renew() {
        let a = classify_risk(&inputs(92.0));
        assert_eq!(a.level, RiskLevel::Low);
        assert_eq!(a.recommendation, Recommendation::Renew);
        assert_eq!(a.factors, vec!["No significant risk factors identified"]);
    }

    #[test]
    fn poor_score_terminates() {
        let a = classify_risk(&inputs(45.0));
        assert_eq!(a.level, RiskLevel::High);
        assert_eq!(a.recommendation, Recommendation::Terminate);
        assert_eq!(a.factors, vec!["Low performance score (45/100)"]);
    }

    #[test]
    fn many_critical_incidents_terminate() {
        let a = classify_risk(&RiskInputs {
            critical_incidents: 3,
            total_incidents: 4,
            ..inputs(85.0)
        });
        assert_eq!(a.level, RiskLevel::High);
        assert_eq!(a.recommendation, Recommendation::Terminate);
    }

    #[test]
    fn one_unresolved_incident_is_medium_renegotiate() {
        let a = classify_risk(&RiskInputs {
            unresolved_incidents: 1,
            total_incidents: 1,
            ..inputs(85.0)
        });
        assert_eq!(a.level, RiskLevel::Medium);
        assert_eq!(a.recommendation, Recommendation::Renegotiate);
    }

    #[test]
    fn moderate_overrun_is_medium_monitor() {
        let a = classify_risk(&RiskInputs {
            budget_overrun_pct: 8.0,
            ..inputs(85.0)
        });
        assert_eq!(a.level, RiskLevel::Medium);
        assert_eq!(a.recommendation, Recommendation::Monitor);
        assert_eq!(a.factors, vec!["Budget overrun (8.0%)"]);
    }

    fn scored(score: f64) -> Vec<StepOutcome> {
        vec![StepOutcome {
            step: PERFORMANCE.to_string(),
            status: StepStatus::Completed,
            output: json!({ "overall_score": score }),
            confidence: 1.0,
            duration_ms: 1,
            escalation_id: None,
        }]
    }

    #[tokio::test]
    async fn reads_score_from_prior_step() {
        let record = crate::testutil::full_record();
        let prior = scored(92.7);
        let report = RiskStep::new()
            .run(&StepContext::new(&record, &prior))
            .await
            .unwrap();
        // one unresolved incident, 5.6% overrun
        assert_eq!(report.output["risk_level"], "MEDIUM");
        assert_eq!(report.output["recommendation"], "RENEGOTIATE");
        assert_eq!(report.output["metrics"]["unresolved_incidents"], 1);
    }

    #[tokio::test]
    async fn missing_score_is_an_error() {
        let record = crate::testutil::full_record();
        let err = RiskStep::new()
            .run(&StepContext::new(&record, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::MissingInput(_)));
    }

    #[tokio::test]
    async fn narrator_rewrites_reason_only() {
        let provider = Arc::new(MockProvider::new(vec![Ok(
            "One open incident keeps this vendor under watch.".to_string(),
        )]));
        let step = RiskStep::new().with_narrator(Narrator::new(provider.clone(), 100));
        let record = crate::testutil::full_record();
        let prior = scored(92.7);
        let report = step.run(&StepContext::new(&record, &prior)).await.unwrap();

        assert_eq!(
            report.output["reason"],
            "One open incident keeps this vendor under watch."
        );
        assert_eq!(report.output["risk_level"], "MEDIUM");
        assert_eq!(report.output["recommendation"], "RENEGOTIATE");
        let prompt = provider.calls.lock().unwrap()[0].clone();
        assert!(prompt.contains("classified as MEDIUM risk"), "{prompt}");
        assert!(prompt.contains("Performance Score: 93/100"), "{prompt}");
    }

    #[tokio::test]
    async fn narrator_outage_keeps_rule_reason() {
        let provider = Arc::new(MockProvider::new(vec![Err(ProviderError::Network(
            "connection refused".to_string(),
        ))]));
        let step = RiskStep::new().with_narrator(Narrator::new(provider, 100));
        let record = crate::testutil::full_record();
        let prior = scored(92.7);
        let report = step.run(&StepContext::new(&record, &prior)).await.unwrap();
        let reason = report.output["reason"].as_str().unwrap();
        assert!(reason.contains("presents MEDIUM risk"), "{reason}");
    }
}
