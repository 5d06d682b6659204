use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use arbiter_core::Kpi;

use super::narrate::narrate_or;
use super::{Narrator, Step, StepContext, StepEffect, StepError, StepReport, PERFORMANCE};

/// Score at or above which a KPI counts as met.
const PASS_SCORE: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiScore {
    pub kpi_name: String,
    pub target: f64,
    pub actual: f64,
    pub unit: String,
    pub score: f64,
    pub compliance: &'static str,
    pub reason: String,
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Lower is better for time-like metrics, except satisfaction scores that
/// happen to mention time.
fn higher_is_better(name: &str) -> bool {
    let name = name.to_lowercase();
    !name.contains("time") || name.contains("satisfaction")
}

/// Score one KPI on a 0-100 scale.
pub fn score_kpi(kpi: &Kpi) -> KpiScore {
    let higher = higher_is_better(&kpi.name);
    let (target, actual, unit) = (kpi.target, kpi.actual, kpi.unit.as_str());

    let score = if target == 0.0 {
        0.0
    } else if higher {
        (actual / target * 100.0).min(100.0)
    } else if actual <= 0.0 {
        100.0
    } else {
        (target / actual * 100.0).clamp(0.0, 100.0)
    };

    let reason = if higher {
        let diff = actual - target;
        let pct = if target > 0.0 { diff / target * 100.0 } else { 0.0 };
        let direction = if diff >= 0.0 { "Exceeded" } else { "Below" };
        format!(
            "{} target by {:.1}% ({}{} vs {}{})",
            direction,
            pct.abs(),
            actual,
            unit,
            target,
            unit
        )
    } else {
        let diff = target - actual;
        let direction = if diff >= 0.0 { "Better" } else { "Worse" };
        format!(
            "{} than target by {:.1}{} ({}{} vs {}{})",
            direction,
            diff.abs(),
            unit,
            actual,
            unit,
            target,
            unit
        )
    };

    KpiScore {
        kpi_name: kpi.name.clone(),
        target,
        actual,
        unit: kpi.unit.clone(),
        score: round1(score),
        compliance: if score >= PASS_SCORE { "PASS" } else { "FAIL" },
        reason,
    }
}

pub fn grade_for(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "A",
        s if s >= 80.0 => "B",
        s if s >= 70.0 => "C",
        s if s >= 60.0 => "D",
        _ => "F",
    }
}

fn summary(vendor: &str, overall: f64, scores: &[KpiScore]) -> String {
    let failed = scores.iter().filter(|s| s.compliance == "FAIL").count();
    if overall >= 90.0 {
        format!(
            "{} demonstrated excellent performance with an overall score of {:.0}/100, \
             meeting or exceeding all major KPIs.",
            vendor, overall
        )
    } else if overall >= 70.0 {
        format!(
            "{} showed satisfactory performance with an overall score of {:.0}/100, \
             though {} KPI(s) fell below target.",
            vendor, overall, failed
        )
    } else {
        format!(
            "{} underperformed with an overall score of {:.0}/100, \
             failing to meet {} out of {} KPIs.",
            vendor,
            overall,
            failed,
            scores.len()
        )
    }
}

fn summary_prompt(vendor: &str, overall: f64, scores: &[KpiScore]) -> String {
    let kpis: Vec<String> = scores
        .iter()
        .map(|s| {
            format!(
                "- {}: {:.0}/100 ({}) - {}",
                s.kpi_name, s.score, s.compliance, s.reason
            )
        })
        .collect();
    format!(
        "Task: Generate a 1-2 sentence performance summary.\n\n\
         Vendor: {}\n\
         Overall Score: {:.0}/100\n\n\
         KPI Results:\n{}\n\n\
         Output Format: Write a brief summary explaining the overall performance in \
         1-2 sentences. Focus on the most important KPIs and whether the vendor met \
         expectations.\n\n\
         Output:",
        vendor,
        overall,
        kpis.join("\n")
    )
}

/// Deterministic KPI scoring. With a [`Narrator`] the justification is
/// written by the provider; scores and grade are unaffected.
#[derive(Clone, Default)]
pub struct PerformanceStep {
    narrator: Option<Narrator>,
}

impl PerformanceStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_narrator(mut self, narrator: Narrator) -> Self {
        self.narrator = Some(narrator);
        self
    }
}

#[async_trait]
impl Step for PerformanceStep {
    fn name(&self) -> &str {
        PERFORMANCE
    }

    async fn run(&self, ctx: &StepContext<'_>) -> Result<StepReport, StepError> {
        let kpis = ctx.record.kpis();
        if kpis.is_empty() {
            let output = json!({
                "overall_score": 0.0,
                "grade": "F",
                "kpi_scores": [],
                "justification": "No KPIs available for evaluation",
            });
            return Ok(StepReport::accepted(output, 0.0).with_effect(StepEffect::Score(0.0)));
        }

        let scores: Vec<KpiScore> = kpis.iter().map(score_kpi).collect();
        let mean = scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64;
        let overall = round1(mean);
        let vendor = ctx.record.vendor_name();
        let justification = narrate_or(
            self.narrator.as_ref(),
            PERFORMANCE,
            || summary_prompt(vendor, mean, &scores),
            summary(vendor, mean, &scores),
        )
        .await;
        let output = json!({
            "overall_score": overall,
            "grade": grade_for(mean),
            "kpi_scores": scores,
            "justification": justification,
        });

        tracing::debug!(record_id = %ctx.record.record_id(), overall, "KPIs scored");
        Ok(StepReport::accepted(output, 1.0).with_effect(StepEffect::Score(overall)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::provider::ProviderError;
    use crate::testutil::full_record;
    use std::sync::Arc;

    fn kpi(name: &str, target: f64, actual: f64) -> Kpi {
        Kpi {
            name: name.to_string(),
            target,
            actual,
            unit: "%".to_string(),
            description: None,
        }
    }

    #[test]
    fn higher_is_better_caps_at_100() {
        let s = score_kpi(&kpi("Uptime", 95.0, 99.0));
        assert_eq!(s.score, 100.0);
        assert_eq!(s.compliance, "PASS");
        assert!(s.reason.starts_with("Exceeded target by 4.2%"), "{}", s.reason);
    }

    #[test]
    fn time_metrics_are_lower_is_better() {
        let s = score_kpi(&kpi("Response time", 4.0, 5.0));
        assert_eq!(s.score, 80.0);
        assert_eq!(s.compliance, "PASS");
        assert!(s.reason.starts_with("Worse than target by 1.0"), "{}", s.reason);

        let s = score_kpi(&kpi("Time-to-resolution satisfaction", 4.0, 3.0));
        assert_eq!(s.score, 75.0);
    }

    #[test]
    fn zero_target_scores_zero_and_zero_time_scores_full() {
        assert_eq!(score_kpi(&kpi("Defects", 0.0, 3.0)).score, 0.0);
        assert_eq!(score_kpi(&kpi("Response time", 4.0, 0.0)).score, 100.0);
    }

    #[test]
    fn grades() {
        assert_eq!(grade_for(95.0), "A");
        assert_eq!(grade_for(80.0), "B");
        assert_eq!(grade_for(79.9), "C");
        assert_eq!(grade_for(60.0), "D");
        assert_eq!(grade_for(12.0), "F");
    }

    #[tokio::test]
    async fn overall_is_mean_of_kpi_scores() {
        let record = full_record();
        let report = PerformanceStep::new()
            .run(&StepContext::new(&record, &[]))
            .await
            .unwrap();
        // Uptime 98.0, response time 80.0, satisfaction 100.0
        assert_eq!(report.output["overall_score"], 92.7);
        assert_eq!(report.output["grade"], "A");
        assert_eq!(report.effect, StepEffect::Score(92.7));
    }

    #[tokio::test]
    async fn no_kpis_scores_zero() {
        let record = arbiter_core::EvaluationRecord::new(json!({"vendor_name": "X"}));
        let report = PerformanceStep::new()
            .run(&StepContext::new(&record, &[]))
            .await
            .unwrap();
        assert_eq!(report.output["grade"], "F");
        assert_eq!(report.effect, StepEffect::Score(0.0));
    }

    #[tokio::test]
    async fn deterministic_justification_without_narrator() {
        let record = full_record();
        let report = PerformanceStep::new()
            .run(&StepContext::new(&record, &[]))
            .await
            .unwrap();
        let text = report.output["justification"].as_str().unwrap();
        assert!(text.contains("demonstrated excellent performance"), "{text}");
    }

    #[tokio::test]
    async fn narrator_writes_justification_but_not_scores() {
        let provider = Arc::new(MockProvider::new(vec![Ok(
            "Strong quarter with uptime and satisfaction above target.".to_string(),
        )]));
        let step = PerformanceStep::new().with_narrator(Narrator::new(provider.clone(), 150));
        let record = full_record();
        let report = step.run(&StepContext::new(&record, &[])).await.unwrap();

        assert_eq!(
            report.output["justification"],
            "Strong quarter with uptime and satisfaction above target."
        );
        assert_eq!(report.output["overall_score"], 92.7);
        let prompt = provider.calls.lock().unwrap()[0].clone();
        assert!(prompt.contains("Overall Score: 93/100"), "{prompt}");
        assert!(prompt.contains("(PASS)"), "{prompt}");
    }

    #[tokio::test]
    async fn narrator_failure_keeps_deterministic_text() {
        let provider = Arc::new(MockProvider::new(vec![Err(ProviderError::Timeout(
            std::time::Duration::from_secs(5),
        ))]));
        let step = PerformanceStep::new().with_narrator(Narrator::new(provider, 150));
        let record = full_record();
        let report = step.run(&StepContext::new(&record, &[])).await.unwrap();
        let text = report.output["justification"].as_str().unwrap();
        assert!(text.contains("demonstrated excellent performance"), "{text}");
        assert_eq!(report.confidence, 1.0);
    }
}
