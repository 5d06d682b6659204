//! Arbiter core data model.
//!
//! Everything that crosses a crate boundary lives here: the input
//! [`EvaluationRecord`], the recovered [`Decision`], the per-run
//! [`WorkflowRun`] with its [`StepOutcome`]s, human [`Escalation`]s, and
//! the canonical content digest used by the audit ledger.

pub mod decision;
pub mod digest;
pub mod escalation;
pub mod record;
pub mod run;

pub use decision::{ConfidenceLevel, Decision, Recommendation, RecoveryPath, RiskLevel};
pub use digest::{canonical_json, content_digest, is_digest, DIGEST_HEX_LEN, DIGEST_PREFIX};
pub use escalation::{Escalation, EscalationKind, EscalationStatus};
pub use record::{Budget, EvaluationRecord, Incident, Kpi, Severity};
pub use run::{RecommendationSource, RunDraft, RunStatus, StepOutcome, StepStatus, WorkflowRun};

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Parse an RFC 3339 timestamp, `None` if malformed.
pub fn parse_rfc3339(ts: &str) -> Option<time::OffsetDateTime> {
    time::OffsetDateTime::parse(ts, &time::format_description::well_known::Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_utc_rfc3339() {
        let ts = now_rfc3339();
        assert!(ts.ends_with('Z'), "expected UTC suffix: {ts}");
        assert!(parse_rfc3339(&ts).is_some());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_rfc3339("2026-02-30T00:00:00Z").is_none());
        assert!(parse_rfc3339("yesterday").is_none());
    }
}
