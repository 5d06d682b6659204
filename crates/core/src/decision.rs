//! The structured outcome of the synthesis step.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract action recommended for a vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Renew,
    Renegotiate,
    Terminate,
    Monitor,
}

impl Recommendation {
    /// Keyword match order. The first keyword found in a text wins.
    pub const PRIORITY: [Recommendation; 4] = [
        Recommendation::Terminate,
        Recommendation::Renegotiate,
        Recommendation::Renew,
        Recommendation::Monitor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Renew => "RENEW",
            Recommendation::Renegotiate => "RENEGOTIATE",
            Recommendation::Terminate => "TERMINATE",
            Recommendation::Monitor => "MONITOR",
        }
    }

    /// Find the highest-priority recommendation keyword in `text`,
    /// case-insensitively.
    pub fn find_keyword(text: &str) -> Option<Recommendation> {
        let upper = text.to_uppercase();
        Self::PRIORITY
            .into_iter()
            .find(|r| upper.contains(r.as_str()))
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How sure the synthesis step is about its recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub const PRIORITY: [ConfidenceLevel; 3] = [
        ConfidenceLevel::High,
        ConfidenceLevel::Medium,
        ConfidenceLevel::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
        }
    }

    pub fn find_keyword(text: &str) -> Option<ConfidenceLevel> {
        let upper = text.to_uppercase();
        Self::PRIORITY
            .into_iter()
            .find(|c| upper.contains(c.as_str()))
    }

    /// Numeric confidence recorded in the audit ledger for this level.
    pub fn score(&self) -> f64 {
        match self {
            ConfidenceLevel::High => 0.9,
            ConfidenceLevel::Medium => 0.6,
            ConfidenceLevel::Low => 0.3,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vendor risk classification produced by the risk step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a [`Decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPath {
    /// The structured block parsed as-is.
    Parsed,
    /// The block was truncated and closed before parsing.
    Repaired,
    /// Trailing content after a valid block was discarded.
    TrimmedTrailing,
    /// No structure could be parsed; fields come from keyword scanning.
    Heuristic,
    /// The provider never returned text.
    ProviderError,
}

impl RecoveryPath {
    /// True if the decision fields came from a parsed structure.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            RecoveryPath::Parsed | RecoveryPath::Repaired | RecoveryPath::TrimmedTrailing
        )
    }
}

/// A fully populated decision record.
///
/// Every field is always present: recovery degrades values, it never
/// leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub reasoning_chain: Vec<String>,
    pub performance_assessment: String,
    pub risk_factors: Vec<String>,
    pub strengths: Vec<String>,
    pub recommendation: Recommendation,
    pub confidence_level: ConfidenceLevel,
    pub justification: String,
    pub alternative_consideration: String,
    /// Fraction of the input record that was available, 0.0 to 1.0.
    pub data_completeness: f64,
    pub recovery: RecoveryPath,
}

impl Decision {
    /// Decision returned when the provider call itself failed.
    pub fn provider_failure(error: &str) -> Self {
        Decision {
            reasoning_chain: vec![format!("ERROR: {}", error)],
            performance_assessment: "Unable to assess - provider evaluation failed".to_string(),
            risk_factors: vec!["System error during assessment".to_string()],
            strengths: vec!["Unable to determine".to_string()],
            recommendation: Recommendation::Monitor,
            confidence_level: ConfidenceLevel::Low,
            justification: format!("Evaluation failed: {}. Manual review required.", error),
            alternative_consideration: "System error - cannot provide alternative analysis"
                .to_string(),
            data_completeness: 0.0,
            recovery: RecoveryPath::ProviderError,
        }
    }

    /// True if every text field and list is non-empty.
    pub fn is_fully_populated(&self) -> bool {
        let lists = [&self.reasoning_chain, &self.risk_factors, &self.strengths];
        let texts = [
            &self.performance_assessment,
            &self.justification,
            &self.alternative_consideration,
        ];
        lists.iter().all(|l| !l.is_empty() && l.iter().all(|s| !s.trim().is_empty()))
            && texts.iter().all(|t| !t.trim().is_empty())
            && (0.0..=1.0).contains(&self.data_completeness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_keyword_priority() {
        assert_eq!(
            Recommendation::find_keyword("renew or TERMINATE?"),
            Some(Recommendation::Terminate)
        );
        assert_eq!(
            Recommendation::find_keyword("Renegotiate, then renew"),
            Some(Recommendation::Renegotiate)
        );
        assert_eq!(
            Recommendation::find_keyword("we should renew"),
            Some(Recommendation::Renew)
        );
        assert_eq!(
            Recommendation::find_keyword("keep monitoring"),
            Some(Recommendation::Monitor)
        );
        assert_eq!(Recommendation::find_keyword("no opinion"), None);
    }

    #[test]
    fn confidence_keyword_priority() {
        assert_eq!(
            ConfidenceLevel::find_keyword("medium-high"),
            Some(ConfidenceLevel::High)
        );
        assert_eq!(
            ConfidenceLevel::find_keyword("Low"),
            Some(ConfidenceLevel::Low)
        );
        assert_eq!(ConfidenceLevel::find_keyword("0.8"), None);
    }

    #[test]
    fn enums_serialize_uppercase() {
        assert_eq!(
            serde_json::to_value(Recommendation::Renegotiate).unwrap(),
            serde_json::json!("RENEGOTIATE")
        );
        assert_eq!(
            serde_json::to_value(ConfidenceLevel::Medium).unwrap(),
            serde_json::json!("MEDIUM")
        );
        assert_eq!(
            serde_json::to_value(RecoveryPath::TrimmedTrailing).unwrap(),
            serde_json::json!("trimmed_trailing")
        );
    }

    #[test]
    fn provider_failure_is_populated_and_low() {
        let d = Decision::provider_failure("connection refused");
        assert!(d.is_fully_populated());
        assert_eq!(d.recommendation, Recommendation::Monitor);
        assert_eq!(d.confidence_level, ConfidenceLevel::Low);
        assert!(d.justification.contains("Manual review required"));
        assert_eq!(d.reasoning_chain, vec!["ERROR: connection refused"]);
    }
}
