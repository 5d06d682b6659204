use serde::{Deserialize, Serialize};
use serde_json::Value;

use arbiter_core::{content_digest, is_digest};

/// One immutable line of the audit trail.
///
/// Inputs and outputs are never stored, only their digests; a party holding
/// the original content can recompute the digest and compare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 / RFC 3339 UTC timestamp string.
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    pub input_hash: String,
    pub output_hash: String,
    /// 0.0 to 1.0, rounded to 3 decimals.
    pub confidence: f64,
    pub human_override: bool,
}

impl AuditEntry {
    /// True if `input` hashes to this entry's input digest.
    pub fn matches_input(&self, input: &Value) -> bool {
        content_digest(input) == self.input_hash
    }

    /// True if `output` hashes to this entry's output digest.
    pub fn matches_output(&self, output: &Value) -> bool {
        content_digest(output) == self.output_hash
    }

    /// Structural check used when reading entries back.
    pub fn is_well_formed(&self) -> bool {
        !self.timestamp.is_empty()
            && !self.actor.is_empty()
            && !self.action.is_empty()
            && is_digest(&self.input_hash)
            && is_digest(&self.output_hash)
            && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Clamp to [0, 1] and round to 3 decimals.
pub(crate) fn normalize_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return 0.0;
    }
    (confidence.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(input: &Value, output: &Value) -> AuditEntry {
        AuditEntry {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            actor: "orchestrator".to_string(),
            action: "evaluate_contract".to_string(),
            input_hash: content_digest(input),
            output_hash: content_digest(output),
            confidence: 1.0,
            human_override: false,
        }
    }

    #[test]
    fn matches_reconstructed_content() {
        let input = json!({"contract_id": "CNT-2024-001", "vendor_name": "ABC"});
        let output = json!({"status": "completed"});
        let e = entry(&input, &output);
        assert!(e.matches_input(&json!({"vendor_name": "ABC", "contract_id": "CNT-2024-001"})));
        assert!(e.matches_output(&output));
        assert!(!e.matches_output(&json!({"status": "failed"})));
        assert!(e.is_well_formed());
    }

    #[test]
    fn confidence_is_clamped_and_rounded() {
        assert_eq!(normalize_confidence(0.123456), 0.123);
        assert_eq!(normalize_confidence(1.7), 1.0);
        assert_eq!(normalize_confidence(-0.2), 0.0);
        assert_eq!(normalize_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn persisted_field_names() {
        let e = entry(&json!({}), &json!({}));
        let v = serde_json::to_value(&e).unwrap();
        for key in [
            "timestamp",
            "actor",
            "action",
            "input_hash",
            "output_hash",
            "confidence",
            "human_override",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
    }
}
