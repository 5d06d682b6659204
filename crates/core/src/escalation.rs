use serde::{Deserialize, Serialize};

/// What kind of human attention an escalation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationKind {
    Review,
    Clarification,
    Approval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationStatus {
    Pending,
    Resolved,
}

/// An item flagged for human review.
///
/// Created as `pending`; resolution happens outside the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    /// Sequence number within the queue that issued it.
    pub id: u64,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub timestamp: String,
    pub actor: String,
    #[serde(rename = "type")]
    pub kind: EscalationKind,
    pub reason: String,
    pub context: serde_json::Value,
    pub status: EscalationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_serializes_type_field() {
        let e = Escalation {
            id: 1,
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            actor: "data_intake".to_string(),
            kind: EscalationKind::Clarification,
            reason: "Low data completeness (50%)".to_string(),
            context: serde_json::json!({"contract_id": "CNT-2024-001"}),
            status: EscalationStatus::Pending,
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "clarification");
        assert_eq!(v["status"], "pending");
        assert!(v.get("kind").is_none());
    }
}
