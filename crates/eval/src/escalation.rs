//! Human-escalation queue.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use arbiter_core::{now_rfc3339, Escalation, EscalationKind, EscalationStatus};
use arbiter_storage::{AuditLedger, StorageError};

/// Audit action recorded for every escalation.
pub const ESCALATE_ACTION: &str = "escalate_to_human";

/// Collects items that need a human decision.
///
/// Escalating never blocks the pipeline beyond its audit write; resolution
/// happens elsewhere. Clones share the same queue.
#[derive(Clone)]
pub struct EscalationQueue {
    ledger: AuditLedger,
    items: Arc<Mutex<Vec<Escalation>>>,
}

impl EscalationQueue {
    pub fn new(ledger: AuditLedger) -> Self {
        EscalationQueue {
            ledger,
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// File an escalation. The audit entry is written with confidence 0.0.
    pub async fn escalate(
        &self,
        actor: &str,
        reason: &str,
        context: Value,
        kind: EscalationKind,
    ) -> Result<Escalation, StorageError> {
        let mut items = self.items.lock().await;
        let escalation = Escalation {
            id: items.len() as u64 + 1,
            timestamp: now_rfc3339(),
            actor: actor.to_string(),
            kind,
            reason: reason.to_string(),
            context,
            status: EscalationStatus::Pending,
        };
        let output = serde_json::to_value(&escalation)?;
        self.ledger
            .append(actor, ESCALATE_ACTION, &escalation.context, &output, 0.0, false)
            .await?;
        items.push(escalation.clone());

        tracing::warn!(
            id = escalation.id,
            actor,
            kind = ?kind,
            reason,
            "escalated to human review"
        );
        Ok(escalation)
    }

    pub async fn pending(&self) -> Vec<Escalation> {
        self.items
            .lock()
            .await
            .iter()
            .filter(|e| e.status == EscalationStatus::Pending)
            .cloned()
            .collect()
    }

    pub async fn all(&self) -> Vec<Escalation> {
        self.items.lock().await.clone()
    }
}
