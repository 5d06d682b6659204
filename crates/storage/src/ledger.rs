//! The audit ledger: digesting, ordering, and reading entries.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use arbiter_core::{content_digest, now_rfc3339};

use crate::error::StorageError;
use crate::memory::MemoryAuditStore;
use crate::record::{normalize_confidence, AuditEntry};
use crate::traits::AuditStore;

/// Selects entries when reading the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub actor: Option<String>,
    pub action: Option<String>,
    /// Keep only the newest `limit` matches (still returned oldest first).
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        self.actor.as_deref().is_none_or(|a| entry.actor == a)
            && self.action.as_deref().is_none_or(|a| entry.action == a)
    }
}

/// Append-only audit trail shared by every run in a process.
///
/// Appends are serialized through a single writer turn: the timestamp is
/// taken and the entry persisted while the turn is held, so store order
/// equals timestamp order. Each append runs on its own spawned task; if
/// the caller's future is dropped mid-append, the write still completes.
#[derive(Clone)]
pub struct AuditLedger {
    store: Arc<dyn AuditStore>,
    writer: Arc<Mutex<()>>,
}

impl AuditLedger {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        AuditLedger {
            store,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Ledger over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryAuditStore::new()))
    }

    /// Record one action. Returns the persisted entry.
    pub async fn append(
        &self,
        actor: &str,
        action: &str,
        input: &Value,
        output: &Value,
        confidence: f64,
        human_override: bool,
    ) -> Result<AuditEntry, StorageError> {
        let input_hash = content_digest(input);
        let output_hash = content_digest(output);
        let actor = actor.to_string();
        let action = action.to_string();
        let confidence = normalize_confidence(confidence);

        let store = Arc::clone(&self.store);
        let writer = Arc::clone(&self.writer);
        let task = tokio::spawn(async move {
            let _turn = writer.lock().await;
            let entry = AuditEntry {
                timestamp: now_rfc3339(),
                actor,
                action,
                input_hash,
                output_hash,
                confidence,
                human_override,
            };
            store.append(&entry).await?;
            Ok::<_, StorageError>(entry)
        });

        let entry = task
            .await
            .map_err(|e| StorageError::Backend(format!("audit append task failed: {}", e)))??;
        tracing::debug!(
            actor = %entry.actor,
            action = %entry.action,
            confidence = entry.confidence,
            "audit entry appended"
        );
        Ok(entry)
    }

    /// Entries matching `filter`, oldest first.
    pub async fn read(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StorageError> {
        let mut entries: Vec<AuditEntry> = self
            .store
            .entries()
            .await?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        if let Some(limit) = filter.limit {
            let skip = entries.len().saturating_sub(limit);
            entries.drain(..skip);
        }
        Ok(entries)
    }
}
