use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::record::AuditEntry;
use crate::traits::AuditStore;

/// In-process store. Not durable; used by tests and dry runs.
#[derive(Default)]
pub struct MemoryAuditStore {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StorageError> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<AuditEntry>, StorageError> {
        Ok(self.entries.lock().await.clone())
    }
}
