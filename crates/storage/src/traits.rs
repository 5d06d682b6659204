use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::AuditEntry;

/// The storage trait for audit backends.
///
/// A store persists fully formed entries in the order `append` is called
/// and returns them in that same order. It never rewrites or removes an
/// entry. Ordering across concurrent callers is the ledger's job: the
/// [`AuditLedger`](crate::AuditLedger) issues appends one at a time.
///
/// ## Durability
///
/// `append` returns only after the entry is durable (for file stores:
/// written and flushed). A failed append must leave no partial entry
/// behind that `entries` would report as valid.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so a ledger can move
/// appends onto spawned tasks.
#[async_trait]
pub trait AuditStore: Send + Sync + 'static {
    /// Persist one entry at the end of the log.
    async fn append(&self, entry: &AuditEntry) -> Result<(), StorageError>;

    /// All entries, oldest first.
    async fn entries(&self) -> Result<Vec<AuditEntry>, StorageError>;
}
