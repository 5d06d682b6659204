//! Durable, append-only audit trail for evaluation runs.
//!
//! [`AuditStore`] is the backend seam; [`AuditLedger`] sits in front of a
//! store, computes content digests, and serializes appends so that store
//! order equals chronological order even when runs execute concurrently.

pub mod conformance;
mod error;
mod jsonl;
mod ledger;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use jsonl::JsonlAuditStore;
pub use ledger::{AuditFilter, AuditLedger};
pub use memory::MemoryAuditStore;
pub use record::AuditEntry;
pub use traits::AuditStore;
