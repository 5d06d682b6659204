use std::path::PathBuf;

/// All errors that can be returned by an AuditStore implementation.
///
/// Every variant is fatal for the run that triggered it: a run without its
/// audit trail cannot be reported as completed.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing file could not be opened, written, or read.
    #[error("audit store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entry could not be serialized.
    #[error("audit entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored line is not a well-formed audit entry.
    #[error("corrupt audit entry at line {line}: {message}")]
    Corrupt { line: usize, message: String },

    /// A backend-specific failure (lock poisoning, task join, injected faults).
    #[error("audit store backend error: {0}")]
    Backend(String),
}
