//! Conformance test suite for `AuditStore` implementations.
//!
//! Any backend can run this suite to verify it behaves as the ledger
//! expects. The suite covers:
//!
//! - **Append**: a fresh store is empty, appended entries read back intact
//! - **Ordering**: entries come back in the order they were appended
//! - **Concurrency**: parallel appends through an [`AuditLedger`] all land,
//!   each exactly once, with timestamps that never go backwards
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that creates
//! a fresh, empty store for each test:
//!
//! ```ignore
//! use arbiter_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async { MemoryAuditStore::new() }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```
//!
//! [`AuditLedger`]: crate::AuditLedger

mod append;
mod concurrent;
mod ordering;

use std::fmt;
use std::future::Future;

use crate::record::AuditEntry;
use crate::AuditStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "append", "ordering").
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Failure detail when `passed` is false.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Audit store conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in self.results.iter().filter(|r| !r.passed) {
            writeln!(
                f,
                "  FAIL [{}/{}]: {}",
                r.category,
                r.name,
                r.message.as_deref().unwrap_or("(no message)")
            )?;
        }
        Ok(())
    }
}

/// Run every conformance test against a store backend.
///
/// `factory` is called once per test so each test starts from an empty store.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();
    results.extend(append::run_append_tests(&factory).await);
    results.extend(ordering::run_ordering_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();
    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

fn make_entry(actor: &str, action: &str, confidence: f64) -> AuditEntry {
    AuditEntry {
        timestamp: "2026-03-01T12:00:00Z".to_string(),
        actor: actor.to_string(),
        action: action.to_string(),
        input_hash: "sha256:0123456789abcdef".to_string(),
        output_hash: "sha256:fedcba9876543210".to_string(),
        confidence,
        human_override: false,
    }
}
