use std::future::Future;

use super::{make_entry, TestResult};
use crate::AuditStore;

pub(super) async fn run_append_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "append",
            "fresh_store_is_empty",
            fresh_store_is_empty(factory).await,
        ),
        TestResult::from_result(
            "append",
            "appended_entry_reads_back_intact",
            appended_entry_reads_back_intact(factory).await,
        ),
        TestResult::from_result(
            "append",
            "reads_do_not_consume_entries",
            reads_do_not_consume_entries(factory).await,
        ),
    ]
}

async fn fresh_store_is_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let entries = store.entries().await.map_err(|e| format!("entries: {e}"))?;
    if !entries.is_empty() {
        return Err(format!("expected no entries, found {}", entries.len()));
    }
    Ok(())
}

async fn appended_entry_reads_back_intact<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut entry = make_entry("risk_assessment", "run_step", 0.875);
    entry.human_override = true;
    store
        .append(&entry)
        .await
        .map_err(|e| format!("append: {e}"))?;

    let entries = store.entries().await.map_err(|e| format!("entries: {e}"))?;
    match entries.as_slice() {
        [only] if *only == entry => Ok(()),
        [only] => Err(format!("entry changed on round trip: {only:?}")),
        other => Err(format!("expected 1 entry, found {}", other.len())),
    }
}

async fn reads_do_not_consume_entries<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .append(&make_entry("orchestrator", "evaluate_contract", 1.0))
        .await
        .map_err(|e| format!("append: {e}"))?;
    for attempt in 1..=3 {
        let n = store
            .entries()
            .await
            .map_err(|e| format!("entries: {e}"))?
            .len();
        if n != 1 {
            return Err(format!("read {attempt} saw {n} entries"));
        }
    }
    Ok(())
}
