use std::future::Future;

use super::{make_entry, TestResult};
use crate::AuditStore;

pub(super) async fn run_ordering_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![TestResult::from_result(
        "ordering",
        "sequential_appends_keep_order",
        sequential_appends_keep_order(factory).await,
    )]
}

async fn sequential_appends_keep_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let actions: Vec<String> = (0..12).map(|i| format!("action-{i:02}")).collect();
    for action in &actions {
        store
            .append(&make_entry("orchestrator", action, 0.5))
            .await
            .map_err(|e| format!("append {action}: {e}"))?;
    }

    let read: Vec<String> = store
        .entries()
        .await
        .map_err(|e| format!("entries: {e}"))?
        .into_iter()
        .map(|e| e.action)
        .collect();
    if read != actions {
        return Err(format!("order mismatch: {read:?}"));
    }
    Ok(())
}
