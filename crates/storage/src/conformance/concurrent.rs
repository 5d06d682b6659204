use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use serde_json::json;

use super::TestResult;
use crate::{AuditFilter, AuditLedger, AuditStore};

/// Number of concurrent writers in each test.
const N: usize = 16;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "parallel_appends_all_land_once",
            parallel_appends_all_land_once(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "timestamps_follow_store_order",
            timestamps_follow_store_order(factory).await,
        ),
    ]
}

async fn spawn_writers(ledger: &AuditLedger) -> Result<(), String> {
    let mut handles = Vec::new();
    for i in 0..N {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .append(
                    "orchestrator",
                    &format!("writer-{i}"),
                    &json!({"writer": i}),
                    &json!({"payload": "y".repeat(512 + i)}),
                    1.0,
                    false,
                )
                .await
        }));
    }
    for h in handles {
        h.await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("append: {e}"))?;
    }
    Ok(())
}

/// N tasks append through one ledger. Every entry appears exactly once and
/// every entry is structurally intact.
async fn parallel_appends_all_land_once<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = AuditLedger::new(Arc::new(factory().await));
    spawn_writers(&ledger).await?;

    let entries = ledger
        .read(&AuditFilter::all())
        .await
        .map_err(|e| format!("read: {e}"))?;
    if entries.len() != N {
        return Err(format!("expected {N} entries, found {}", entries.len()));
    }
    if let Some(bad) = entries.iter().find(|e| !e.is_well_formed()) {
        return Err(format!("malformed entry: {bad:?}"));
    }
    let distinct: BTreeSet<&str> = entries.iter().map(|e| e.action.as_str()).collect();
    if distinct.len() != N {
        return Err(format!("duplicate actions: {} distinct", distinct.len()));
    }
    Ok(())
}

async fn timestamps_follow_store_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: AuditStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let ledger = AuditLedger::new(Arc::new(factory().await));
    spawn_writers(&ledger).await?;

    let entries = ledger
        .read(&AuditFilter::all())
        .await
        .map_err(|e| format!("read: {e}"))?;
    for pair in entries.windows(2) {
        let earlier = arbiter_core::parse_rfc3339(&pair[0].timestamp)
            .ok_or_else(|| format!("bad timestamp {}", pair[0].timestamp))?;
        let later = arbiter_core::parse_rfc3339(&pair[1].timestamp)
            .ok_or_else(|| format!("bad timestamp {}", pair[1].timestamp))?;
        if later < earlier {
            return Err(format!(
                "{} appears after {} in the store",
                pair[1].timestamp, pair[0].timestamp
            ));
        }
    }
    Ok(())
}
