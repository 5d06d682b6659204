//! Shared fixtures for unit tests.

use std::sync::Arc;

use serde_json::{json, Value};

use arbiter_core::EvaluationRecord;
use arbiter_storage::{AuditLedger, AuditStore, MemoryAuditStore};

pub(crate) fn minimal_record() -> Value {
    json!({
        "contract_id": "CNT-2024-001",
        "vendor_name": "ABC Logistics",
        "vendor_id": "VEN-001",
        "start_date": "2024-01-01",
        "end_date": "2025-12-31",
        "value_usd": 250000,
        "department": "Operations",
        "kpis": [
            {"name": "On-time delivery", "target": 95, "actual": 97, "unit": "%"}
        ]
    })
}

/// A complete record with mixed KPI results, one open incident and a
/// modest budget overrun.
pub(crate) fn full_record() -> EvaluationRecord {
    EvaluationRecord::new(json!({
        "contract_id": "CNT-2024-002",
        "vendor_name": "Delta Field Services",
        "vendor_id": "VEN-002",
        "start_date": "2023-01-01",
        "end_date": "2025-12-31",
        "value_usd": 1800000,
        "department": "Maintenance",
        "contract_type": "services",
        "kpis": [
            {"name": "Uptime", "target": 99.0, "actual": 97.0, "unit": "%"},
            {"name": "Response time", "target": 4.0, "actual": 5.0, "unit": "h"},
            {"name": "Customer satisfaction", "target": 4.5, "actual": 4.6, "unit": "/5"}
        ],
        "incidents": [
            {"id": "INC-1", "date": "2024-03-02", "severity": "high",
             "description": "Pump failure", "resolved": true, "resolution_time_hours": 12},
            {"id": "INC-2", "date": "2024-08-14", "severity": "medium",
             "description": "Late crew arrival", "resolved": false}
        ],
        "budget": {"allocated": 1800000, "spent": 1900000, "overrun_percentage": 5.6},
        "notes": "Renewal window opens in Q4."
    }))
}

pub(crate) fn memory_ledger() -> (AuditLedger, Arc<MemoryAuditStore>) {
    let store = Arc::new(MemoryAuditStore::new());
    let ledger = AuditLedger::new(store.clone() as Arc<dyn AuditStore>);
    (ledger, store)
}
