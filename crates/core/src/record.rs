//! The input business record: a vendor contract.
//!
//! An [`EvaluationRecord`] wraps the contract document exactly as it was
//! received. Validation runs against the raw document (an invalid record
//! must still flow into a run so the failure is audited), and the typed
//! accessors below read it leniently, substituting defaults for absent or
//! mistyped fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A contract submitted for evaluation. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    document: Value,
}

/// One key performance indicator with its target and measured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target: f64,
    #[serde(default)]
    pub actual: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A logged service incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_resolved")]
    pub resolved: bool,
    #[serde(default)]
    pub resolution_time_hours: Option<f64>,
}

fn default_resolved() -> bool {
    true
}

/// Contract budget figures.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub allocated: f64,
    #[serde(default)]
    pub spent: f64,
    #[serde(default)]
    pub overrun_percentage: f64,
}

const UNKNOWN: &str = "unknown";

impl EvaluationRecord {
    pub fn new(document: Value) -> Self {
        EvaluationRecord { document }
    }

    /// Parse a record from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    /// The document as received.
    pub fn document(&self) -> &Value {
        &self.document
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.document.get(key).and_then(Value::as_str)
    }

    /// Contract ID, or `"unknown"` when absent.
    pub fn record_id(&self) -> &str {
        self.str_field("contract_id").unwrap_or(UNKNOWN)
    }

    pub fn vendor_name(&self) -> &str {
        self.str_field("vendor_name").unwrap_or(UNKNOWN)
    }

    pub fn vendor_id(&self) -> &str {
        self.str_field("vendor_id").unwrap_or(UNKNOWN)
    }

    pub fn department(&self) -> Option<&str> {
        self.str_field("department")
    }

    pub fn value_usd(&self) -> Option<f64> {
        self.document.get("value_usd").and_then(Value::as_f64)
    }

    /// KPI entries; malformed entries are skipped.
    pub fn kpis(&self) -> Vec<Kpi> {
        self.list_field("kpis")
    }

    /// Incident entries; malformed entries are skipped.
    pub fn incidents(&self) -> Vec<Incident> {
        self.list_field("incidents")
    }

    pub fn budget(&self) -> Option<Budget> {
        self.document
            .get("budget")
            .and_then(|b| serde_json::from_value(b.clone()).ok())
    }

    pub fn notes(&self) -> Option<&str> {
        self.str_field("notes")
    }

    fn list_field<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Vec<T> {
        self.document
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Identity payload used for audit entries about this record.
    pub fn identity(&self) -> Value {
        serde_json::json!({
            "contract_id": self.record_id(),
            "vendor_name": self.vendor_name(),
        })
    }
}
