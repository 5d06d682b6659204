//! Contract record validation: JSON Schema plus business rules.
//!
//! The schema is embedded at compile time. Business rules only run once the
//! document is schema-valid, since they assume well-typed fields.

use serde::Serialize;
use serde_json::Value;
use time::macros::format_description;
use time::Date;

use crate::steps::StepError;

const RECORD_SCHEMA: &str = include_str!("../schema/evaluation-record.schema.json");

/// Fields whose absence makes the schema check pointless.
const REQUIRED_FIELDS: [&str; 7] = [
    "contract_id",
    "vendor_name",
    "vendor_id",
    "start_date",
    "end_date",
    "value_usd",
    "kpis",
];

/// Every top-level field the schema knows about; completeness is measured
/// against this list.
const KNOWN_FIELDS: [&str; 12] = [
    "contract_id",
    "vendor_name",
    "vendor_id",
    "start_date",
    "end_date",
    "value_usd",
    "department",
    "contract_type",
    "kpis",
    "incidents",
    "budget",
    "notes",
];

const MAX_DURATION_DAYS: i64 = 5 * 365;
const HIGH_VALUE_USD: f64 = 10_000_000.0;
const CRITICAL_INCIDENT_WARNING: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn new(errors: Vec<String>, warnings: Vec<String>) -> Self {
        ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

pub struct ContractValidator {
    schema: jsonschema::Validator,
}

impl ContractValidator {
    pub fn new() -> Result<Self, StepError> {
        let schema: Value = serde_json::from_str(RECORD_SCHEMA)?;
        let schema = jsonschema::options()
            .should_validate_formats(true)
            .build(&schema)
            .map_err(|e| StepError::Schema(format!("failed to compile record schema: {}", e)))?;
        Ok(ContractValidator { schema })
    }

    pub fn validate(&self, document: &Value) -> ValidationReport {
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| document.get(f).is_none())
            .collect();
        if !missing.is_empty() {
            return ValidationReport::new(
                vec![format!("Missing required fields: {}", missing.join(", "))],
                Vec::new(),
            );
        }

        let schema_errors: Vec<String> = self
            .schema
            .iter_errors(document)
            .map(|e| format!("Schema error: {}", e))
            .collect();
        if !schema_errors.is_empty() {
            return ValidationReport::new(schema_errors, Vec::new());
        }

        let (errors, warnings) = business_rules(document);
        ValidationReport::new(errors, warnings)
    }
}

/// Fraction of the known top-level fields present, 0.0 to 1.0.
pub fn completeness(document: &Value) -> f64 {
    let present = KNOWN_FIELDS
        .iter()
        .filter(|f| document.get(**f).is_some())
        .count();
    present as f64 / KNOWN_FIELDS.len() as f64
}

fn parse_date(value: &Value) -> Result<Date, String> {
    let text = value.as_str().unwrap_or_default();
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("{:?}: {}", text, e))
}

fn business_rules(doc: &Value) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match (parse_date(&doc["start_date"]), parse_date(&doc["end_date"])) {
        (Ok(start), Ok(end)) => {
            if end <= start {
                errors.push("End date must be after start date".to_string());
            }
            let days = (end - start).whole_days();
            if days > MAX_DURATION_DAYS {
                warnings.push(format!("Contract duration ({} days) exceeds 5 years", days));
            }
        }
        (Err(e), _) | (_, Err(e)) => errors.push(format!("Invalid date format: {}", e)),
    }

    let value = doc["value_usd"].as_f64().unwrap_or(0.0);
    if value < 0.0 {
        errors.push("Contract value cannot be negative".to_string());
    } else if value == 0.0 {
        warnings.push("Contract value is zero".to_string());
    } else if value > HIGH_VALUE_USD {
        warnings.push(format!("High contract value: ${}", group_thousands(value)));
    }

    let kpis = doc["kpis"].as_array().map(Vec::as_slice).unwrap_or_default();
    if kpis.is_empty() {
        errors.push("Contract must have at least one KPI".to_string());
    }
    for kpi in kpis {
        let target = kpi["target"].as_f64().unwrap_or(0.0);
        let actual = kpi["actual"].as_f64().unwrap_or(0.0);
        if target < 0.0 || actual < 0.0 {
            errors.push(format!(
                "KPI '{}' has negative values",
                kpi["name"].as_str().unwrap_or("unnamed")
            ));
        }
    }

    if let Some(budget) = doc.get("budget") {
        let allocated = budget["allocated"].as_f64().unwrap_or(0.0);
        let spent = budget["spent"].as_f64().unwrap_or(0.0);
        if spent > allocated {
            if allocated > 0.0 {
                let overrun = (spent - allocated) / allocated * 100.0;
                warnings.push(format!("Budget overrun: {:.1}%", overrun));
            } else {
                warnings.push(format!("Budget overrun: {} spent against no allocation", spent));
            }
        }
    }

    let incidents = doc["incidents"].as_array().map(Vec::as_slice).unwrap_or_default();
    let critical = incidents
        .iter()
        .filter(|i| i["severity"] == "critical")
        .count();
    if critical > CRITICAL_INCIDENT_WARNING {
        warnings.push(format!("High number of critical incidents: {}", critical));
    }
    let unresolved = incidents
        .iter()
        .filter(|i| i["resolved"] == Value::Bool(false))
        .count();
    if unresolved > 0 {
        warnings.push(format!("Unresolved incidents: {}", unresolved));
    }

    (errors, warnings)
}

/// `12500000.4` -> `"12,500,000"`.
fn group_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
