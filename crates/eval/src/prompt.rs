//! Reasoning prompt for the synthesis step.

use serde_json::Value;

use arbiter_core::EvaluationRecord;

use crate::steps::{StepContext, INTAKE, PERFORMANCE, RISK};

const OUTPUT_CONTRACT: &str = r#"Provide your analysis as valid JSON with exactly this structure:

{
  "reasoning_chain": [
    "Step 1: performance trend analysis with specific observations",
    "Step 2: incident pattern assessment with examples",
    "Step 3: contextual factors (budget, contract terms, notes)",
    "Step 4: trade-off analysis listing strengths and concerns",
    "Step 5: final synthesis leading to the recommendation"
  ],
  "performance_assessment": "2-3 sentences on overall performance across all sources",
  "risk_factors": ["risk factor with severity and evidence", "..."],
  "strengths": ["strength with supporting evidence", "..."],
  "recommendation": "One of: RENEW | RENEGOTIATE | TERMINATE | MONITOR",
  "confidence_level": "One of: HIGH | MEDIUM | LOW",
  "justification": "2-3 sentences on why this recommendation fits the analysis",
  "alternative_consideration": "1-2 sentences on what would change the recommendation"
}

Rules:
- Synthesize across sources; do not summarize each one separately.
- If sources conflict, say how you weighed them.
- You MUST choose a recommendation. Express uncertainty through confidence_level.
- Respond only with the JSON object."#;

fn kpi_lines(performance: Option<&Value>) -> String {
    let lines: Vec<String> = performance
        .and_then(|p| p["kpi_scores"].as_array())
        .map(|scores| {
            scores
                .iter()
                .map(|s| {
                    format!(
                        "- {}: {}/100 ({}) - {}",
                        s["kpi_name"].as_str().unwrap_or("KPI"),
                        s["score"],
                        s["compliance"].as_str().unwrap_or("?"),
                        s["reason"].as_str().unwrap_or("")
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    if lines.is_empty() {
        "- No KPI data available".to_string()
    } else {
        lines.join("\n")
    }
}

fn incident_lines(record: &EvaluationRecord) -> String {
    let incidents = record.incidents();
    if incidents.is_empty() {
        return "- No incidents reported".to_string();
    }
    incidents
        .iter()
        .map(|i| {
            format!(
                "- {} [{}] {:?}: {} ({})",
                i.date,
                i.id,
                i.severity,
                i.description,
                if i.resolved { "resolved" } else { "UNRESOLVED" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn string_list(value: &Value) -> String {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "none".to_string())
}

/// Build the reasoning prompt from the record and the deterministic step
/// outputs gathered so far.
pub fn build_reasoning_prompt(ctx: &StepContext<'_>) -> String {
    let record = ctx.record;
    let performance = ctx.output(PERFORMANCE);
    let risk = ctx.output(RISK);
    let intake = ctx.output(INTAKE);

    let budget = match record.budget() {
        Some(b) => format!(
            "allocated {:.0}, spent {:.0}, overrun {:.1}%",
            b.allocated, b.spent, b.overrun_percentage
        ),
        None => "not reported".to_string(),
    };

    format!(
        r#"You are an experienced contract analyst specializing in vendor management,
risk assessment and strategic sourcing.

Evaluate the vendor below by reasoning over every data source provided.

== CONTRACT ==
Contract: {contract_id}
Vendor: {vendor} ({vendor_id})
Department: {department}
Term: {start} to {end}
Value (USD): {value}
Budget: {budget}

== 1. KPI PERFORMANCE (overall {overall}/100, grade {grade}) ==
{kpis}

== 2. INCIDENT LOG ==
{incidents}

== 3. DETERMINISTIC RISK CLASSIFICATION ==
Level: {risk_level}; suggested action: {risk_rec}
Factors: {risk_factors}

== 4. DATA QUALITY ==
Intake warnings: {warnings}

== 5. NOTES ==
{notes}

{contract}
"#,
        contract_id = record.record_id(),
        vendor = record.vendor_name(),
        vendor_id = record.vendor_id(),
        department = record.department().unwrap_or("unknown"),
        start = record.document()["start_date"].as_str().unwrap_or("?"),
        end = record.document()["end_date"].as_str().unwrap_or("?"),
        value = record
            .value_usd()
            .map(|v| format!("{:.0}", v))
            .unwrap_or_else(|| "unknown".to_string()),
        budget = budget,
        overall = performance
            .map(|p| p["overall_score"].to_string())
            .unwrap_or_else(|| "?".to_string()),
        grade = performance.and_then(|p| p["grade"].as_str()).unwrap_or("?"),
        kpis = kpi_lines(performance),
        incidents = incident_lines(record),
        risk_level = risk.and_then(|r| r["risk_level"].as_str()).unwrap_or("unknown"),
        risk_rec = risk.and_then(|r| r["recommendation"].as_str()).unwrap_or("none"),
        risk_factors = risk
            .map(|r| string_list(&r["risk_factors"]))
            .unwrap_or_else(|| "none".to_string()),
        warnings = intake
            .map(|i| string_list(&i["warnings"]))
            .unwrap_or_else(|| "none".to_string()),
        notes = record.notes().unwrap_or("None"),
        contract = OUTPUT_CONTRACT,
    )
}
