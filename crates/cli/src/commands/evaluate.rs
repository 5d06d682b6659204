use std::path::Path;

use arbiter_core::{EvaluationRecord, RecommendationSource, RunStatus, WorkflowRun};
use arbiter_eval::{Orchestrator, OrchestratorError};

use super::{open_ledger, print_json, read_input, EXIT_ERROR, EXIT_NEGATIVE, EXIT_OK};
use crate::config::Config;
use crate::{report_error, OutputFormat};

pub(crate) async fn cmd_evaluate(
    record_path: &Path,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) -> i32 {
    let text = match read_input(record_path) {
        Ok(t) => t,
        Err(msg) => {
            report_error(&msg, output, quiet);
            return EXIT_ERROR;
        }
    };
    let record = match EvaluationRecord::from_json_str(&text) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", record_path.display(), e);
            report_error(&msg, output, quiet);
            return EXIT_ERROR;
        }
    };

    let provider = match config.build_provider() {
        Ok(p) => p,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            return EXIT_ERROR;
        }
    };
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            return EXIT_ERROR;
        }
    };
    let orchestrator = match Orchestrator::standard(ledger, provider, config.pipeline_settings()) {
        Ok(o) => o,
        Err(e) => {
            report_error(&format!("internal error: {}", e), output, quiet);
            return EXIT_ERROR;
        }
    };

    match orchestrator.run(&record).await {
        Ok(run) => {
            let pending = orchestrator.escalations().pending().await.len();
            if !quiet {
                match output {
                    OutputFormat::Json => print_json(&run),
                    OutputFormat::Text => print_run(&run, pending),
                }
            }
            if run.status() == RunStatus::Completed {
                EXIT_OK
            } else {
                EXIT_NEGATIVE
            }
        }
        Err(err @ OrchestratorError::Persistence { .. }) => {
            if output == OutputFormat::Json && !quiet {
                print_json(err.run());
            }
            report_error(&err.to_string(), output, quiet);
            EXIT_ERROR
        }
    }
}

fn print_run(run: &WorkflowRun, pending: usize) {
    println!("{}  {}", run.record_id(), run.vendor_name());
    println!("status:          {}", run.status().as_str());
    if let Some(score) = run.performance_score() {
        println!("performance:     {:.1}", score);
    }
    if let Some(level) = run.risk_level() {
        println!("risk:            {}", level);
    }
    if let Some(rec) = run.recommendation() {
        let source = match run.recommendation_source() {
            Some(RecommendationSource::Synthesis) => " (synthesis)",
            Some(RecommendationSource::RiskClassification) => " (risk classification)",
            None => "",
        };
        println!("recommendation:  {}{}", rec, source);
    }
    if let Some(confidence) = run.confidence_level() {
        println!("confidence:      {}", confidence);
    }
    if let Some(decision) = run.decision() {
        println!("justification:   {}", decision.justification);
    }
    println!("steps:");
    for step in run.steps() {
        println!(
            "  {:<22} {:<10} {:>5.3}  {}ms",
            step.step,
            format!("{:?}", step.status).to_lowercase(),
            step.confidence,
            step.duration_ms
        );
    }
    if pending > 0 {
        println!("escalations:     {} pending human review", pending);
    }
    if let Some(error) = run.error() {
        println!("error:           {}", error);
    }
}
