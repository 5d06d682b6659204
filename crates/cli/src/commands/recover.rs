use std::path::Path;

use arbiter_eval::recover;

use super::{print_json, read_input_lossy, EXIT_ERROR, EXIT_OK};
use crate::{report_error, OutputFormat};

/// Recover a decision from saved provider text. Never fails on content,
/// including bytes that are not UTF-8.
pub(crate) fn cmd_recover(path: &Path, output: OutputFormat, quiet: bool) -> i32 {
    let text = match read_input_lossy(path) {
        Ok(t) => t,
        Err(msg) => {
            report_error(&msg, output, quiet);
            return EXIT_ERROR;
        }
    };
    let decision = recover(&text);
    tracing::debug!(recovery = ?decision.recovery, "recovered decision");
    if quiet {
        return EXIT_OK;
    }
    match output {
        OutputFormat::Json => print_json(&decision),
        OutputFormat::Text => {
            println!("recommendation:  {}", decision.recommendation);
            println!("confidence:      {}", decision.confidence_level);
            println!("recovery:        {:?}", decision.recovery);
            println!("justification:   {}", decision.justification);
            println!("reasoning:");
            for line in &decision.reasoning_chain {
                println!("  - {}", line);
            }
            println!("risk factors:");
            for line in &decision.risk_factors {
                println!("  - {}", line);
            }
        }
    }
    EXIT_OK
}
