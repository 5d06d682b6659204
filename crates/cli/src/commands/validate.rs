use std::path::Path;

use arbiter_eval::{completeness, ContractValidator};

use super::{print_json, read_input, EXIT_ERROR, EXIT_NEGATIVE, EXIT_OK};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_validate(path: &Path, output: OutputFormat, quiet: bool) -> i32 {
    let text = match read_input(path) {
        Ok(t) => t,
        Err(msg) => {
            report_error(&msg, output, quiet);
            return EXIT_ERROR;
        }
    };
    let doc: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            return EXIT_ERROR;
        }
    };
    let validator = match ContractValidator::new() {
        Ok(v) => v,
        Err(e) => {
            report_error(&format!("internal error: {}", e), output, quiet);
            return EXIT_ERROR;
        }
    };

    let report = validator.validate(&doc);
    let completeness = completeness(&doc);
    if !quiet {
        match output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "valid": report.valid,
                "errors": report.errors,
                "warnings": report.warnings,
                "completeness": completeness,
            })),
            OutputFormat::Text => {
                if report.valid {
                    println!("valid (completeness {:.0}%)", completeness * 100.0);
                } else {
                    println!("invalid");
                }
                for err in &report.errors {
                    println!("  error: {}", err);
                }
                for warning in &report.warnings {
                    println!("  warning: {}", warning);
                }
            }
        }
    }
    if report.valid {
        EXIT_OK
    } else {
        EXIT_NEGATIVE
    }
}
