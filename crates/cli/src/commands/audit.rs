use arbiter_storage::AuditFilter;

use super::{open_ledger, print_json, EXIT_ERROR, EXIT_OK};
use crate::config::Config;
use crate::{report_error, OutputFormat};

pub(crate) struct AuditQuery {
    pub actor: Option<String>,
    pub action: Option<String>,
    pub limit: Option<usize>,
    pub newest_first: bool,
}

pub(crate) async fn cmd_audit(
    query: AuditQuery,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) -> i32 {
    let ledger = match open_ledger(config) {
        Ok(l) => l,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            return EXIT_ERROR;
        }
    };
    let filter = AuditFilter {
        actor: query.actor,
        action: query.action,
        limit: query.limit,
    };
    let mut entries = match ledger.read(&filter).await {
        Ok(e) => e,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            return EXIT_ERROR;
        }
    };
    if query.newest_first {
        entries.reverse();
    }

    if !quiet {
        match output {
            OutputFormat::Json => print_json(&entries),
            OutputFormat::Text => {
                for e in &entries {
                    println!(
                        "{}  {:<22} {:<24} {:.3}{}",
                        e.timestamp,
                        e.actor,
                        e.action,
                        e.confidence,
                        if e.human_override { "  (override)" } else { "" }
                    );
                }
                println!("{} entries", entries.len());
            }
        }
    }
    EXIT_OK
}
