use super::{print_json, EXIT_ERROR, EXIT_NEGATIVE, EXIT_OK};
use crate::config::Config;
use crate::{report_error, OutputFormat};

pub(crate) async fn cmd_health(config: &Config, output: OutputFormat, quiet: bool) -> i32 {
    let provider = match config.build_provider() {
        Ok(p) => p,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            return EXIT_ERROR;
        }
    };
    let info = provider.describe();
    let healthy = provider.check_health().await;
    tracing::info!(provider = %info.provider, model = %info.model, healthy, "provider health");

    if !quiet {
        match output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "provider": info.provider,
                "model": info.model,
                "endpoint": info.endpoint,
                "healthy": healthy,
                "ledger": config.ledger.path,
            })),
            OutputFormat::Text => {
                let endpoint = info
                    .endpoint
                    .as_deref()
                    .map(|e| format!(" at {}", e))
                    .unwrap_or_default();
                println!(
                    "{} ({}){}: {}",
                    info.provider,
                    info.model,
                    endpoint,
                    if healthy { "healthy" } else { "unreachable" }
                );
            }
        }
    }
    if healthy {
        EXIT_OK
    } else {
        EXIT_NEGATIVE
    }
}
