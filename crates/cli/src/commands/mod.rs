//! Subcommand implementations. Each returns the process exit code.

pub(crate) mod audit;
mod evaluate;
mod health;
mod recover;
mod validate;

pub(crate) use audit::cmd_audit;
pub(crate) use evaluate::cmd_evaluate;
pub(crate) use health::cmd_health;
pub(crate) use recover::cmd_recover;
pub(crate) use validate::cmd_validate;

use std::path::Path;
use std::sync::Arc;

use arbiter_storage::{AuditLedger, JsonlAuditStore, StorageError};

use crate::config::Config;

/// Success, or a run that completed.
pub(crate) const EXIT_OK: i32 = 0;
/// Usage, configuration, I/O and persistence errors.
pub(crate) const EXIT_ERROR: i32 = 1;
/// The command ran but the outcome was negative (failed run, invalid record,
/// unhealthy provider).
pub(crate) const EXIT_NEGATIVE: i32 = 2;

pub(crate) fn open_ledger(config: &Config) -> Result<AuditLedger, StorageError> {
    let store = JsonlAuditStore::open(&config.ledger.path)?;
    Ok(AuditLedger::new(Arc::new(store)))
}

/// Read an input file as bytes; `-` means stdin.
fn read_input_bytes(path: &Path) -> Result<Vec<u8>, String> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut bytes)
            .map_err(|e| format!("error reading stdin: {}", e))?;
        return Ok(bytes);
    }
    std::fs::read(path).map_err(|e| format!("error reading '{}': {}", path.display(), e))
}

/// Read a UTF-8 text input; `-` means stdin.
pub(crate) fn read_input(path: &Path) -> Result<String, String> {
    let bytes = read_input_bytes(path)?;
    String::from_utf8(bytes)
        .map_err(|e| format!("error reading '{}': {}", path.display(), e))
}

/// Read a text input, replacing invalid UTF-8 with U+FFFD.
pub(crate) fn read_input_lossy(path: &Path) -> Result<String, String> {
    let bytes = read_input_bytes(path)?;
    let text = String::from_utf8_lossy(&bytes);
    if let std::borrow::Cow::Owned(_) = text {
        tracing::warn!(input = %path.display(), "input is not valid UTF-8, replaced invalid bytes");
    }
    Ok(text.into_owned())
}

pub(crate) fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("serialization error: {}", e),
    }
}
