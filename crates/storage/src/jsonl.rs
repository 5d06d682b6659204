//! JSON Lines file backend: one audit entry per line, append-only.
//!
//! Blocking file I/O runs inside `tokio::task::spawn_blocking`. Each entry
//! is written with a single `write_all` of the complete line under a
//! process-wide lock, so concurrent appends can never interleave bytes.
//! A write that fails part-way is rolled back to the previous length, and
//! an unterminated fragment left by a crash is cut off when the log is
//! opened.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::AuditEntry;
use crate::traits::AuditStore;

pub struct JsonlAuditStore {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl JsonlAuditStore {
    /// Open (creating if needed) the log at `path`, including parent dirs.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
        drop_unterminated_tail(&mut file).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(JsonlAuditStore {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Cut the log back to its last complete line.
fn drop_unterminated_tail(file: &mut File) -> std::io::Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    let mut keep = len;
    let mut buf = [0u8; 4096];
    while keep > 0 {
        let chunk = keep.min(buf.len() as u64);
        file.seek(SeekFrom::Start(keep - chunk))?;
        let window = &mut buf[..chunk as usize];
        file.read_exact(window)?;
        match window.iter().rposition(|&b| b == b'\n') {
            Some(pos) => {
                keep = keep - chunk + pos as u64 + 1;
                break;
            }
            None => keep -= chunk,
        }
    }
    if keep < len {
        tracing::warn!(
            dropped_bytes = len - keep,
            "discarding unterminated trailing audit line"
        );
        file.set_len(keep)?;
    }
    Ok(())
}

/// Write one complete line, or restore the previous length on failure.
fn append_line<F: Write + Truncate>(file: &mut F, line: &[u8]) -> std::io::Result<()> {
    let before = file.current_len()?;
    let written = file.write_all(line).and_then(|()| file.flush());
    if let Err(err) = written {
        if let Err(rollback) = file.truncate_to(before) {
            tracing::error!(error = %rollback, "audit line rollback failed");
        }
        return Err(err);
    }
    Ok(())
}

/// Length control needed to roll back a partial write.
trait Truncate {
    fn current_len(&self) -> std::io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> std::io::Result<()>;
}

impl Truncate for File {
    fn current_len(&self) -> std::io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

fn read_entries(path: &Path) -> Result<Vec<AuditEntry>, StorageError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry =
            serde_json::from_str(&line).map_err(|e| StorageError::Corrupt {
                line: idx + 1,
                message: e.to_string(),
            })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[async_trait]
impl AuditStore for JsonlAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let file = Arc::clone(&self.file);
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = file
                .lock()
                .map_err(|_| StorageError::Backend("audit file lock poisoned".to_string()))?;
            append_line(&mut *guard, line.as_bytes())
                .map_err(|source| StorageError::Io { path, source })
        })
        .await
        .map_err(|e| StorageError::Backend(format!("append task join error: {}", e)))?
    }

    async fn entries(&self) -> Result<Vec<AuditEntry>, StorageError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_entries(&path))
            .await
            .map_err(|e| StorageError::Backend(format!("read task join error: {}", e)))?
    }
}
