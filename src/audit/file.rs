//! Append-only audit log file.
//!
//! # Concurrency
//!
//! A single `Mutex` owns the file handle. Each record is rendered to a
//! complete line first, then written with one `write_all` while the lock is
//! held, so concurrent requests can never interleave partial lines. Records
//! from concurrent requests are not guaranteed to be in timestamp order.
//!
//! # Lifecycle
//!
//! The handle is opened at most once per sink: lazily on the first append,
//! or eagerly through [`FileAuditSink::ensure_open`] at startup so that a bad
//! path fails fast. The parent directory is created if missing. The file is
//! never truncated or rotated here; rotation belongs to external tooling
//! (e.g. `logrotate` with `copytruncate`).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use super::{AuditFormat, AuditRecord, AuditSink};
use crate::error::{AuditError, AuditResult};

/// Audit sink writing one line per record to a file.
#[derive(Debug)]
pub struct FileAuditSink {
    path: PathBuf,
    format: AuditFormat,
    file: Mutex<Option<File>>,
    written: AtomicU64,
}

impl FileAuditSink {
    /// Create a sink for `path`. Nothing touches the filesystem until the
    /// first append or [`ensure_open`](Self::ensure_open).
    pub fn new(path: impl Into<PathBuf>, format: AuditFormat) -> Self {
        Self {
            path: path.into(),
            format,
            file: Mutex::new(None),
            written: AtomicU64::new(0),
        }
    }

    /// Create a sink and open its file immediately.
    pub fn open(path: impl Into<PathBuf>, format: AuditFormat) -> AuditResult<Self> {
        let sink = Self::new(path, format);
        sink.ensure_open()?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> AuditFormat {
        self.format
    }

    /// Open the backing file (and its directory) if not open yet.
    pub fn ensure_open(&self) -> AuditResult<()> {
        let mut guard = self.file.lock().map_err(|_| AuditError::Poisoned)?;
        if guard.is_none() {
            *guard = Some(open_append(&self.path)?);
        }
        Ok(())
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, record: &AuditRecord) -> AuditResult<()> {
        let mut line = record.to_line(self.format)?;
        line.push('\n');

        let mut guard = self.file.lock().map_err(|_| AuditError::Poisoned)?;
        let file = match guard.take() {
            Some(file) => file,
            None => open_append(&self.path)?,
        };
        let file = guard.insert(file);

        file.write_all(line.as_bytes())
            .map_err(|source| AuditError::Write {
                path: self.path.clone(),
                source,
            })?;

        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}

fn open_append(path: &Path) -> AuditResult<File> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        fs::create_dir_all(dir).map_err(|source| AuditError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(dir = %dir.display(), "Created audit log directory");
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AuditError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), "Audit log opened");
    Ok(file)
}
