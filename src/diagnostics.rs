//! Append-only diagnostic log for suppressed failures.
//!
//! Plain text, one timestamped block per failure, blocks separated by a
//! blank line. Once the file reaches `max_bytes` it is truncated and the
//! new entry starts a fresh file. Writing is best effort: an I/O problem
//! is reported through `tracing` and never reaches the caller.
//!
//! Inside a tokio runtime the write runs detached on the blocking pool, so
//! [`DiagnosticLog::record`] returns without touching the filesystem.
//! [`DiagnosticLog::flush`] waits for writes still in flight.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ScrapeError;
use crate::options::DiagnosticsConfig;

const ENTRY_SEPARATOR: &str = "\n\n";

/// Size-capped error log on disk.
#[derive(Debug)]
pub struct DiagnosticLog {
    file: Arc<LogFile>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Debug)]
struct LogFile {
    path: PathBuf,
    max_bytes: u64,
    /// Serialises writers within this process
    lock: Mutex<()>,
}

impl DiagnosticLog {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            file: Arc::new(LogFile {
                path: path.into(),
                max_bytes,
                lock: Mutex::new(()),
            }),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Build from config; `None` when logging to disk is disabled.
    pub fn from_config(config: &DiagnosticsConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.path.clone(), config.max_bytes))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Append one entry for `error`. Never fails and never blocks on I/O
    /// when called from a runtime.
    pub fn record(&self, error: &ScrapeError) {
        let entry = format_entry(error);

        let Ok(runtime) = Handle::try_current() else {
            self.file.write(&entry);
            return;
        };

        let file = Arc::clone(&self.file);
        let task = runtime.spawn_blocking(move || file.write(&entry));

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|task| !task.is_finished());
        pending.push(task);
    }

    /// Wait until every write issued so far has reached the file.
    pub async fn flush(&self) {
        let tasks: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Diagnostic log write aborted: {}", e);
            }
        }
    }

    /// Read back the entries currently in the file.
    pub fn read_entries(&self) -> io::Result<Vec<String>> {
        match fs::read_to_string(&self.file.path) {
            Ok(content) => Ok(content
                .split(ENTRY_SEPARATOR)
                .filter(|e| !e.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

impl LogFile {
    fn write(&self, entry: &str) {
        if let Err(e) = self.try_write(entry) {
            warn!("Failed to write diagnostic log {}: {}", self.path.display(), e);
        }
    }

    fn try_write(&self, entry: &str) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let current = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        if current >= self.max_bytes {
            debug!("Diagnostic log over {} bytes, truncating", self.max_bytes);
            fs::write(&self.path, entry)?;
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if current > 0 {
            file.write_all(ENTRY_SEPARATOR.as_bytes())?;
        }
        file.write_all(entry.as_bytes())
    }
}

fn format_entry(error: &ScrapeError) -> String {
    format!(
        "{} | \n ErrorKind: {}\n ErrorMessage: {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
        error.kind(),
        error.to_string().replace(ENTRY_SEPARATOR, "\n"),
    )
}
