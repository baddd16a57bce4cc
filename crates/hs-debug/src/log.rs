//! Append-only timestamped event log with retention pruning.
//!
//! The event log is the human-readable record of reload and debug activity,
//! one timestamped line per event. Writes are soft-failing: a full disk or
//! revoked permission downgrades logging to a tracing warning instead of
//! breaking the operation that logged.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::time::{Duration, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Local, Utc};
use parking_lot::Mutex;
use tracing::warn;

/// An append-only log file of timestamped event lines.
///
/// # Examples
///
/// ```no_run
/// use hs_debug::EventLog;
/// use camino::Utf8Path;
///
/// let log = EventLog::create(Utf8Path::new("hotswap/logs"))?;
/// log.append("Session started: session_1");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct EventLog {
    path: Utf8PathBuf,
    file: Mutex<File>,
}

impl EventLog {
    /// Creates a new timestamped log file under `dir`, creating the
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory or file cannot be
    /// created.
    pub fn create(dir: &Utf8Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir.as_std_path())?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("debug_{stamp}.log"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Returns the log file's path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Appends one timestamped line.
    ///
    /// Write failures are reported via tracing and otherwise swallowed; the
    /// log is never allowed to break the operation being logged.
    pub fn append(&self, message: &str) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("[{stamp}] {message}\n");
        let mut file = self.file.lock();
        if let Err(error) = file.write_all(line.as_bytes()) {
            warn!(path = %self.path, error = %error, "Failed to write event log");
        }
    }

    /// Deletes `.log` files under `dir` whose modification time is older
    /// than `days` days. Returns how many files were removed.
    ///
    /// This is a maintenance operation, not part of any hot path.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory itself cannot be read;
    /// individual deletion failures are logged and skipped.
    pub fn prune_older_than(dir: &Utf8Path, days: u32) -> std::io::Result<usize> {
        let cutoff = SystemTime::now() - Duration::from_secs(u64::from(days) * 24 * 3600);
        let mut removed = 0;

        for entry in fs::read_dir(dir.as_std_path())? {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("log") {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if modified < cutoff {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(error) => {
                        warn!(path = %path.display(), error = %error, "Failed to prune log file");
                    }
                }
            }
        }

        Ok(removed)
    }
}
