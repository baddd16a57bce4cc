//! One scan cycle: enumerate, fingerprint, diff.
//!
//! A cycle walks the configured directories, fingerprints every matching
//! file (in parallel), and diffs the digests against the shared
//! [`FingerprintStore`]:
//!
//! - a file with no recorded fingerprint is **baseline-recorded**, never
//!   reported as changed
//! - a file whose recorded fingerprint differs is reported in the cycle's
//!   [`ChangeBatch`]
//! - an unreadable file is logged, counted, and treated as unchanged for
//!   this cycle; the scan continues
//!
//! Every successfully fingerprinted file refreshes the store, changed or
//! not. Enumeration collects paths first, then fingerprints in parallel,
//! then diffs sequentially in enumeration order.

use camino::{Utf8Path, Utf8PathBuf};
use hs_core::{fingerprint_file, FingerprintStore, WatchConfig};
use ignore::WalkBuilder;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::events::{ChangeBatch, ChangeEvent, CycleStats};
use crate::filter::FileFilter;

/// The result of one scan cycle.
#[derive(Debug)]
pub struct CycleOutcome {
    /// Files whose fingerprint changed from a recorded baseline.
    pub batch: ChangeBatch,

    /// Counters for this cycle.
    pub stats: CycleStats,
}

/// Runs a single scan cycle against the shared fingerprint store.
///
/// # Examples
///
/// ```no_run
/// use hs_watcher::{scan_cycle, ExtensionFilter};
/// use hs_core::{FingerprintStore, WatchConfig};
///
/// let store = FingerprintStore::new();
/// let filter = ExtensionFilter::new(&["unit"]);
/// let outcome = scan_cycle(&WatchConfig::default(), &filter, &store, 1);
/// println!("{} changed", outcome.batch.len());
/// ```
#[must_use]
pub fn scan_cycle(
    config: &WatchConfig,
    filter: &dyn FileFilter,
    store: &FingerprintStore,
    cycle: u64,
) -> CycleOutcome {
    let paths = enumerate(config, filter);

    // Fingerprint in parallel; order is preserved for the sequential diff.
    let digests: Vec<(Utf8PathBuf, std::io::Result<hs_core::ContentHash>)> = paths
        .into_par_iter()
        .map(|path| {
            let digest = fingerprint_file(&path);
            (path, digest)
        })
        .collect();

    let mut batch = ChangeBatch::new(cycle);
    let mut stats = CycleStats::default();

    for (path, result) in digests {
        stats.scanned += 1;
        match result {
            Err(error) => {
                stats.errors += 1;
                warn!(
                    path = %path,
                    error = %error,
                    "File unreadable this cycle; treated as unchanged"
                );
            }
            Ok(digest) => match store.get(&path) {
                None => {
                    store.record(path, digest);
                    stats.new_files += 1;
                }
                Some(previous) if previous != digest => {
                    store.record(path.clone(), digest);
                    stats.changed += 1;
                    batch.push(ChangeEvent::new(path, digest));
                }
                Some(_) => {
                    store.record(path, digest);
                }
            },
        }
    }

    CycleOutcome { batch, stats }
}

/// Collects the files a cycle should fingerprint.
fn enumerate(config: &WatchConfig, filter: &dyn FileFilter) -> Vec<Utf8PathBuf> {
    let mut paths = Vec::new();

    for dir in &config.directories {
        // Canonicalize so scan paths match the engine's registered paths.
        let root = match dir.canonicalize_utf8() {
            Ok(root) => root,
            Err(error) => {
                debug!(dir = %dir, error = %error, "Watched directory unavailable; skipping");
                continue;
            }
        };

        let mut builder = WalkBuilder::new(root.as_std_path());
        builder
            .standard_filters(true)
            .follow_links(false)
            .threads(1)
            .require_git(false);
        if !config.recursive {
            builder.max_depth(Some(1));
        }

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(error = %error, "Walk error during scan");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                warn!(path = %entry.path().display(), "Skipping non-UTF-8 path");
                continue;
            };

            if should_skip(path, &config.ignore_dirs) {
                continue;
            }

            if !filter.should_scan(path) {
                continue;
            }

            paths.push(path.to_owned());
        }
    }

    paths
}

/// Checks whether any path component is in the ignore list.
fn should_skip(path: &Utf8Path, ignore_dirs: &[String]) -> bool {
    path.components()
        .any(|component| ignore_dirs.iter().any(|d| d == component.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptAllFilter, ExtensionFilter};
    use std::fs;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> WatchConfig {
        WatchConfig {
            directories: vec![Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()],
            extensions: vec!["unit".to_owned()],
            ..WatchConfig::default()
        }
    }

    #[test]
    fn test_first_scan_baselines_without_reporting() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.unit"), "f = 1").unwrap();

        let store = FingerprintStore::new();
        let outcome = scan_cycle(&config_for(&dir), &AcceptAllFilter, &store, 1);

        assert!(outcome.batch.is_empty());
        assert_eq!(outcome.stats.new_files, 1);
        assert_eq!(outcome.stats.changed, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unchanged_file_not_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.unit"), "f = 1").unwrap();

        let store = FingerprintStore::new();
        let config = config_for(&dir);
        scan_cycle(&config, &AcceptAllFilter, &store, 1);

        // Touch without changing content.
        fs::write(dir.path().join("a.unit"), "f = 1").unwrap();
        let outcome = scan_cycle(&config, &AcceptAllFilter, &store, 2);

        assert!(outcome.batch.is_empty());
        assert_eq!(outcome.stats.changed, 0);
        assert_eq!(outcome.stats.new_files, 0);
    }

    #[test]
    fn test_changed_file_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.unit"), "f = 1").unwrap();

        let store = FingerprintStore::new();
        let config = config_for(&dir);
        scan_cycle(&config, &AcceptAllFilter, &store, 1);

        fs::write(dir.path().join("a.unit"), "f = 2").unwrap();
        let outcome = scan_cycle(&config, &AcceptAllFilter, &store, 2);

        assert_eq!(outcome.batch.len(), 1);
        assert_eq!(outcome.stats.changed, 1);
        assert!(outcome.batch.events[0].path.as_str().ends_with("a.unit"));
    }

    #[test]
    fn test_extension_filter_limits_scan() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.unit"), "f = 1").unwrap();
        fs::write(dir.path().join("b.txt"), "ignored").unwrap();

        let store = FingerprintStore::new();
        let filter = ExtensionFilter::new(&["unit"]);
        let outcome = scan_cycle(&config_for(&dir), &filter, &store, 1);

        assert_eq!(outcome.stats.scanned, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ignore_dirs_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("skipme")).unwrap();
        fs::write(dir.path().join("skipme/a.unit"), "f = 1").unwrap();
        fs::write(dir.path().join("b.unit"), "f = 1").unwrap();

        let store = FingerprintStore::new();
        let mut config = config_for(&dir);
        config.ignore_dirs = vec!["skipme".to_owned()];

        let outcome = scan_cycle(&config, &AcceptAllFilter, &store, 1);
        assert_eq!(outcome.stats.scanned, 1);
    }

    #[test]
    fn test_non_recursive_scan() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/a.unit"), "f = 1").unwrap();
        fs::write(dir.path().join("b.unit"), "f = 1").unwrap();

        let store = FingerprintStore::new();
        let mut config = config_for(&dir);
        config.recursive = false;

        let outcome = scan_cycle(&config, &AcceptAllFilter, &store, 1);
        assert_eq!(outcome.stats.scanned, 1);
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let store = FingerprintStore::new();
        let config = WatchConfig {
            directories: vec![Utf8PathBuf::from("/nonexistent/watch/dir")],
            ..WatchConfig::default()
        };

        let outcome = scan_cycle(&config, &AcceptAllFilter, &store, 1);
        assert_eq!(outcome.stats.scanned, 0);
        assert!(outcome.batch.is_empty());
    }

    #[test]
    fn test_scan_matches_engine_canonical_paths() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.unit");
        fs::write(&file, "f = 1").unwrap();

        let store = FingerprintStore::new();
        let canonical = Utf8PathBuf::from_path_buf(file.canonicalize().unwrap()).unwrap();
        store.record(canonical.clone(), hs_core::fingerprint_bytes(b"old"));

        let outcome = scan_cycle(&config_for(&dir), &AcceptAllFilter, &store, 1);
        assert_eq!(outcome.batch.len(), 1);
        assert_eq!(outcome.batch.events[0].path, canonical);
    }
}
