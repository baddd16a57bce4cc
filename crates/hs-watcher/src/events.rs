//! Change events produced by scan cycles.

use std::time::Instant;

use camino::Utf8PathBuf;
use hs_core::ContentHash;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One file whose content fingerprint changed since the previous scan.
///
/// Only files with a previously recorded fingerprint are reported; a file
/// seen for the first time is baseline-recorded silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the changed file.
    pub path: Utf8PathBuf,

    /// The new content fingerprint.
    pub fingerprint: ContentHash,

    /// Monotonic time the change was observed.
    pub observed_at: Instant,
}

impl ChangeEvent {
    /// Creates a change event observed now.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, fingerprint: ContentHash) -> Self {
        Self {
            path,
            fingerprint,
            observed_at: Instant::now(),
        }
    }
}

/// All changes observed in one scan cycle.
///
/// Uses [`SmallVec`] inline storage for the common case of a handful of
/// changed files per cycle.
///
/// # Examples
///
/// ```
/// use hs_watcher::{ChangeBatch, ChangeEvent};
/// use hs_core::fingerprint_bytes;
/// use camino::Utf8PathBuf;
///
/// let mut batch = ChangeBatch::new(7);
/// batch.push(ChangeEvent::new(
///     Utf8PathBuf::from("/units/a.unit"),
///     fingerprint_bytes(b"f = 2"),
/// ));
/// assert_eq!(batch.len(), 1);
/// assert_eq!(batch.cycle, 7);
/// ```
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    /// The changed files, in enumeration order.
    pub events: SmallVec<[ChangeEvent; 8]>,

    /// Sequence number of the scan cycle that produced this batch.
    pub cycle: u64,
}

impl ChangeBatch {
    /// Creates an empty batch for the given cycle.
    #[inline]
    #[must_use]
    pub fn new(cycle: u64) -> Self {
        Self {
            events: SmallVec::new(),
            cycle,
        }
    }

    /// Adds an event to the batch.
    #[inline]
    pub fn push(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }

    /// Returns the number of events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no changes were observed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over the events.
    pub fn iter(&self) -> impl Iterator<Item = &ChangeEvent> {
        self.events.iter()
    }

    /// Returns the changed paths, deduplicated and sorted.
    #[must_use]
    pub fn unique_paths(&self) -> Vec<Utf8PathBuf> {
        let mut paths: Vec<Utf8PathBuf> = self.events.iter().map(|e| e.path.clone()).collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

impl<'a> IntoIterator for &'a ChangeBatch {
    type Item = &'a ChangeEvent;
    type IntoIter = std::slice::Iter<'a, ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Summary counters for one scan cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    /// Files fingerprinted this cycle.
    pub scanned: usize,

    /// Files whose fingerprint changed from a recorded baseline.
    pub changed: usize,

    /// Files fingerprinted for the first time (baseline recorded).
    pub new_files: usize,

    /// Files that could not be read this cycle (treated as unchanged).
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hs_core::fingerprint_bytes;

    fn event(path: &str) -> ChangeEvent {
        ChangeEvent::new(Utf8PathBuf::from(path), fingerprint_bytes(b"x"))
    }

    #[test]
    fn test_batch_push_and_len() {
        let mut batch = ChangeBatch::new(1);
        assert!(batch.is_empty());
        batch.push(event("/a.unit"));
        batch.push(event("/b.unit"));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_unique_paths_dedupes_and_sorts() {
        let mut batch = ChangeBatch::new(1);
        batch.push(event("/b.unit"));
        batch.push(event("/a.unit"));
        batch.push(event("/b.unit"));

        let paths = batch.unique_paths();
        assert_eq!(
            paths,
            vec![Utf8PathBuf::from("/a.unit"), Utf8PathBuf::from("/b.unit")]
        );
    }

    #[test]
    fn test_batch_iteration() {
        let mut batch = ChangeBatch::new(1);
        batch.push(event("/a.unit"));
        let collected: Vec<_> = batch.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(collected, vec!["/a.unit"]);
        let via_ref: Vec<_> = (&batch).into_iter().collect();
        assert_eq!(via_ref.len(), 1);
    }

    #[test]
    fn test_cycle_stats_serialization() {
        let stats = CycleStats {
            scanned: 10,
            changed: 2,
            new_files: 1,
            errors: 0,
        };
        let json = serde_json::to_string(&stats).unwrap();
        let parsed: CycleStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats, parsed);
    }
}
