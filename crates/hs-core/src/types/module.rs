//! Module metadata snapshots.
//!
//! This module provides [`ModuleInfo`], the serializable point-in-time view
//! of a registered module's bookkeeping. The live registry record (with its
//! unit handle and monotonic instants) lives in the engine crate; this type
//! is what reports, observers, and the CLI consume.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time snapshot of a registered module.
///
/// # Examples
///
/// ```
/// use hs_core::ModuleInfo;
/// use camino::Utf8PathBuf;
/// use chrono::Utc;
///
/// let info = ModuleInfo {
///     name: "metrics".to_owned(),
///     path: Utf8PathBuf::from("/units/metrics.unit"),
///     loaded_at: Utc::now(),
///     reloaded_at: None,
///     reload_count: 0,
/// };
/// assert!(!info.has_reloaded());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Logical module name (unique within the registry).
    pub name: String,

    /// Absolute path of the module's source file.
    pub path: Utf8PathBuf,

    /// Wall-clock time of the initial load.
    pub loaded_at: DateTime<Utc>,

    /// Wall-clock time of the most recent successful reload, if any.
    pub reloaded_at: Option<DateTime<Utc>>,

    /// Number of successful reloads since the initial load.
    pub reload_count: u64,
}

impl ModuleInfo {
    /// Returns `true` if the module has been reloaded at least once.
    #[inline]
    #[must_use]
    pub const fn has_reloaded(&self) -> bool {
        self.reload_count > 0
    }

    /// Returns the wall-clock time of the most recent (re)load.
    #[inline]
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.reloaded_at.unwrap_or(self.loaded_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModuleInfo {
        ModuleInfo {
            name: "metrics".to_owned(),
            path: Utf8PathBuf::from("/units/metrics.unit"),
            loaded_at: Utc::now(),
            reloaded_at: None,
            reload_count: 0,
        }
    }

    #[test]
    fn test_has_reloaded() {
        let mut info = sample();
        assert!(!info.has_reloaded());
        info.reload_count = 3;
        assert!(info.has_reloaded());
    }

    #[test]
    fn test_last_activity_prefers_reload() {
        let mut info = sample();
        assert_eq!(info.last_activity(), info.loaded_at);

        let later = info.loaded_at + chrono::Duration::seconds(5);
        info.reloaded_at = Some(later);
        assert_eq!(info.last_activity(), later);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let info = sample();
        let json = serde_json::to_string(&info).unwrap();
        let parsed: ModuleInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, parsed);
    }
}
