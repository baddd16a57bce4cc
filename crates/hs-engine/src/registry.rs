//! The module registry: the single source of truth for live units.
//!
//! The registry maps logical module names to their [`ModuleRecord`]:
//! the currently live unit handle, the source path, load/reload timestamps,
//! and the reload counter. There is never more than one live unit per name.
//!
//! The registry itself is plain data and assumes a single writer; the engine
//! owns it behind one mutex and is the only writer. See
//! [`crate::engine::HotSwapEngine`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use hs_core::{FxHashMap, ModuleInfo};
use tracing::warn;

use crate::error::RegistryError;
use crate::loader::LoadedUnit;

/// Bookkeeping for one registered module.
#[derive(Clone)]
pub struct ModuleRecord {
    /// Logical module name.
    pub name: String,

    /// Absolute source path. Immutable after registration: reloading always
    /// re-reads this path.
    pub path: Utf8PathBuf,

    /// The currently live unit. Swapped wholesale on reload; readers see the
    /// old handle or the new one, never a mixture.
    pub unit: Arc<dyn LoadedUnit>,

    /// Monotonic time of the initial load.
    pub loaded_at: Instant,

    /// Wall-clock time of the initial load.
    pub loaded_at_wall: DateTime<Utc>,

    /// Monotonic time of the most recent successful reload.
    pub reloaded_at: Option<Instant>,

    /// Wall-clock time of the most recent successful reload.
    pub reloaded_at_wall: Option<DateTime<Utc>>,

    /// Number of successful reloads. Never advanced by a failed reload.
    pub reload_count: u64,

    /// Instants of recent successful reloads, for rate limiting.
    pub(crate) recent_reloads: VecDeque<Instant>,
}

impl std::fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("reload_count", &self.reload_count)
            .finish_non_exhaustive()
    }
}

impl ModuleRecord {
    /// Returns a serializable snapshot of this record's metadata.
    #[must_use]
    pub fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: self.name.clone(),
            path: self.path.clone(),
            loaded_at: self.loaded_at_wall,
            reloaded_at: self.reloaded_at_wall,
            reload_count: self.reload_count,
        }
    }

    /// Counts reloads recorded within the trailing window, pruning older
    /// entries as a side effect.
    pub(crate) fn reloads_within(&mut self, window: std::time::Duration) -> u32 {
        let now = Instant::now();
        while let Some(front) = self.recent_reloads.front() {
            if now.duration_since(*front) > window {
                self.recent_reloads.pop_front();
            } else {
                break;
            }
        }
        u32::try_from(self.recent_reloads.len()).unwrap_or(u32::MAX)
    }
}

/// In-memory table of registered modules.
///
/// Not synchronized: callers must ensure a single writer (the engine wraps
/// the registry in a mutex).
///
/// # Examples
///
/// ```
/// use hs_engine::{ModuleRegistry, ScriptLoader, UnitLoader};
/// use camino::Utf8PathBuf;
///
/// let unit = ScriptLoader::new().load("m", "f = 1").unwrap();
/// let mut registry = ModuleRegistry::new();
/// registry.register("m", unit, Utf8PathBuf::from("/units/m.unit")).unwrap();
/// assert_eq!(registry.list(), vec!["m"]);
/// ```
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    records: FxHashMap<String, ModuleRecord>,
    /// Names in registration order, for stable listings.
    order: Vec<String>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new module.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if the name is taken.
    /// Callers wanting replacement must go through the engine's reload, not
    /// through `register`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        unit: Arc<dyn LoadedUnit>,
        path: Utf8PathBuf,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.records.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        let record = ModuleRecord {
            name: name.clone(),
            path,
            unit,
            loaded_at: Instant::now(),
            loaded_at_wall: Utc::now(),
            reloaded_at: None,
            reloaded_at_wall: None,
            reload_count: 0,
            recent_reloads: VecDeque::new(),
        };
        self.records.insert(name.clone(), record);
        self.order.push(name);
        Ok(())
    }

    /// Returns the record for a module.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names.
    pub fn get(&self, name: &str) -> Result<&ModuleRecord, RegistryError> {
        self.records
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))
    }

    /// Returns a mutable record for engine-internal updates.
    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut ModuleRecord, RegistryError> {
        self.records
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_owned()))
    }

    /// Swaps the live unit for a module and advances its counters.
    ///
    /// The unit reference is replaced last, after the caller has fully
    /// constructed the new unit, so readers never observe a half-updated
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names.
    pub fn update_unit(
        &mut self,
        name: &str,
        unit: Arc<dyn LoadedUnit>,
    ) -> Result<(), RegistryError> {
        let record = self.get_mut(name)?;
        let now = Instant::now();
        record.reload_count += 1;
        record.reloaded_at = Some(now);
        record.reloaded_at_wall = Some(Utc::now());
        record.recent_reloads.push_back(now);
        record.unit = unit;
        Ok(())
    }

    /// Removes a module's record.
    ///
    /// Removing an unknown name is a no-op with a warning, returning `None`.
    pub fn remove(&mut self, name: &str) -> Option<ModuleRecord> {
        let removed = self.records.remove(name);
        if removed.is_some() {
            self.order.retain(|n| n != name);
        } else {
            warn!(name = %name, "Module not registered; nothing to remove");
        }
        removed
    }

    /// Returns all module names in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Returns the names of all modules backed by the given source path.
    #[must_use]
    pub fn names_for_path(&self, path: &Utf8Path) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| {
                self.records
                    .get(name.as_str())
                    .is_some_and(|r| r.path == path)
            })
            .cloned()
            .collect()
    }

    /// Returns a metadata snapshot for a module.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names.
    pub fn info(&self, name: &str) -> Result<ModuleInfo, RegistryError> {
        Ok(self.get(name)?.info())
    }

    /// Returns the number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no modules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ScriptLoader, UnitLoader};

    fn unit(source: &str) -> Arc<dyn LoadedUnit> {
        ScriptLoader::new().load("m", source).unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("m", unit("f = 1"), Utf8PathBuf::from("/m.unit"))
            .unwrap();

        let record = registry.get("m").unwrap();
        assert_eq!(record.name, "m");
        assert_eq!(record.reload_count, 0);
        assert!(record.reloaded_at.is_none());
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("m", unit("f = 1"), Utf8PathBuf::from("/m.unit"))
            .unwrap();
        let err = registry
            .register("m", unit("f = 2"), Utf8PathBuf::from("/m.unit"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(name) if name == "m"));
    }

    #[test]
    fn test_get_not_found() {
        let registry = ModuleRegistry::new();
        assert!(matches!(
            registry.get("missing").unwrap_err(),
            RegistryError::NotFound(name) if name == "missing"
        ));
    }

    #[test]
    fn test_update_unit_advances_counters() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("m", unit("f = 1"), Utf8PathBuf::from("/m.unit"))
            .unwrap();

        registry.update_unit("m", unit("f = 2")).unwrap();
        registry.update_unit("m", unit("f = 3")).unwrap();

        let record = registry.get("m").unwrap();
        assert_eq!(record.reload_count, 2);
        assert!(record.reloaded_at.is_some());
    }

    #[test]
    fn test_reloaded_at_strictly_increases() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("m", unit("f = 1"), Utf8PathBuf::from("/m.unit"))
            .unwrap();

        registry.update_unit("m", unit("f = 2")).unwrap();
        let first = registry.get("m").unwrap().reloaded_at.unwrap();

        registry.update_unit("m", unit("f = 3")).unwrap();
        let second = registry.get("m").unwrap().reloaded_at.unwrap();

        assert!(second > first);
    }

    #[test]
    fn test_update_unit_not_found() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.update_unit("m", unit("f = 1")).is_err());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("m", unit("f = 1"), Utf8PathBuf::from("/m.unit"))
            .unwrap();

        assert!(registry.remove("m").is_some());
        assert!(registry.remove("m").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let mut registry = ModuleRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(name, unit("f = 1"), Utf8PathBuf::from("/m.unit"))
                .unwrap();
        }
        assert_eq!(registry.list(), vec!["zeta", "alpha", "mid"]);

        registry.remove("alpha");
        assert_eq!(registry.list(), vec!["zeta", "mid"]);
    }

    #[test]
    fn test_names_for_path() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("a", unit("f = 1"), Utf8PathBuf::from("/shared.unit"))
            .unwrap();
        registry
            .register("b", unit("f = 1"), Utf8PathBuf::from("/other.unit"))
            .unwrap();
        registry
            .register("c", unit("f = 1"), Utf8PathBuf::from("/shared.unit"))
            .unwrap();

        assert_eq!(
            registry.names_for_path(Utf8Path::new("/shared.unit")),
            vec!["a", "c"]
        );
        assert!(registry
            .names_for_path(Utf8Path::new("/missing.unit"))
            .is_empty());
    }

    #[test]
    fn test_info_snapshot() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("m", unit("f = 1"), Utf8PathBuf::from("/m.unit"))
            .unwrap();

        let info = registry.info("m").unwrap();
        assert_eq!(info.name, "m");
        assert_eq!(info.reload_count, 0);
        assert!(!info.has_reloaded());
    }

    #[test]
    fn test_reloads_within_window() {
        let mut registry = ModuleRegistry::new();
        registry
            .register("m", unit("f = 1"), Utf8PathBuf::from("/m.unit"))
            .unwrap();
        registry.update_unit("m", unit("f = 2")).unwrap();
        registry.update_unit("m", unit("f = 3")).unwrap();

        let record = registry.get_mut("m").unwrap();
        assert_eq!(record.reloads_within(std::time::Duration::from_secs(60)), 2);
        assert_eq!(
            record.reloads_within(std::time::Duration::from_nanos(0)),
            0
        );
    }
}
