//! The hot-reload engine.
//!
//! [`HotSwapEngine`] owns the module registry and the shared fingerprint
//! store, executes units through the configured [`UnitLoader`], and reports
//! reload outcomes on its [`ObserverBus`].
//!
//! # Consistency model
//!
//! All engine operations serialize behind one registry mutex, which is the
//! mutual-exclusion discipline required once both a foreground thread and
//! the watcher thread call in. A reload constructs the replacement unit
//! completely before the registry record is touched; on any failure the
//! record is left exactly as it was, so a name that was loadable once never
//! degrades below "stale but working". Observers are notified after the
//! lock is released.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use hs_core::{
    fingerprint_bytes, BackupConfig, Config, FingerprintStore, FxHashMap, ModuleConfig, ModuleInfo,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::bus::ObserverBus;
use crate::error::EngineError;
use crate::loader::{LoadedUnit, UnitLoader};
use crate::registry::ModuleRegistry;

/// Window used for the reloads-per-minute budget.
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Derives a stable module name from a source path.
///
/// The name depends only on the path string (never on file content), so
/// repeated loads of the same path across runs reuse the same name.
///
/// # Examples
///
/// ```
/// use hs_engine::derive_unit_name;
/// use camino::Utf8Path;
///
/// let a = derive_unit_name(Utf8Path::new("/units/metrics.unit"));
/// let b = derive_unit_name(Utf8Path::new("/units/metrics.unit"));
/// assert_eq!(a, b);
/// assert!(a.starts_with("unit_"));
/// ```
#[must_use]
pub fn derive_unit_name(path: &Utf8Path) -> String {
    let digest = blake3::hash(path.as_str().as_bytes());
    format!("unit_{}", &digest.to_hex()[..8])
}

/// The reload engine: loads, reloads, and unloads units atomically.
///
/// # Examples
///
/// ```no_run
/// use hs_engine::{HotSwapEngine, ScriptLoader};
/// use camino::Utf8Path;
/// use std::sync::Arc;
///
/// let engine = HotSwapEngine::new(Arc::new(ScriptLoader::new()));
/// let unit = engine.load(Utf8Path::new("units/metrics.unit"), Some("metrics"))?;
/// let value = unit.call("f", &[])?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct HotSwapEngine {
    registry: Mutex<ModuleRegistry>,
    fingerprints: Arc<FingerprintStore>,
    loader: Arc<dyn UnitLoader>,
    bus: ObserverBus,
    backup: BackupConfig,
    module_settings: RwLock<FxHashMap<String, ModuleConfig>>,
}

impl std::fmt::Debug for HotSwapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotSwapEngine")
            .field("modules", &self.registry.lock().len())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl HotSwapEngine {
    /// Creates an engine with the given loader and default backup settings.
    #[must_use]
    pub fn new(loader: Arc<dyn UnitLoader>) -> Self {
        Self {
            registry: Mutex::new(ModuleRegistry::new()),
            fingerprints: Arc::new(FingerprintStore::new()),
            loader,
            bus: ObserverBus::new(),
            backup: BackupConfig::default(),
            module_settings: RwLock::new(FxHashMap::default()),
        }
    }

    /// Replaces the backup configuration.
    #[must_use]
    pub fn with_backup(mut self, backup: BackupConfig) -> Self {
        self.backup = backup;
        self
    }

    /// Returns the shared fingerprint store (also consulted by the watcher).
    #[must_use]
    pub fn fingerprint_store(&self) -> Arc<FingerprintStore> {
        Arc::clone(&self.fingerprints)
    }

    /// Returns the notification bus for observer registration.
    #[must_use]
    pub const fn bus(&self) -> &ObserverBus {
        &self.bus
    }

    /// Records per-module settings (auto-reload, backups, rate limit).
    pub fn apply_module_config(&self, config: ModuleConfig) {
        self.module_settings
            .write()
            .insert(config.name.clone(), config);
    }

    /// Loads a unit from `path` and registers it.
    ///
    /// When `name` is omitted it is derived from the path string via
    /// [`derive_unit_name`]. On any failure the registry is left untouched:
    /// there is no partial entry to clean up.
    ///
    /// # Errors
    ///
    /// - [`EngineError::PathNotFound`] if the path does not exist
    /// - [`EngineError::DuplicateName`] if the name is already registered
    /// - [`EngineError::Load`] if the unit's top-level code fails
    pub fn load(
        &self,
        path: &Utf8Path,
        name: Option<&str>,
    ) -> Result<Arc<dyn LoadedUnit>, EngineError> {
        let resolved = path.canonicalize_utf8().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::PathNotFound(path.to_owned())
            } else {
                EngineError::Io(e)
            }
        })?;

        let name = name.map_or_else(|| derive_unit_name(&resolved), ToOwned::to_owned);
        let source = fs::read_to_string(resolved.as_std_path())?;

        let mut registry = self.registry.lock();
        if registry.get(&name).is_ok() {
            return Err(EngineError::DuplicateName(name));
        }

        match self.loader.load(&name, &source) {
            Ok(unit) => {
                registry.register(name.as_str(), Arc::clone(&unit), resolved.clone())?;
                drop(registry);
                self.fingerprints
                    .record(resolved.clone(), fingerprint_bytes(source.as_bytes()));
                info!(module = %name, path = %resolved, "Module loaded");
                Ok(unit)
            }
            Err(failure) => {
                drop(registry);
                error!(path = %resolved, error = %failure, "Module load failed");
                self.bus.notify_error(&failure.message, &failure.detail);
                Err(EngineError::Load {
                    path: resolved,
                    detail: failure.detail,
                })
            }
        }
    }

    /// Re-executes a module's source and atomically swaps its live unit.
    ///
    /// The old unit stays reachable until the new one has executed without
    /// error; on failure the old unit remains the live binding, counters are
    /// untouched, error observers fire, and the error is returned.
    ///
    /// If the old unit held external resources that its replacement's
    /// partial execution already disturbed, the reverted binding may be
    /// degraded; units produced by [`crate::ScriptLoader`] are pure value
    /// namespaces and cannot hit this case.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the name is not registered
    /// - [`EngineError::RateLimited`] if the module's reload budget is spent
    /// - [`EngineError::Reload`] if reading or executing the source fails
    pub fn reload(&self, name: &str) -> Result<Arc<dyn LoadedUnit>, EngineError> {
        let mut registry = self.registry.lock();

        let (path, old) = {
            let record = registry.get_mut(name)?;

            let limit = self
                .module_settings
                .read()
                .get(name)
                .map_or(0, |m| m.max_reloads_per_minute);
            if limit > 0 && record.reloads_within(RATE_LIMIT_WINDOW) >= limit {
                drop(registry);
                warn!(module = %name, limit, "Reload budget exhausted");
                let err = EngineError::RateLimited {
                    name: name.to_owned(),
                    limit,
                };
                self.bus
                    .notify_error(&err.to_string(), "reload budget exhausted");
                return Err(err);
            }

            (record.path.clone(), Arc::clone(&record.unit))
        };

        let wants_backup = self.backup.enabled
            && self
                .module_settings
                .read()
                .get(name)
                .is_some_and(|m| m.backup_before_reload);
        if wants_backup {
            // A failed backup is reported but never blocks the reload.
            if let Err(e) = self.create_backup(name, &path) {
                warn!(module = %name, error = %e, "Pre-reload backup failed");
            }
        }

        let source = match fs::read_to_string(path.as_std_path()) {
            Ok(source) => source,
            Err(e) => {
                drop(registry);
                let detail = format!("failed to read {path}: {e}");
                error!(module = %name, error = %e, "Reload failed; previous unit remains live");
                self.bus
                    .notify_error(&format!("failed to reload module '{name}'"), &detail);
                return Err(EngineError::Reload {
                    name: name.to_owned(),
                    detail,
                });
            }
        };

        match self.loader.load(name, &source) {
            Ok(new_unit) => {
                registry.update_unit(name, Arc::clone(&new_unit))?;
                let reload_count = registry.get(name).map(|r| r.reload_count).unwrap_or(0);
                drop(registry);
                self.fingerprints
                    .record(path.clone(), fingerprint_bytes(source.as_bytes()));
                info!(module = %name, reload_count, "Module reloaded");
                self.bus.notify_change(name, &old, &new_unit);
                Ok(new_unit)
            }
            Err(failure) => {
                // The record was never touched; the old unit is still live.
                drop(registry);
                error!(
                    module = %name,
                    error = %failure,
                    "Reload failed; previous unit remains live"
                );
                self.bus.notify_error(&failure.message, &failure.detail);
                Err(EngineError::Reload {
                    name: name.to_owned(),
                    detail: failure.detail,
                })
            }
        }
    }

    /// Removes a module's binding, registry record, and fingerprint entry.
    ///
    /// Unloading a name that was never loaded is a warning, not an error.
    pub fn unload(&self, name: &str) {
        let removed = self.registry.lock().remove(name);
        if let Some(record) = removed {
            self.fingerprints.forget(&record.path);
            self.module_settings.write().remove(name);
            info!(module = %name, "Module unloaded");
        }
    }

    /// Reloads every registered module backed by one of `paths`.
    ///
    /// This is the watcher's dispatch entry point: modules are processed
    /// sequentially, modules whose settings opt out of auto-reload are
    /// skipped, and one failure never prevents the remaining paths from
    /// being processed.
    pub fn reload_paths(
        &self,
        paths: &[Utf8PathBuf],
    ) -> Vec<(String, Result<(), EngineError>)> {
        let mut results = Vec::new();
        for path in paths {
            let names = self.registry.lock().names_for_path(path);
            if names.is_empty() {
                debug!(path = %path, "Changed file has no registered module");
                continue;
            }
            for name in names {
                let auto = self
                    .module_settings
                    .read()
                    .get(&name)
                    .is_none_or(|m| m.auto_reload);
                if !auto {
                    debug!(module = %name, "Auto-reload disabled for module");
                    continue;
                }
                let outcome = self.reload(&name).map(|_| ());
                if let Err(e) = &outcome {
                    warn!(module = %name, error = %e, "Auto-reload failed");
                }
                results.push((name, outcome));
            }
        }
        results
    }

    /// Loads every enabled module from a configuration, applying its
    /// per-module settings first.
    pub fn load_from_config(&self, config: &Config) -> Vec<(String, Result<(), EngineError>)> {
        let mut results = Vec::new();
        for module in &config.modules {
            if !module.enabled {
                debug!(module = %module.name, "Module disabled in configuration");
                continue;
            }
            self.apply_module_config(module.clone());
            let outcome = self.load(&module.path, Some(&module.name)).map(|_| ());
            if let Err(e) = &outcome {
                warn!(module = %module.name, error = %e, "Configured module failed to load");
            }
            results.push((module.name.clone(), outcome));
        }
        results
    }

    /// Returns the live unit for a module.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for unknown names.
    pub fn unit(&self, name: &str) -> Result<Arc<dyn LoadedUnit>, EngineError> {
        Ok(Arc::clone(&self.registry.lock().get(name)?.unit))
    }

    /// Returns a metadata snapshot for a module.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for unknown names.
    pub fn info(&self, name: &str) -> Result<ModuleInfo, EngineError> {
        Ok(self.registry.lock().info(name)?)
    }

    /// Returns all module names in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.registry.lock().list()
    }

    /// Returns the number of registered modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Copies a module's source into the backup directory, pruning old
    /// backups beyond the per-module cap.
    fn create_backup(&self, name: &str, path: &Utf8Path) -> std::io::Result<Utf8PathBuf> {
        fs::create_dir_all(self.backup.backup_dir.as_std_path())?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let dest = self.backup.backup_dir.join(format!("{name}_{stamp}.bak"));
        fs::copy(path.as_std_path(), dest.as_std_path())?;
        debug!(module = %name, backup = %dest, "Backup created");
        self.prune_backups(name)?;
        Ok(dest)
    }

    /// Deletes the oldest backups of a module beyond the configured cap.
    fn prune_backups(&self, name: &str) -> std::io::Result<()> {
        let prefix = format!("{name}_");
        let mut backups: Vec<String> = fs::read_dir(self.backup.backup_dir.as_std_path())?
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|file| file.starts_with(&prefix) && file.ends_with(".bak"))
            .collect();

        if backups.len() <= self.backup.max_backups_per_module {
            return Ok(());
        }

        // Timestamped names sort chronologically.
        backups.sort();
        let excess = backups.len() - self.backup.max_backups_per_module;
        for file in &backups[..excess] {
            let victim = self.backup.backup_dir.join(file);
            if let Err(e) = fs::remove_file(victim.as_std_path()) {
                warn!(backup = %victim, error = %e, "Failed to prune backup");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ScriptLoader;
    use hs_expr::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn engine() -> HotSwapEngine {
        HotSwapEngine::new(Arc::new(ScriptLoader::new()))
    }

    fn write_unit(dir: &TempDir, file: &str, contents: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(file)).unwrap();
        fs::write(path.as_std_path(), contents).unwrap();
        path
    }

    #[test]
    fn test_load_and_call() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        let unit = engine.load(&path, Some("m")).unwrap();
        assert_eq!(unit.call("f", &[]).unwrap(), Value::Int(1));
        assert_eq!(engine.list(), vec!["m"]);
        assert_eq!(engine.info("m").unwrap().reload_count, 0);
    }

    #[test]
    fn test_load_missing_path() {
        let engine = engine();
        let err = engine
            .load(Utf8Path::new("/nonexistent/m.unit"), Some("m"))
            .unwrap_err();
        assert!(matches!(err, EngineError::PathNotFound(_)));
        assert_eq!(engine.module_count(), 0);
    }

    #[test]
    fn test_load_duplicate_name() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        engine.load(&path, Some("m")).unwrap();
        let err = engine.load(&path, Some("m")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateName(name) if name == "m"));
        assert_eq!(engine.module_count(), 1);
    }

    #[test]
    fn test_load_failure_leaves_no_partial_entry() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "bad.unit", "f = nonsense +");

        let engine = engine();
        let errors = Arc::new(AtomicUsize::new(0));
        {
            let errors = Arc::clone(&errors);
            engine.bus().add_error_observer(move |_, _| {
                errors.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        let err = engine.load(&path, Some("bad")).unwrap_err();
        assert!(matches!(err, EngineError::Load { .. }));
        assert_eq!(engine.module_count(), 0);
        assert!(!engine.fingerprint_store().contains(&path));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_derived_name_is_stable_and_content_independent() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        let derived = derive_unit_name(&path.canonicalize_utf8().unwrap());
        engine.load(&path, None).unwrap();
        assert_eq!(engine.list(), vec![derived.clone()]);

        // Same path, different content: same derived name.
        fs::write(path.as_std_path(), "f = 99").unwrap();
        assert_eq!(
            derive_unit_name(&path.canonicalize_utf8().unwrap()),
            derived
        );
    }

    #[test]
    fn test_reload_picks_up_new_content() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        let unit = engine.load(&path, Some("m")).unwrap();
        assert_eq!(unit.call("f", &[]).unwrap(), Value::Int(1));

        fs::write(path.as_std_path(), "f = 2").unwrap();
        let reloaded = engine.reload("m").unwrap();
        assert_eq!(reloaded.call("f", &[]).unwrap(), Value::Int(2));
        assert_eq!(engine.info("m").unwrap().reload_count, 1);
    }

    #[test]
    fn test_reload_count_matches_successful_reloads() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        engine.load(&path, Some("m")).unwrap();
        for i in 0..5 {
            fs::write(path.as_std_path(), format!("f = {i}")).unwrap();
            engine.reload("m").unwrap();
        }
        assert_eq!(engine.info("m").unwrap().reload_count, 5);
    }

    #[test]
    fn test_failed_reload_keeps_old_unit_and_counters() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        engine.load(&path, Some("m")).unwrap();
        let before = engine.unit("m").unwrap();

        fs::write(path.as_std_path(), "f = oops +").unwrap();
        let err = engine.reload("m").unwrap_err();
        assert!(matches!(err, EngineError::Reload { .. }));

        let after = engine.unit("m").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(engine.info("m").unwrap().reload_count, 0);
        assert_eq!(after.call("f", &[]).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_failed_reload_notifies_error_observers() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        engine.load(&path, Some("m")).unwrap();

        let errors = Arc::new(AtomicUsize::new(0));
        {
            let errors = Arc::clone(&errors);
            engine.bus().add_error_observer(move |message, detail| {
                assert!(!message.is_empty());
                assert!(!detail.is_empty());
                errors.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        fs::write(path.as_std_path(), "f = oops +").unwrap();
        engine.reload("m").unwrap_err();
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_successful_reload_notifies_change_observers() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        engine.load(&path, Some("m")).unwrap();

        let changes = Arc::new(AtomicUsize::new(0));
        {
            let changes = Arc::clone(&changes);
            engine.bus().add_change_observer(move |name, old, new| {
                assert_eq!(name, "m");
                assert_eq!(old.call("f", &[]).unwrap(), Value::Int(1));
                assert_eq!(new.call("f", &[]).unwrap(), Value::Int(2));
                changes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        fs::write(path.as_std_path(), "f = 2").unwrap();
        engine.reload("m").unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reload_unknown_module() {
        let engine = engine();
        assert!(matches!(
            engine.reload("ghost").unwrap_err(),
            EngineError::NotFound(name) if name == "ghost"
        ));
    }

    #[test]
    fn test_reloaded_at_strictly_increases() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        engine.load(&path, Some("m")).unwrap();

        engine.reload("m").unwrap();
        let first = engine.info("m").unwrap().reloaded_at.unwrap();
        engine.reload("m").unwrap();
        let second = engine.info("m").unwrap().reloaded_at.unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_unload_removes_binding_and_fingerprint() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        engine.load(&path, Some("m")).unwrap();
        let resolved = path.canonicalize_utf8().unwrap();
        assert!(engine.fingerprint_store().contains(&resolved));

        engine.unload("m");
        assert_eq!(engine.module_count(), 0);
        assert!(!engine.fingerprint_store().contains(&resolved));

        // Unloading again is a warning, not an error.
        engine.unload("m");
    }

    #[test]
    fn test_rate_limit_blocks_excess_reloads() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        engine.load(&path, Some("m")).unwrap();
        engine.apply_module_config(ModuleConfig {
            max_reloads_per_minute: 2,
            ..ModuleConfig::new("m", path.clone())
        });

        engine.reload("m").unwrap();
        engine.reload("m").unwrap();
        let err = engine.reload("m").unwrap_err();
        assert!(matches!(err, EngineError::RateLimited { limit: 2, .. }));
        assert_eq!(engine.info("m").unwrap().reload_count, 2);
    }

    #[test]
    fn test_backup_before_reload() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");
        let backup_dir = Utf8PathBuf::from_path_buf(dir.path().join("backups")).unwrap();

        let engine = HotSwapEngine::new(Arc::new(ScriptLoader::new())).with_backup(BackupConfig {
            enabled: true,
            backup_dir: backup_dir.clone(),
            max_backups_per_module: 10,
        });
        engine.load(&path, Some("m")).unwrap();
        engine.apply_module_config(ModuleConfig {
            backup_before_reload: true,
            ..ModuleConfig::new("m", path.clone())
        });

        engine.reload("m").unwrap();

        let backups: Vec<_> = fs::read_dir(backup_dir.as_std_path())
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(backups.len(), 1);
        let name = backups[0].file_name().into_string().unwrap();
        assert!(name.starts_with("m_"));
        assert!(name.ends_with(".bak"));
    }

    #[test]
    fn test_reload_paths_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let good = write_unit(&dir, "good.unit", "f = 1");
        let bad = write_unit(&dir, "bad.unit", "f = 1");

        let engine = engine();
        engine.load(&good, Some("good")).unwrap();
        engine.load(&bad, Some("bad")).unwrap();

        fs::write(good.as_std_path(), "f = 2").unwrap();
        fs::write(bad.as_std_path(), "f = oops +").unwrap();

        let resolved_bad = bad.canonicalize_utf8().unwrap();
        let resolved_good = good.canonicalize_utf8().unwrap();
        let results = engine.reload_paths(&[resolved_bad, resolved_good]);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "bad");
        assert!(results[0].1.is_err());
        assert_eq!(results[1].0, "good");
        assert!(results[1].1.is_ok());
        assert_eq!(
            engine.unit("good").unwrap().call("f", &[]).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_reload_paths_respects_auto_reload_opt_out() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = engine();
        engine.load(&path, Some("m")).unwrap();
        engine.apply_module_config(ModuleConfig {
            auto_reload: false,
            ..ModuleConfig::new("m", path.clone())
        });

        let resolved = path.canonicalize_utf8().unwrap();
        let results = engine.reload_paths(&[resolved]);
        assert!(results.is_empty());
        assert_eq!(engine.info("m").unwrap().reload_count, 0);
    }

    #[test]
    fn test_load_from_config() {
        let dir = TempDir::new().unwrap();
        let enabled = write_unit(&dir, "a.unit", "f = 1");
        let disabled = write_unit(&dir, "b.unit", "f = 1");

        let mut config = Config::default();
        config
            .add_module(ModuleConfig::new("a", enabled))
            .unwrap();
        config
            .add_module(ModuleConfig {
                enabled: false,
                ..ModuleConfig::new("b", disabled)
            })
            .unwrap();

        let engine = engine();
        let results = engine.load_from_config(&config);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "a");
        assert!(results[0].1.is_ok());
        assert_eq!(engine.list(), vec!["a"]);
    }

    #[test]
    fn test_concurrent_same_name_reloads_serialize() {
        let dir = TempDir::new().unwrap();
        let path = write_unit(&dir, "m.unit", "f = 1");

        let engine = Arc::new(engine());
        engine.load(&path, Some("m")).unwrap();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.reload("m").is_ok())
            })
            .collect();

        let successes = threads
            .into_iter()
            .filter_map(|t| t.join().ok())
            .filter(|&ok| ok)
            .count();

        // Every reload of unchanged, valid source succeeds, and the counter
        // reflects exactly the number of successful reloads: no interleaving
        // lost or double-counted an update.
        assert_eq!(successes, 8);
        assert_eq!(engine.info("m").unwrap().reload_count, 8);
    }
}
