//! Configuration structures for the hotswap engine.
//!
//! This module provides configuration types for all components of the system:
//!
//! - [`WatchConfig`] - File watcher settings (directories, extensions, polling)
//! - [`ModuleConfig`] - Per-module settings (path, auto-reload, backups)
//! - [`DebugConfig`] - Debug facility settings (log directory, retention)
//! - [`BackupConfig`] - Pre-reload backup settings
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] with sensible values, and the
//! root [`Config`] round-trips losslessly through JSON via [`Config::load`]
//! and [`Config::save`].

use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// How reloads are triggered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ReloadMode {
    /// The watcher reloads changed modules automatically.
    #[default]
    Auto,
    /// Changes are detected and reported, but reloads require an explicit call.
    Manual,
}

impl ReloadMode {
    /// Returns `true` if changed modules should be reloaded without
    /// operator intervention.
    #[inline]
    #[must_use]
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }
}

/// Configuration for the polling file watcher.
///
/// This is an immutable snapshot consumed by the watcher loop; changing any
/// field requires stopping and restarting the loop.
///
/// # Examples
///
/// ```
/// use hs_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.poll_interval_ms, 1000);
/// assert!(config.recursive);
/// assert!(config.auto_reload);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directories to scan each cycle.
    pub directories: Vec<Utf8PathBuf>,

    /// File extensions to consider (without the leading dot).
    pub extensions: Vec<String>,

    /// Whether to descend into subdirectories.
    pub recursive: bool,

    /// Polling interval between scan cycles, in milliseconds.
    pub poll_interval_ms: u64,

    /// Whether changed modules are reloaded from within the watcher loop.
    pub auto_reload: bool,

    /// Directory names excluded from enumeration.
    pub ignore_dirs: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directories: vec![Utf8PathBuf::from(".")],
            extensions: vec!["unit".to_owned()],
            recursive: true,
            poll_interval_ms: 1000,
            auto_reload: true,
            ignore_dirs: vec![
                ".git".to_owned(),
                "target".to_owned(),
                "node_modules".to_owned(),
                "__pycache__".to_owned(),
                ".idea".to_owned(),
                ".vscode".to_owned(),
            ],
        }
    }
}

impl WatchConfig {
    /// Returns the polling interval as a [`std::time::Duration`].
    #[inline]
    #[must_use]
    pub const fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

/// Per-module configuration.
///
/// # Examples
///
/// ```
/// use hs_core::ModuleConfig;
/// use camino::Utf8PathBuf;
///
/// let module = ModuleConfig::new("metrics", Utf8PathBuf::from("units/metrics.unit"));
/// assert!(module.enabled);
/// assert!(module.auto_reload);
/// assert!(!module.backup_before_reload);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Logical module name (unique within the configuration).
    pub name: String,

    /// Path to the module's source file.
    pub path: Utf8PathBuf,

    /// Whether this module is loaded at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether this module participates in auto-reload.
    #[serde(default = "default_true")]
    pub auto_reload: bool,

    /// Whether the source file is backed up before each reload.
    #[serde(default)]
    pub backup_before_reload: bool,

    /// Upper bound on reloads of this module within any 60 second window.
    ///
    /// Zero disables the limit.
    #[serde(default = "default_max_reloads")]
    pub max_reloads_per_minute: u32,
}

fn default_true() -> bool {
    true
}

const fn default_max_reloads() -> u32 {
    10
}

impl ModuleConfig {
    /// Creates a module configuration with default flags.
    #[must_use]
    pub fn new(name: impl Into<String>, path: Utf8PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
            enabled: true,
            auto_reload: true,
            backup_before_reload: false,
            max_reloads_per_minute: default_max_reloads(),
        }
    }
}

/// Configuration for the debug facility.
///
/// # Examples
///
/// ```
/// use hs_core::DebugConfig;
///
/// let config = DebugConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.keep_logs_days, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Whether the debug facility is active.
    pub enabled: bool,

    /// Directory receiving event log files and session dumps.
    pub log_dir: Utf8PathBuf,

    /// Whether events are written to the log file in addition to tracing.
    pub log_to_file: bool,

    /// Log files older than this many days are removed by pruning.
    pub keep_logs_days: u32,

    /// Number of most-recent samples included in a performance report.
    pub max_recent_samples: usize,

    /// Maximum depth for call-stack captures.
    pub max_call_stack_depth: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: Utf8PathBuf::from("hotswap/logs"),
            log_to_file: true,
            keep_logs_days: 7,
            max_recent_samples: 10,
            max_call_stack_depth: 10,
        }
    }
}

/// Configuration for pre-reload source backups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Whether backups are taken at all.
    pub enabled: bool,

    /// Directory receiving backup copies.
    pub backup_dir: Utf8PathBuf,

    /// Oldest backups beyond this count are pruned per module.
    pub max_backups_per_module: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backup_dir: Utf8PathBuf::from("hotswap/backups"),
            max_backups_per_module: 10,
        }
    }
}

/// Root configuration for the hotswap engine.
///
/// Combines all component configurations into a single structure that loads
/// from and saves to a JSON document losslessly.
///
/// # Examples
///
/// ```
/// use hs_core::Config;
///
/// let config = Config::default();
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// let parsed: Config = serde_json::from_str(&json).unwrap();
/// assert_eq!(config, parsed);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reload trigger mode.
    pub mode: ReloadMode,

    /// File watcher configuration.
    pub watch: WatchConfig,

    /// Modules managed by the engine.
    pub modules: Vec<ModuleConfig>,

    /// Debug facility configuration.
    pub debug: DebugConfig,

    /// Pre-reload backup configuration.
    pub backup: BackupConfig,
}

impl Config {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid JSON for this shape.
    pub fn load(path: &camino::Utf8Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_std_path())?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Saves configuration to a JSON file (pretty-printed, lossless).
    ///
    /// Parent directories are created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] on write failure.
    pub fn save(&self, path: &camino::Utf8Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent.as_std_path())?;
            }
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path.as_std_path(), contents)?;
        Ok(())
    }

    /// Returns the configuration for a named module, if present.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Adds a module configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if a module with the same name
    /// already exists.
    pub fn add_module(&mut self, module: ModuleConfig) -> Result<(), ConfigError> {
        if self.module(&module.name).is_some() {
            return Err(ConfigError::InvalidOption {
                option: "modules".to_owned(),
                reason: format!("module '{}' already exists", module.name),
            });
        }
        self.modules.push(module);
        Ok(())
    }

    /// Removes a module configuration by name.
    ///
    /// Removing an unknown name is a no-op with a warning.
    pub fn remove_module(&mut self, name: &str) {
        let before = self.modules.len();
        self.modules.retain(|m| m.name != name);
        if self.modules.len() == before {
            warn!(name = %name, "Module not present in configuration");
        }
    }

    /// Validates the configuration, returning a list of problems.
    ///
    /// Watch directories and module paths must exist. The backup and log
    /// directories are created if missing; failure to create them is
    /// reported as a problem.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for dir in &self.watch.directories {
            if !dir.exists() {
                problems.push(format!("watch directory does not exist: {dir}"));
            }
        }

        for module in &self.modules {
            if !module.path.exists() {
                problems.push(format!(
                    "module path does not exist: {} (module: {})",
                    module.path, module.name
                ));
            }
        }

        if self.watch.poll_interval_ms == 0 {
            problems.push("poll_interval_ms must be positive".to_owned());
        }

        if self.backup.enabled {
            if let Err(e) = fs::create_dir_all(self.backup.backup_dir.as_std_path()) {
                problems.push(format!("failed to create backup directory: {e}"));
            }
        }

        if self.debug.log_to_file {
            if let Err(e) = fs::create_dir_all(self.debug.log_dir.as_std_path()) {
                problems.push(format!("failed to create log directory: {e}"));
            }
        }

        problems
    }
}
