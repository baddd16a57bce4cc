//! Error types for the hs-engine crate.

use camino::Utf8PathBuf;

/// Errors from registry bookkeeping.
///
/// These cover the registry's own contract; the engine maps them into
/// [`EngineError`] at its boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A module with this name is already registered.
    #[error("module '{0}' is already registered")]
    DuplicateName(String),

    /// No module with this name is registered.
    #[error("module '{0}' is not registered")]
    NotFound(String),
}

/// Errors from engine operations.
///
/// # Error Recovery Strategy
///
/// - [`Load`](Self::Load): fatal to that load attempt; the registry is left
///   untouched.
/// - [`Reload`](Self::Reload): recovered - the previously live unit remains
///   bound; reported to error observers and returned to the caller.
/// - [`RateLimited`](Self::RateLimited): the reload was refused before any
///   work happened; counters are untouched.
/// - [`NotFound`](Self::NotFound) / [`DuplicateName`](Self::DuplicateName):
///   caller errors, nothing changed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No module with this name is registered.
    #[error("module '{0}' is not registered")]
    NotFound(String),

    /// A module with this name is already registered.
    #[error("module '{0}' is already registered")]
    DuplicateName(String),

    /// The source path does not exist.
    #[error("module source does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// Executing a unit's top-level code failed during an initial load.
    #[error("failed to load unit from {path}: {detail}")]
    Load {
        /// The source path that failed to load.
        path: Utf8PathBuf,
        /// Loader diagnostic.
        detail: String,
    },

    /// Executing a unit's top-level code failed during a reload.
    ///
    /// The previously live unit is still bound for this name.
    #[error("failed to reload module '{name}': {detail}")]
    Reload {
        /// The module that failed to reload.
        name: String,
        /// Loader diagnostic.
        detail: String,
    },

    /// The module exceeded its reloads-per-minute budget.
    #[error("module '{name}' exceeded {limit} reloads per minute")]
    RateLimited {
        /// The module that was throttled.
        name: String,
        /// The configured budget.
        limit: u32,
    },

    /// An I/O error outside the loader (reading sources, writing backups).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateName(name) => Self::DuplicateName(name),
            RegistryError::NotFound(name) => Self::NotFound(name),
        }
    }
}
