//! Core types, configuration, and content fingerprinting for hotswap.
//!
//! This crate provides the foundational pieces used across the workspace:
//!
//! - Configuration structures loaded from and saved to JSON
//! - [`ContentHash`] and the shared [`FingerprintStore`] for change detection
//! - Module metadata snapshots ([`ModuleInfo`])
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)
//! - Error types for configuration handling

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod types;

pub use config::{BackupConfig, Config, DebugConfig, ModuleConfig, ReloadMode, WatchConfig};
pub use error::ConfigError;
pub use fingerprint::{fingerprint_bytes, fingerprint_file, ContentHash, FingerprintStore};
pub use hash::{fx_hash_map, fx_hash_set, FxHashMap, FxHashSet};
pub use types::ModuleInfo;
