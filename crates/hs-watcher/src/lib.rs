//! Polling file watcher with fingerprint-based change detection.
//!
//! This crate rescans watched directories on a fixed interval, fingerprints
//! matching files, and reports the subset whose content digest changed since
//! the previous observation. Detection is content-based: touch events and
//! metadata churn never produce a change report.
//!
//! # Overview
//!
//! - [`scan_cycle`] - one pass: enumerate, fingerprint (parallel), diff
//! - [`PollWatcher`] - the background loop with start/stop lifecycle
//! - [`ChangeHandler`] - synchronous per-cycle callback (auto-reload hook)
//! - [`ChangeBatch`] / [`ChangeEvent`] - what changed in one cycle
//! - [`FileFilter`] / [`ExtensionFilter`] - which files a cycle considers
//!
//! # Usage
//!
//! ```no_run
//! use hs_watcher::PollWatcher;
//! use hs_core::{FingerprintStore, WatchConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hs_watcher::WatchError> {
//!     let store = Arc::new(FingerprintStore::new());
//!     let mut watcher = PollWatcher::new(WatchConfig::default(), store);
//!     let mut changes = watcher.subscribe();
//!
//!     watcher.start();
//!     while let Some(batch) = changes.recv().await {
//!         for event in &batch {
//!             println!("changed: {}", event.path);
//!         }
//!     }
//!     watcher.stop().await
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod scanner;
pub mod watcher;

pub use error::WatchError;
pub use events::{ChangeBatch, ChangeEvent, CycleStats};
pub use filter::{AcceptAllFilter, ExtensionFilter, FileFilter};
pub use scanner::{scan_cycle, CycleOutcome};
pub use watcher::{ChangeHandler, PollWatcher};
