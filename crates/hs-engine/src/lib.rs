//! Module registry and hot-reload engine.
//!
//! This crate is the heart of hotswap: it loads **units** (opaque handles to
//! executed code, produced by a pluggable [`UnitLoader`]) into a
//! [`ModuleRegistry`], re-loads them in place with an atomic old-to-new
//! swap, and multicasts reload outcomes on an [`ObserverBus`].
//!
//! # Overview
//!
//! - [`HotSwapEngine`] - load / reload / unload with keep-old-until-verified
//!   semantics and one lock serializing all mutations
//! - [`ModuleRegistry`] - the table of live units and their metadata
//! - [`UnitLoader`] / [`LoadedUnit`] - the seam between the reload protocol
//!   and how code actually executes; [`ScriptLoader`] is the default
//! - [`ObserverBus`] - registration-order change/error callbacks
//! - [`AutoReloader`] - adapter wiring watcher change batches into reloads
//!
//! # Crate Dependencies
//!
//! ```text
//! hs-cli ──► hs-engine ──► hs-watcher ──► hs-core
//!                      ├─► hs-expr ─────────────►
//! ```
//!
//! # Example
//!
//! ```no_run
//! use hs_engine::{HotSwapEngine, ScriptLoader};
//! use camino::Utf8Path;
//! use std::sync::Arc;
//!
//! let engine = HotSwapEngine::new(Arc::new(ScriptLoader::new()));
//!
//! // Load a unit and call into it.
//! let unit = engine.load(Utf8Path::new("units/pricing.unit"), Some("pricing"))?;
//! let total = unit.call("total", &[hs_expr::Value::Int(3)])?;
//!
//! // After the file changes on disk, swap in the new code.
//! let unit = engine.reload("pricing")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod auto;
pub mod bus;
pub mod engine;
pub mod error;
pub mod loader;
pub mod registry;

pub use auto::AutoReloader;
pub use bus::{ChangeObserver, ErrorObserver, ObserverBus};
pub use engine::{derive_unit_name, HotSwapEngine};
pub use error::{EngineError, RegistryError};
pub use loader::{LoadFailure, LoadedUnit, ScriptLoader, SymbolKind, UnitError, UnitLoader};
pub use registry::{ModuleRecord, ModuleRegistry};
