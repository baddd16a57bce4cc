//! Bridge from watcher change batches to engine reloads.

use std::sync::Arc;

use hs_watcher::{ChangeBatch, ChangeHandler};
use tracing::{debug, info};

use crate::engine::HotSwapEngine;

/// Reloads registered modules when the watcher reports content changes.
///
/// Install on a [`hs_watcher::PollWatcher`] to get auto-reload: each cycle's
/// changed paths are handed to [`HotSwapEngine::reload_paths`], which skips
/// modules that opted out and never lets one failure stop the rest.
///
/// # Examples
///
/// ```no_run
/// use hs_engine::{AutoReloader, HotSwapEngine, ScriptLoader};
/// use hs_watcher::PollWatcher;
/// use hs_core::WatchConfig;
/// use std::sync::Arc;
///
/// let engine = Arc::new(HotSwapEngine::new(Arc::new(ScriptLoader::new())));
/// let mut watcher = PollWatcher::new(WatchConfig::default(), engine.fingerprint_store())
///     .with_handler(Arc::new(AutoReloader::new(Arc::clone(&engine))));
/// watcher.start();
/// ```
#[derive(Debug)]
pub struct AutoReloader {
    engine: Arc<HotSwapEngine>,
}

impl AutoReloader {
    /// Creates a bridge that dispatches into `engine`.
    #[must_use]
    pub fn new(engine: Arc<HotSwapEngine>) -> Self {
        Self { engine }
    }
}

impl ChangeHandler for AutoReloader {
    fn on_changes(&self, batch: &ChangeBatch) {
        if batch.is_empty() {
            return;
        }
        let paths = batch.unique_paths();
        debug!(changed = paths.len(), "Dispatching changed files to engine");

        let results = self.engine.reload_paths(&paths);
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        if !results.is_empty() {
            info!(
                reloaded = results.len() - failed,
                failed,
                "Auto-reload cycle complete"
            );
        }
    }
}
