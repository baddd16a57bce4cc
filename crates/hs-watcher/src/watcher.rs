//! The polling watcher loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Blocking Thread (spawn_blocking)                │
//! │   loop: scan_cycle ─► ChangeHandler ─► subscribers ─► sleep     │
//! │                 (sleep = recv_timeout on the stop channel,      │
//! │                  so a stop request wakes the loop immediately)  │
//! └──────────────────────────────────────────│──────────────────────┘
//!                               blocking_send│
//!                                            ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │   PollWatcher (start/stop control)   mpsc::Receiver<ChangeBatch>│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One loop runs per [`PollWatcher`]; calling [`start`](PollWatcher::start)
//! while running is a no-op with a warning. Stopping is observed within one
//! polling interval: the in-flight cycle (including any reloads its handler
//! dispatched) finishes, then the task exits and is joined.

use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::sync::Arc;

use hs_core::{FingerprintStore, WatchConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::WatchError;
use crate::events::ChangeBatch;
use crate::filter::{ExtensionFilter, FileFilter};
use crate::scanner::scan_cycle;

/// Default capacity for the change-batch channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Receives each cycle's changed files, synchronously, inside the loop.
///
/// The engine's auto-reload bridge implements this; a handler failure (or
/// slow handler) delays the next cycle but can never kill the loop.
pub trait ChangeHandler: Send + Sync {
    /// Called once per cycle that observed at least one change.
    fn on_changes(&self, batch: &ChangeBatch);
}

/// A background polling watcher over an immutable [`WatchConfig`] snapshot.
///
/// Changing the configuration requires stopping this watcher and starting a
/// new one.
///
/// # Examples
///
/// ```no_run
/// use hs_watcher::PollWatcher;
/// use hs_core::{FingerprintStore, WatchConfig};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), hs_watcher::WatchError> {
/// let store = Arc::new(FingerprintStore::new());
/// let mut watcher = PollWatcher::new(WatchConfig::default(), store);
/// let mut changes = watcher.subscribe();
///
/// watcher.start();
/// while let Some(batch) = changes.recv().await {
///     println!("cycle {}: {} files changed", batch.cycle, batch.len());
/// }
/// watcher.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct PollWatcher {
    config: WatchConfig,
    store: Arc<FingerprintStore>,
    filter: Arc<dyn FileFilter>,
    handler: Option<Arc<dyn ChangeHandler>>,
    batch_tx: Option<mpsc::Sender<ChangeBatch>>,
    shutdown_tx: Option<std_mpsc::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PollWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollWatcher")
            .field("directories", &self.config.directories)
            .field("poll_interval_ms", &self.config.poll_interval_ms)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl PollWatcher {
    /// Creates a watcher over the given configuration and fingerprint store.
    ///
    /// The store should be the engine's ([`hs_core::FingerprintStore`] is
    /// shared) so files fingerprinted at load time diff correctly against
    /// scan cycles. The default filter accepts the configured extensions.
    #[must_use]
    pub fn new(config: WatchConfig, store: Arc<FingerprintStore>) -> Self {
        let filter = Arc::new(ExtensionFilter::from_owned(&config.extensions));
        Self {
            config,
            store,
            filter,
            handler: None,
            batch_tx: None,
            shutdown_tx: None,
            task: None,
        }
    }

    /// Replaces the file filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn FileFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Installs a change handler invoked synchronously inside each cycle.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn ChangeHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Creates a channel receiving each non-empty [`ChangeBatch`].
    ///
    /// Must be called before [`start`](Self::start); a subscription created
    /// after the loop is running receives nothing until a restart.
    pub fn subscribe(&mut self) -> mpsc::Receiver<ChangeBatch> {
        if self.is_running() {
            warn!("Subscribing after start; events begin after a restart");
        }
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        self.batch_tx = Some(tx);
        rx
    }

    /// Returns `true` if the polling loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Starts the polling loop on a blocking task.
    ///
    /// Starting while already running is a no-op with a warning.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!("Watcher already running; start ignored");
            return;
        }

        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();
        let config = self.config.clone();
        let store = Arc::clone(&self.store);
        let filter = Arc::clone(&self.filter);
        let handler = self.handler.clone();
        let batch_tx = self.batch_tx.clone();

        let task = tokio::task::spawn_blocking(move || {
            info!(
                directories = ?config.directories,
                interval_ms = config.poll_interval_ms,
                "Watcher started"
            );

            let mut cycle: u64 = 0;
            loop {
                cycle += 1;
                let outcome = scan_cycle(&config, &*filter, &store, cycle);
                if outcome.stats.errors > 0 {
                    debug!(cycle, errors = outcome.stats.errors, "Scan errors this cycle");
                }

                if !outcome.batch.is_empty() {
                    info!(
                        cycle,
                        changed = outcome.batch.len(),
                        "Content changes detected"
                    );
                    if let Some(handler) = &handler {
                        handler.on_changes(&outcome.batch);
                    }
                    if let Some(tx) = &batch_tx {
                        if tx.blocking_send(outcome.batch).is_err() {
                            debug!("Change subscriber dropped");
                        }
                    }
                }

                // The sleep doubles as the stop check: a stop request (or a
                // dropped watcher) wakes the loop within one interval.
                match shutdown_rx.recv_timeout(config.poll_interval()) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }

            info!("Watcher stopped");
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
    }

    /// Stops the polling loop and waits for it to exit.
    ///
    /// The in-flight cycle is allowed to finish; the wait is bounded by one
    /// polling interval plus the cycle's own work. Stopping a watcher that
    /// is not running is a no-op with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ChannelClosed`] if the loop task panicked.
    pub async fn stop(&mut self) -> Result<(), WatchError> {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            warn!("Watcher not running; stop ignored");
            return Ok(());
        };

        // Ignore send failure: the loop may have already exited.
        let _ = shutdown_tx.send(());
        drop(shutdown_tx);

        if let Some(task) = self.task.take() {
            task.await.map_err(|_| WatchError::ChannelClosed)?;
        }
        Ok(())
    }
}

impl Drop for PollWatcher {
    fn drop(&mut self) {
        // Dropping the sender disconnects the channel; the loop observes it
        // at the next wake. Drop is sync, so the task is not joined here.
        self.shutdown_tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> WatchConfig {
        WatchConfig {
            directories: vec![Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()],
            extensions: vec!["unit".to_owned()],
            poll_interval_ms: 25,
            ..WatchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let dir = TempDir::new().unwrap();
        let mut watcher =
            PollWatcher::new(test_config(&dir), Arc::new(FingerprintStore::new()));

        assert!(!watcher.is_running());
        watcher.start();
        assert!(watcher.is_running());

        watcher.stop().await.unwrap();
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut watcher =
            PollWatcher::new(test_config(&dir), Arc::new(FingerprintStore::new()));

        watcher.start();
        watcher.start(); // warned, ignored
        assert!(watcher.is_running());
        watcher.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut watcher =
            PollWatcher::new(test_config(&dir), Arc::new(FingerprintStore::new()));
        watcher.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_subscriber_receives_change_batch() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("m.unit");
        fs::write(&file, "f = 1").unwrap();

        let mut watcher =
            PollWatcher::new(test_config(&dir), Arc::new(FingerprintStore::new()));
        let mut changes = watcher.subscribe();
        watcher.start();

        // Let the first cycle record the baseline, then change the content.
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&file, "f = 2").unwrap();

        let batch = tokio::time::timeout(Duration::from_secs(3), changes.recv()).await;
        watcher.stop().await.unwrap();

        let batch = batch.expect("timed out waiting for change batch");
        let batch = batch.expect("channel closed before a batch arrived");
        assert_eq!(batch.len(), 1);
        assert!(batch.events[0].path.as_str().ends_with("m.unit"));
    }

    #[tokio::test]
    async fn test_handler_invoked_on_change() {
        struct Counting(AtomicUsize);
        impl ChangeHandler for Counting {
            fn on_changes(&self, batch: &ChangeBatch) {
                self.0.fetch_add(batch.len(), Ordering::SeqCst);
            }
        }

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("m.unit");
        fs::write(&file, "f = 1").unwrap();

        let handler = Arc::new(Counting(AtomicUsize::new(0)));
        let mut watcher = PollWatcher::new(test_config(&dir), Arc::new(FingerprintStore::new()))
            .with_handler(Arc::clone(&handler) as Arc<dyn ChangeHandler>);
        watcher.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&file, "f = 2").unwrap();

        // Wait for a cycle to pick the change up.
        let mut waited = 0;
        while handler.0.load(Ordering::SeqCst) == 0 && waited < 3000 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            waited += 50;
        }
        watcher.stop().await.unwrap();

        assert_eq!(handler.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_change_cycle_sends_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("m.unit"), "f = 1").unwrap();

        let mut watcher =
            PollWatcher::new(test_config(&dir), Arc::new(FingerprintStore::new()));
        let mut changes = watcher.subscribe();
        watcher.start();

        // Several cycles pass with no content change.
        tokio::time::sleep(Duration::from_millis(200)).await;
        watcher.stop().await.unwrap();

        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_is_observed_within_bounded_time() {
        let dir = TempDir::new().unwrap();
        let config = WatchConfig {
            poll_interval_ms: 500,
            ..test_config(&dir)
        };
        let mut watcher = PollWatcher::new(config, Arc::new(FingerprintStore::new()));
        watcher.start();

        let started = std::time::Instant::now();
        watcher.stop().await.unwrap();

        // One interval plus grace, well under two intervals.
        assert!(started.elapsed() < Duration::from_millis(900));
    }
}
