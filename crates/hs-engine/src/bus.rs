//! Multicast change/error notification bus.
//!
//! Observers are invoked synchronously, in registration order, when a reload
//! succeeds or fails. A failing observer is logged and skipped; it never
//! prevents later observers from running and never propagates into the
//! engine.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::loader::LoadedUnit;

/// Callback invoked after a successful reload with
/// `(name, old_unit, new_unit)`.
pub type ChangeObserver =
    Box<dyn Fn(&str, &Arc<dyn LoadedUnit>, &Arc<dyn LoadedUnit>) -> anyhow::Result<()> + Send + Sync>;

/// Callback invoked after a failed load or reload with
/// `(message, diagnostic)`.
pub type ErrorObserver = Box<dyn Fn(&str, &str) -> anyhow::Result<()> + Send + Sync>;

/// Registration-order lists of change and error observers.
///
/// # Examples
///
/// ```
/// use hs_engine::ObserverBus;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let bus = ObserverBus::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let observed = Arc::clone(&hits);
/// bus.add_error_observer(move |_msg, _detail| {
///     observed.fetch_add(1, Ordering::SeqCst);
///     Ok(())
/// });
///
/// bus.notify_error("boom", "trace");
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct ObserverBus {
    change_observers: RwLock<Vec<ChangeObserver>>,
    error_observers: RwLock<Vec<ErrorObserver>>,
}

impl std::fmt::Debug for ObserverBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverBus")
            .field("change_observers", &self.change_observers.read().len())
            .field("error_observers", &self.error_observers.read().len())
            .finish()
    }
}

impl ObserverBus {
    /// Creates a bus with no observers.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a change observer.
    ///
    /// Observers run in registration order on every successful reload.
    pub fn add_change_observer<F>(&self, observer: F)
    where
        F: Fn(&str, &Arc<dyn LoadedUnit>, &Arc<dyn LoadedUnit>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.change_observers.write().push(Box::new(observer));
    }

    /// Registers an error observer.
    ///
    /// Observers run in registration order on every failed load or reload.
    pub fn add_error_observer<F>(&self, observer: F)
    where
        F: Fn(&str, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.error_observers.write().push(Box::new(observer));
    }

    /// Invokes every change observer with `(name, old, new)`.
    ///
    /// Observer failures are logged, not propagated.
    pub fn notify_change(
        &self,
        name: &str,
        old: &Arc<dyn LoadedUnit>,
        new: &Arc<dyn LoadedUnit>,
    ) {
        for (index, observer) in self.change_observers.read().iter().enumerate() {
            if let Err(error) = observer(name, old, new) {
                warn!(
                    module = %name,
                    observer = index,
                    error = %error,
                    "Change observer failed"
                );
            }
        }
    }

    /// Invokes every error observer with `(message, diagnostic)`.
    ///
    /// Observer failures are logged, not propagated.
    pub fn notify_error(&self, message: &str, detail: &str) {
        for (index, observer) in self.error_observers.read().iter().enumerate() {
            if let Err(error) = observer(message, detail) {
                warn!(
                    observer = index,
                    error = %error,
                    "Error observer failed"
                );
            }
        }
    }

    /// Returns the number of registered change observers.
    #[must_use]
    pub fn change_observer_count(&self) -> usize {
        self.change_observers.read().len()
    }

    /// Returns the number of registered error observers.
    #[must_use]
    pub fn error_observer_count(&self) -> usize {
        self.error_observers.read().len()
    }
}
