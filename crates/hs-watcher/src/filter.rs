//! File filtering for scan cycles.
//!
//! Filtering happens during enumeration, before fingerprinting, so excluded
//! files cost nothing per cycle.

use camino::Utf8Path;
use smallvec::SmallVec;

/// A predicate deciding which files a scan cycle considers.
///
/// Filters run on the watcher's background thread, so implementations must
/// be [`Send`] and [`Sync`] and are `'static` to move into the spawned task.
///
/// # Examples
///
/// ```
/// use hs_watcher::FileFilter;
/// use camino::Utf8Path;
///
/// struct NoBackups;
///
/// impl FileFilter for NoBackups {
///     fn should_scan(&self, path: &Utf8Path) -> bool {
///         !path.as_str().ends_with(".bak")
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at `path` should be fingerprinted.
    fn should_scan(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts every file.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_scan(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Accepts files whose extension is in a configured set.
///
/// # Examples
///
/// ```
/// use hs_watcher::{ExtensionFilter, FileFilter};
/// use camino::Utf8Path;
///
/// let filter = ExtensionFilter::new(&["unit", "expr"]);
/// assert!(filter.should_scan(Utf8Path::new("units/metrics.unit")));
/// assert!(!filter.should_scan(Utf8Path::new("notes.txt")));
/// assert!(!filter.should_scan(Utf8Path::new("Makefile")));
/// ```
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: SmallVec<[String; 4]>,
}

impl ExtensionFilter {
    /// Creates a filter accepting the given extensions (without the dot).
    #[must_use]
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Creates a filter from owned extension strings.
    #[must_use]
    pub fn from_owned(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.iter().cloned().collect(),
        }
    }
}

impl FileFilter for ExtensionFilter {
    fn should_scan(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

// Boxed and shared filters delegate to the inner filter.
impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_scan(&self, path: &Utf8Path) -> bool {
        (**self).should_scan(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_scan(&self, path: &Utf8Path) -> bool {
        (**self).should_scan(path)
    }
}
