//! Content fingerprinting for change detection.
//!
//! This module provides [`ContentHash`], a blake3 digest of file contents,
//! and [`FingerprintStore`], the shared map of last-observed digests that the
//! reload engine and the file watcher both consult.
//!
//! Fingerprints exist purely to distinguish real content changes from touch
//! events; they are not a security mechanism.

use std::fs::File;
use std::io::{self, BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;

use crate::hash::FxHashMap;

/// A 256-bit content digest (blake3 output).
///
/// Equal content always yields equal digests; different content yields a
/// different digest with overwhelming probability.
///
/// # Examples
///
/// ```
/// use hs_core::fingerprint_bytes;
///
/// let a = fingerprint_bytes(b"hello");
/// let b = fingerprint_bytes(b"hello");
/// let c = fingerprint_bytes(b"hello!");
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Creates a hash from raw digest bytes.
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the digest as a lowercase hex string.
    #[must_use]
    pub fn to_hex(self) -> String {
        use std::fmt::Write;

        let mut out = String::with_capacity(64);
        for byte in self.0 {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 16 hex chars are plenty for log lines
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Fingerprints a byte slice.
#[must_use]
pub fn fingerprint_bytes(bytes: &[u8]) -> ContentHash {
    ContentHash(*blake3::hash(bytes).as_bytes())
}

/// Fingerprints a file's contents with buffered reads.
///
/// # Errors
///
/// Returns the underlying [`io::Error`] if the file cannot be opened or
/// read (permissions, deleted mid-scan). Callers performing a scan must
/// treat such a file as unchanged for that cycle rather than aborting.
pub fn fingerprint_file(path: &Utf8Path) -> io::Result<ContentHash> {
    let file = File::open(path.as_std_path())?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(ContentHash(*hasher.finalize().as_bytes()))
}

/// The shared map of last-observed content digests.
///
/// Keyed by absolute file path. Presence means the file has been fingerprinted
/// at least once (by a load or a scan); absence means it was never observed or
/// was explicitly forgotten on unload.
///
/// The store is shared between the reload engine (which records a fingerprint
/// on every load and reload) and the watcher (which diffs and refreshes it
/// every cycle), so all methods take `&self` and synchronize internally.
///
/// # Examples
///
/// ```
/// use hs_core::{fingerprint_bytes, FingerprintStore};
/// use camino::Utf8PathBuf;
///
/// let store = FingerprintStore::new();
/// let path = Utf8PathBuf::from("/units/metrics.unit");
///
/// assert!(store.get(&path).is_none());
/// store.record(path.clone(), fingerprint_bytes(b"f = 1"));
/// assert!(store.contains(&path));
/// ```
#[derive(Debug, Default)]
pub struct FingerprintStore {
    entries: RwLock<FxHashMap<Utf8PathBuf, ContentHash>>,
}

impl FingerprintStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the digest observed for a path, replacing any previous entry.
    pub fn record(&self, path: Utf8PathBuf, hash: ContentHash) {
        self.entries.write().insert(path, hash);
    }

    /// Returns the last-observed digest for a path, if any.
    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<ContentHash> {
        self.entries.read().get(path).copied()
    }

    /// Returns `true` if the path has been fingerprinted at least once.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.entries.read().contains_key(path)
    }

    /// Removes the entry for a path (used when a module is unloaded).
    ///
    /// Returns the forgotten digest, if one existed.
    pub fn forget(&self, path: &Utf8Path) -> Option<ContentHash> {
        self.entries.write().remove(path)
    }

    /// Returns the number of tracked paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no paths are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
