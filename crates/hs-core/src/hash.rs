//! Fast hash map and hash set type aliases.
//!
//! Type aliases for [`FxHashMap`] and [`FxHashSet`] from the `rustc-hash`
//! crate, which is roughly 2x faster than the standard library hasher for the
//! string keys this workspace indexes by (module names, file paths, function
//! identities). Fx hashing provides no denial-of-service resistance; every
//! map here is internal.

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
///
/// Equivalent to `FxHashMap::default()` but more ergonomic where type
/// inference needs a nudge.
///
/// # Examples
///
/// ```
/// use hs_core::fx_hash_map;
///
/// let map: hs_core::FxHashMap<String, i32> = fx_hash_map();
/// assert!(map.is_empty());
/// ```
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
///
/// # Examples
///
/// ```
/// use hs_core::fx_hash_set;
///
/// let set: hs_core::FxHashSet<String> = fx_hash_set();
/// assert!(set.is_empty());
/// ```
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}
