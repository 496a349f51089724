//! Memoizing router decorator.

use std::fmt;

use parking_lot::Mutex;
use tracing::trace;

use super::{BucketPath, BucketRouter, Router};
use crate::error::RoutingError;
use crate::persistent::Key;

#[cfg(feature = "fxhash")]
type PathCache = rustc_hash::FxHashMap<Key, BucketPath>;

#[cfg(not(feature = "fxhash"))]
type PathCache = std::collections::HashMap<Key, BucketPath>;

/// A router that remembers every path computed by the router it wraps.
///
/// The cache belongs to this instance only, so two memoized routers never
/// see each other's entries even when their depths differ. Entries are
/// never evicted. The cache sits behind a mutex, which makes a shared
/// `MemoizedRouter` usable from several threads when the wrapped router is.
///
/// A dictionary keeps its router behind a reference counter, so every
/// version derived from one dictionary hits the same cache.
///
/// # Examples
///
/// ```rust
/// use persistent_dictionary::persistent::{Key, PersistentDictionary};
/// use persistent_dictionary::routing::MemoizedRouter;
///
/// let router = MemoizedRouter::with_depth(4).unwrap();
/// let dictionary = PersistentDictionary::with_router(router)
///     .set("a", 1)
///     .set("b", 2);
///
/// assert_eq!(dictionary.get("a"), Some(&1));
/// assert_eq!(dictionary.router().cached_paths(), 2);
/// ```
pub struct MemoizedRouter<R = BucketRouter> {
    router: R,
    cache: Mutex<PathCache>,
}

impl<R> MemoizedRouter<R> {
    /// Wraps `router` with an empty cache.
    #[must_use]
    pub fn new(router: R) -> Self {
        Self {
            router,
            cache: Mutex::new(PathCache::default()),
        }
    }

    /// The wrapped router.
    #[inline]
    #[must_use]
    pub const fn inner(&self) -> &R {
        &self.router
    }

    /// Discards the cache and returns the wrapped router.
    #[inline]
    pub fn into_inner(self) -> R {
        self.router
    }

    /// Number of keys whose path is currently cached.
    #[must_use]
    pub fn cached_paths(&self) -> usize {
        self.cache.lock().len()
    }
}

impl MemoizedRouter<BucketRouter> {
    /// Memoizes a [`BucketRouter`] of the given depth.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::DepthOutOfRange`] for an unsupported depth.
    pub fn with_depth(depth: usize) -> Result<Self, RoutingError> {
        BucketRouter::new(depth).map(Self::new)
    }
}

impl<R: Router> Router for MemoizedRouter<R> {
    #[inline]
    fn depth(&self) -> usize {
        self.router.depth()
    }

    fn buckets(&self, key: &Key) -> BucketPath {
        let mut cache = self.cache.lock();
        if let Some(path) = cache.get(key) {
            return path.clone();
        }

        let path = self.router.buckets(key);
        trace!(%key, ?path, "bucket path cache miss");
        cache.insert(key.clone(), path.clone());
        path
    }
}

impl<R: Default> Default for MemoizedRouter<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

impl<R: fmt::Debug> fmt::Debug for MemoizedRouter<R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MemoizedRouter")
            .field("router", &self.router)
            .field("cached_paths", &self.cached_paths())
            .finish()
    }
}
