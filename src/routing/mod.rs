//! Key-to-path routing.
//!
//! A [`Router`] turns a [`Key`] into a fixed-length [`BucketPath`] of nibble
//! values, one per trie level. The dictionary walks that path to find the
//! leaf bucket holding the key.
//!
//! - [`BucketRouter`]: folds the nibbles of the key's bytes into `depth` slots
//! - [`MemoizedRouter`]: caches the paths produced by another router
//!
//! # Examples
//!
//! ```rust
//! use persistent_dictionary::persistent::Key;
//! use persistent_dictionary::routing::{BucketRouter, MemoizedRouter, Router};
//!
//! let router = BucketRouter::new(2).unwrap();
//! assert_eq!(router.buckets(&Key::from("A")).as_slice(), &[4, 1]);
//!
//! let memoized = MemoizedRouter::new(router);
//! assert_eq!(memoized.buckets(&Key::from("A")).as_slice(), &[4, 1]);
//! assert_eq!(memoized.cached_paths(), 1);
//! ```

use smallvec::SmallVec;

use crate::persistent::Key;

mod bucket_router;
mod memoized;

pub use bucket_router::BucketRouter;
pub use bucket_router::{expand, fold};
pub use memoized::MemoizedRouter;

/// Number of path components stored inline before spilling to the heap.
const INLINE_PATH_LENGTH: usize = 8;

/// Number of distinct values a path component can take (one nibble).
pub const BUCKET_WIDTH: usize = 16;

/// The bucket address of a key: one nibble per trie level.
pub type BucketPath = SmallVec<[u8; INLINE_PATH_LENGTH]>;

/// Maps keys to bucket paths.
///
/// Implementations must be pure: the same key always yields the same path,
/// every path has exactly [`depth`](Router::depth) components, and every
/// component is below [`BUCKET_WIDTH`].
pub trait Router {
    /// Number of components in every path produced by this router.
    fn depth(&self) -> usize;

    /// Returns the bucket path for `key`.
    fn buckets(&self, key: &Key) -> BucketPath;
}
