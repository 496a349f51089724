//! Nibble-folding router.
//!
//! The key's bytes are split into nibbles (low nibble first), padded with
//! zeros up to the depth, and folded by XOR into `depth` slots. The folded
//! slots are reversed so that the most recently folded nibbles address the
//! top of the trie, which spreads short keys over fewer top-level buckets.

use smallvec::SmallVec;

use super::{BucketPath, Router};
use crate::error::RoutingError;
use crate::persistent::Key;

/// Nibbles kept inline by [`expand`] (keys of up to 16 bytes).
const INLINE_EXPANDED_LENGTH: usize = 32;

const LOW_NIBBLE: u8 = 0x0f;

/// Splits every byte into its low and high nibble, in that order, and pads
/// the result with zeros until it is at least `depth` long.
///
/// # Examples
///
/// ```rust
/// use persistent_dictionary::routing::expand;
///
/// assert_eq!(expand(b"A", 1).as_slice(), &[1, 4]);
/// assert_eq!(expand(b"A", 4).as_slice(), &[1, 4, 0, 0]);
/// assert_eq!(expand(b"", 2).as_slice(), &[0, 0]);
/// ```
#[must_use]
pub fn expand(bytes: &[u8], depth: usize) -> SmallVec<[u8; INLINE_EXPANDED_LENGTH]> {
    let mut expanded = SmallVec::with_capacity((bytes.len() * 2).max(depth));
    for &byte in bytes {
        expanded.push(byte & LOW_NIBBLE);
        expanded.push(byte >> 4);
    }
    if expanded.len() < depth {
        expanded.resize(depth, 0);
    }
    expanded
}

/// Folds a nibble sequence into exactly `depth` slots.
///
/// The first `depth` nibbles seed the slots; every later nibble at position
/// `index` is XORed into slot `index % depth`. The slots are returned in
/// reverse order.
///
/// # Examples
///
/// ```rust
/// use persistent_dictionary::routing::fold;
///
/// assert_eq!(fold(&[1, 4, 2, 4], 2).as_slice(), &[0, 3]);
/// assert_eq!(fold(&[1, 4], 2).as_slice(), &[4, 1]);
/// ```
#[must_use]
pub fn fold(sequence: &[u8], depth: usize) -> BucketPath {
    if depth == 0 {
        return BucketPath::new();
    }

    let mut folded: BucketPath = sequence.iter().copied().take(depth).collect();
    folded.resize(depth, 0);

    for (index, &nibble) in sequence.iter().enumerate().skip(depth) {
        folded[index % depth] ^= nibble;
    }

    folded.reverse();
    folded
}

/// The default router: `fold(expand(key, depth), depth)`.
///
/// Stateless and `Copy`; two routers with the same depth route identically.
///
/// # Examples
///
/// ```rust
/// use persistent_dictionary::persistent::Key;
/// use persistent_dictionary::routing::{BucketRouter, Router};
///
/// let router = BucketRouter::default();
/// assert_eq!(router.depth(), BucketRouter::DEFAULT_DEPTH);
///
/// let path = router.buckets(&Key::from("a rather long key that folds"));
/// assert_eq!(path.len(), 4);
/// assert!(path.iter().all(|&nibble| nibble < 16));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketRouter {
    depth: usize,
}

impl BucketRouter {
    /// Depth used when no router is supplied.
    pub const DEFAULT_DEPTH: usize = 4;

    /// Largest supported depth.
    pub const MAX_DEPTH: usize = 32;

    /// Creates a router producing paths of `depth` components.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::DepthOutOfRange`] when `depth` is zero or
    /// greater than [`MAX_DEPTH`](Self::MAX_DEPTH).
    pub const fn new(depth: usize) -> Result<Self, RoutingError> {
        if depth == 0 || depth > Self::MAX_DEPTH {
            return Err(RoutingError::DepthOutOfRange {
                depth,
                maximum: Self::MAX_DEPTH,
            });
        }
        Ok(Self { depth })
    }
}

impl Default for BucketRouter {
    #[inline]
    fn default() -> Self {
        Self {
            depth: Self::DEFAULT_DEPTH,
        }
    }
}

impl Router for BucketRouter {
    #[inline]
    fn depth(&self) -> usize {
        self.depth
    }

    fn buckets(&self, key: &Key) -> BucketPath {
        fold(&expand(&key.routing_bytes(), self.depth), self.depth)
    }
}
